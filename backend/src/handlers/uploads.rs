//! HTTP handlers for spreadsheet uploads

use axum::extract::{Multipart, State};
use axum::Json;
use chrono::{Datelike, Local};

use crate::error::{AppError, AppResult};
use crate::middleware::CurrentUser;
use crate::services::dashboard::{DashboardService, UploadStatus};
use crate::services::ingestion::{IngestionService, UploadKind, UploadSummary};
use crate::AppState;

const FILE_FIELD: &str = "file";

/// Read the `file` part of a multipart upload, enforcing the size limit
pub(crate) async fn read_upload(
    mut multipart: Multipart,
    limit: usize,
) -> AppResult<(String, Vec<u8>)> {
    while let Some(field) = multipart.next_field().await.map_err(|e| {
        AppError::validation("file", &format!("Invalid multipart body: {}", e), "Envio inválido")
    })? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let filename = field.file_name().unwrap_or("upload").to_string();
        let bytes = field.bytes().await.map_err(|e| {
            AppError::validation("file", &format!("Upload interrupted: {}", e), "Envio interrompido")
        })?;
        if bytes.len() > limit {
            return Err(AppError::PayloadTooLarge { limit });
        }
        return Ok((filename, bytes.to_vec()));
    }

    Err(AppError::validation(
        "file",
        "A spreadsheet file is required",
        "É necessário enviar uma planilha",
    ))
}

async fn upload(state: AppState, kind: UploadKind, multipart: Multipart) -> AppResult<Json<UploadSummary>> {
    let (filename, bytes) = read_upload(multipart, state.config.uploads.max_bytes).await?;
    let service = IngestionService::new(state.store.clone());
    let summary = service
        .upload(kind, &filename, bytes, Local::now().year())
        .await?;
    Ok(Json(summary))
}

/// Replace the product matrix
pub async fn upload_matrix(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    multipart: Multipart,
) -> AppResult<Json<UploadSummary>> {
    upload(state, UploadKind::Matrix, multipart).await
}

/// Replace the e-commerce sales overlay
pub async fn upload_ecommerce(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    multipart: Multipart,
) -> AppResult<Json<UploadSummary>> {
    upload(state, UploadKind::Ecommerce, multipart).await
}

/// Replace the in-transit report
pub async fn upload_transit(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    multipart: Multipart,
) -> AppResult<Json<UploadSummary>> {
    upload(state, UploadKind::Transit, multipart).await
}

/// Last upload of each snapshot
pub async fn get_upload_status(
    State(state): State<AppState>,
    _current_user: CurrentUser,
) -> AppResult<Json<UploadStatus>> {
    let service = DashboardService::new(
        state.store.clone(),
        state.views.clone(),
        state.config.stock_policy,
    );
    Ok(Json(service.upload_status().await?))
}
