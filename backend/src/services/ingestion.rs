//! Upload ingestion service
//!
//! Parses an uploaded spreadsheet, normalizes it into a snapshot and replaces
//! the stored snapshot of the same kind.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use shared::ingest::{ingest_ecommerce, ingest_matrix, ingest_transit};
use shared::{EcommerceSnapshot, MatrixSnapshot, Snapshot, SourceInfo, TransitSnapshot};

use crate::error::{AppError, AppResult};
use crate::services::workbook::{read_rows, WorkbookError};
use crate::store::{self, SharedStore, ANALYTICS_COLLECTION, ECOMMERCE_KEY, MATRIX_KEY, TRANSIT_KEY};

/// Which snapshot an upload replaces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadKind {
    Matrix,
    Ecommerce,
    Transit,
}

impl UploadKind {
    pub fn store_key(&self) -> &'static str {
        match self {
            UploadKind::Matrix => MATRIX_KEY,
            UploadKind::Ecommerce => ECOMMERCE_KEY,
            UploadKind::Transit => TRANSIT_KEY,
        }
    }

    fn label_pt(&self) -> &'static str {
        match self {
            UploadKind::Matrix => "matriz",
            UploadKind::Ecommerce => "e-commerce",
            UploadKind::Transit => "trânsito",
        }
    }
}

/// Result of an accepted upload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadSummary {
    pub kind: UploadKind,
    pub filename: String,
    /// SHA-256 of the uploaded bytes, hex encoded
    pub digest: String,
    pub accepted: usize,
    pub skipped: usize,
    pub updated_at: DateTime<Utc>,
}

enum Parsed {
    Matrix(MatrixSnapshot),
    Ecommerce(EcommerceSnapshot),
    Transit(TransitSnapshot),
}

/// Ingestion service for the three analytics uploads
#[derive(Clone)]
pub struct IngestionService {
    store: SharedStore,
}

impl IngestionService {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// Parse and store an upload.
    ///
    /// `year` selects the annual sales columns. Nothing is written when the
    /// file cannot be read or yields no records.
    pub async fn upload(
        &self,
        kind: UploadKind,
        filename: &str,
        bytes: Vec<u8>,
        year: i32,
    ) -> AppResult<UploadSummary> {
        let source = SourceInfo {
            filename: filename.to_string(),
            digest: hex::encode(Sha256::digest(&bytes)),
        };

        let task_source = source.clone();
        let (parsed, accepted, skipped) =
            tokio::task::spawn_blocking(move || parse_upload(kind, bytes, year, task_source))
                .await
                .map_err(|e| AppError::Internal(format!("Upload task failed: {}", e)))??;

        if accepted == 0 {
            return Err(AppError::Validation {
                field: "file".to_string(),
                message: format!("No valid rows found in the {:?} upload", kind),
                message_pt: format!(
                    "Nenhuma linha válida encontrada na planilha de {}",
                    kind.label_pt()
                ),
            });
        }

        let updated_at = match &parsed {
            Parsed::Matrix(s) => s.updated_at,
            Parsed::Ecommerce(s) => s.updated_at,
            Parsed::Transit(s) => s.updated_at,
        };

        let (target, key) = (self.store.as_ref(), kind.store_key());
        match &parsed {
            Parsed::Matrix(s) => store::save(target, ANALYTICS_COLLECTION, key, s).await?,
            Parsed::Ecommerce(s) => store::save(target, ANALYTICS_COLLECTION, key, s).await?,
            Parsed::Transit(s) => store::save(target, ANALYTICS_COLLECTION, key, s).await?,
        }

        tracing::info!(
            kind = ?kind,
            filename = %source.filename,
            accepted,
            skipped,
            "Snapshot replaced"
        );

        Ok(UploadSummary {
            kind,
            filename: source.filename,
            digest: source.digest,
            accepted,
            skipped,
            updated_at,
        })
    }
}

fn parse_upload(
    kind: UploadKind,
    bytes: Vec<u8>,
    year: i32,
    source: SourceInfo,
) -> Result<(Parsed, usize, usize), WorkbookError> {
    let rows = read_rows(&source.filename, bytes)?;
    let source = Some(source);

    Ok(match kind {
        UploadKind::Matrix => {
            let report = ingest_matrix(&rows, year);
            (
                Parsed::Matrix(Snapshot::new(report.records, source)),
                report.accepted,
                report.skipped,
            )
        }
        UploadKind::Ecommerce => {
            let report = ingest_ecommerce(&rows, year);
            (
                Parsed::Ecommerce(Snapshot::new(report.records, source)),
                report.accepted,
                report.skipped,
            )
        }
        UploadKind::Transit => {
            let report = ingest_transit(&rows);
            (
                Parsed::Transit(Snapshot::new(report.records, source)),
                report.accepted,
                report.skipped,
            )
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{DocumentStore, MemoryDocumentStore};
    use std::sync::Arc;

    fn service() -> (IngestionService, SharedStore) {
        let store: SharedStore = Arc::new(MemoryDocumentStore::new());
        (IngestionService::new(store.clone()), store)
    }

    #[tokio::test]
    async fn test_transit_upload_is_stored() {
        let (service, store) = service();
        let csv = "SKU;Quantidade;Data\nAB12;10;15/03/2025\nAB12;5;10/03/2025\nX;3;\n";

        let summary = service
            .upload(UploadKind::Transit, "transito.csv", csv.as_bytes().to_vec(), 2025)
            .await
            .unwrap();

        assert_eq!(summary.accepted, 2);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.digest.len(), 64);

        let stored: TransitSnapshot =
            store::load_or_default(store.as_ref(), ANALYTICS_COLLECTION, TRANSIT_KEY)
                .await
                .unwrap();
        let entry = &stored.data["AB12"];
        assert_eq!(entry.quantity, 15);
        assert_eq!(
            entry.earliest_date,
            chrono::NaiveDate::from_ymd_opt(2025, 3, 10)
        );
        assert_eq!(stored.source.unwrap().filename, "transito.csv");
    }

    #[tokio::test]
    async fn test_upload_without_records_writes_nothing() {
        let (service, store) = service();
        let csv = "Coluna;Outra\nfoo;bar\n";

        let result = service
            .upload(UploadKind::Matrix, "matriz.csv", csv.as_bytes().to_vec(), 2025)
            .await;

        assert!(matches!(result, Err(AppError::Validation { .. })));
        assert!(store
            .get(ANALYTICS_COLLECTION, MATRIX_KEY)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_unreadable_upload_is_rejected() {
        let (service, _) = service();
        let result = service
            .upload(UploadKind::Ecommerce, "vendas.xlsx", b"garbage".to_vec(), 2025)
            .await;
        assert!(matches!(result, Err(AppError::Workbook(_))));
    }
}
