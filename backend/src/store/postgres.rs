//! PostgreSQL document store backed by a JSONB table

use async_trait::async_trait;
use serde_json::Value;
use sqlx::{types::Json, PgPool};
use tokio::sync::broadcast;

use super::{change_channel, ChangeKind, DocumentChange, DocumentStore};
use crate::error::AppResult;

/// Documents live in the `documents` table created by the migrations
#[derive(Clone)]
pub struct PgDocumentStore {
    db: PgPool,
    changes: broadcast::Sender<DocumentChange>,
}

impl PgDocumentStore {
    pub fn new(db: PgPool) -> Self {
        Self {
            db,
            changes: change_channel(),
        }
    }

    fn notify(&self, collection: &str, key: &str, kind: ChangeKind) {
        let _ = self.changes.send(DocumentChange {
            collection: collection.to_string(),
            key: key.to_string(),
            kind,
        });
    }
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn get(&self, collection: &str, key: &str) -> AppResult<Option<Value>> {
        let body = sqlx::query_scalar::<_, Json<Value>>(
            "SELECT body FROM documents WHERE collection = $1 AND key = $2",
        )
        .bind(collection)
        .bind(key)
        .fetch_optional(&self.db)
        .await?;

        Ok(body.map(|Json(value)| value))
    }

    async fn put(&self, collection: &str, key: &str, body: Value) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO documents (collection, key, body, updated_at)
            VALUES ($1, $2, $3, NOW())
            ON CONFLICT (collection, key)
            DO UPDATE SET body = EXCLUDED.body, updated_at = NOW()
            "#,
        )
        .bind(collection)
        .bind(key)
        .bind(Json(body))
        .execute(&self.db)
        .await?;

        self.notify(collection, key, ChangeKind::Upserted);
        Ok(())
    }

    async fn delete(&self, collection: &str, key: &str) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM documents WHERE collection = $1 AND key = $2")
            .bind(collection)
            .bind(key)
            .execute(&self.db)
            .await?;

        let removed = result.rows_affected() > 0;
        if removed {
            self.notify(collection, key, ChangeKind::Deleted);
        }
        Ok(removed)
    }

    async fn list(&self, collection: &str) -> AppResult<Vec<(String, Value)>> {
        let rows = sqlx::query_as::<_, (String, Json<Value>)>(
            "SELECT key, body FROM documents WHERE collection = $1 ORDER BY key",
        )
        .bind(collection)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(|(key, Json(body))| (key, body)).collect())
    }

    async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.db).await?;
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<DocumentChange> {
        self.changes.subscribe()
    }
}
