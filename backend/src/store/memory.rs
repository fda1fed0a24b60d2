//! In-process document store

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::{broadcast, RwLock};

use super::{change_channel, ChangeKind, DocumentChange, DocumentStore};
use crate::error::AppResult;

/// Document store kept in memory, for tests and local runs without Postgres
pub struct MemoryDocumentStore {
    documents: RwLock<BTreeMap<(String, String), Value>>,
    changes: broadcast::Sender<DocumentChange>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self {
            documents: RwLock::new(BTreeMap::new()),
            changes: change_channel(),
        }
    }

    fn notify(&self, collection: &str, key: &str, kind: ChangeKind) {
        // no subscribers is fine
        let _ = self.changes.send(DocumentChange {
            collection: collection.to_string(),
            key: key.to_string(),
            kind,
        });
    }
}

impl Default for MemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn get(&self, collection: &str, key: &str) -> AppResult<Option<Value>> {
        let documents = self.documents.read().await;
        Ok(documents
            .get(&(collection.to_string(), key.to_string()))
            .cloned())
    }

    async fn put(&self, collection: &str, key: &str, body: Value) -> AppResult<()> {
        self.documents
            .write()
            .await
            .insert((collection.to_string(), key.to_string()), body);
        self.notify(collection, key, ChangeKind::Upserted);
        Ok(())
    }

    async fn delete(&self, collection: &str, key: &str) -> AppResult<bool> {
        let removed = self
            .documents
            .write()
            .await
            .remove(&(collection.to_string(), key.to_string()))
            .is_some();
        if removed {
            self.notify(collection, key, ChangeKind::Deleted);
        }
        Ok(removed)
    }

    async fn list(&self, collection: &str) -> AppResult<Vec<(String, Value)>> {
        let documents = self.documents.read().await;
        Ok(documents
            .iter()
            .filter(|((c, _), _)| c == collection)
            .map(|((_, k), v)| (k.clone(), v.clone()))
            .collect())
    }

    async fn ping(&self) -> AppResult<()> {
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<DocumentChange> {
        self.changes.subscribe()
    }
}
