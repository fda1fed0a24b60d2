//! Document store
//!
//! Snapshots and purchase orders are kept as JSON documents addressed by
//! collection and key. Writers publish a [`DocumentChange`] so readers can
//! drop derived data.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tokio::sync::broadcast;

use crate::error::AppResult;

mod memory;
mod postgres;

pub use memory::MemoryDocumentStore;
pub use postgres::PgDocumentStore;

/// Collection holding the matrix, e-commerce and transit snapshots
pub const ANALYTICS_COLLECTION: &str = "bi_analytics";
pub const MATRIX_KEY: &str = "matrix";
pub const ECOMMERCE_KEY: &str = "ecommerce";
pub const TRANSIT_KEY: &str = "transit";

/// One document per purchase order, keyed by order id
pub const ORDERS_COLLECTION: &str = "purchase_orders";

const CHANGE_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Upserted,
    Deleted,
}

/// Notification sent after a document is written or removed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentChange {
    pub collection: String,
    pub key: String,
    pub kind: ChangeKind,
}

fn change_channel() -> broadcast::Sender<DocumentChange> {
    broadcast::channel(CHANGE_CHANNEL_CAPACITY).0
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, collection: &str, key: &str) -> AppResult<Option<Value>>;

    /// Insert or replace a document
    async fn put(&self, collection: &str, key: &str, body: Value) -> AppResult<()>;

    /// Remove a document, returning whether it existed
    async fn delete(&self, collection: &str, key: &str) -> AppResult<bool>;

    /// All documents of a collection ordered by key
    async fn list(&self, collection: &str) -> AppResult<Vec<(String, Value)>>;

    /// Check the backing storage is reachable
    async fn ping(&self) -> AppResult<()>;

    fn subscribe(&self) -> broadcast::Receiver<DocumentChange>;
}

pub type SharedStore = Arc<dyn DocumentStore>;

/// Read and decode a document; a missing document yields the default value
pub async fn load_or_default<T>(store: &dyn DocumentStore, collection: &str, key: &str) -> AppResult<T>
where
    T: DeserializeOwned + Default,
{
    match store.get(collection, key).await? {
        Some(body) => Ok(serde_json::from_value(body)?),
        None => Ok(T::default()),
    }
}

/// Read and decode a document
pub async fn load<T: DeserializeOwned>(
    store: &dyn DocumentStore,
    collection: &str,
    key: &str,
) -> AppResult<Option<T>> {
    store
        .get(collection, key)
        .await?
        .map(serde_json::from_value)
        .transpose()
        .map_err(Into::into)
}

/// Encode and write a document
pub async fn save<T: Serialize>(
    store: &dyn DocumentStore,
    collection: &str,
    key: &str,
    value: &T,
) -> AppResult<()> {
    store.put(collection, key, serde_json::to_value(value)?).await
}
