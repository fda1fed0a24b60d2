//! Persisted upload snapshots

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ProductRecord, SalesFigures, TransitEntry};

/// Where a snapshot came from
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SourceInfo {
    pub filename: String,
    /// Hex SHA-256 of the uploaded bytes
    pub digest: String,
}

/// The latest upload of one source type. Each upload replaces the previous
/// snapshot as a whole.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Snapshot<T> {
    pub data: T,
    pub updated_at: DateTime<Utc>,
    pub source: Option<SourceInfo>,
}

impl<T> Snapshot<T> {
    pub fn new(data: T, source: Option<SourceInfo>) -> Self {
        Self {
            data,
            updated_at: Utc::now(),
            source,
        }
    }
}

pub type MatrixSnapshot = Snapshot<Vec<ProductRecord>>;
/// E-commerce sales keyed by normalized SKU
pub type EcommerceSnapshot = Snapshot<BTreeMap<String, SalesFigures>>;
/// Shipments keyed by normalized SKU
pub type TransitSnapshot = Snapshot<BTreeMap<String, TransitEntry>>;
