//! Shared types and logic for the multisplit inventory dashboard
//!
//! This crate holds everything that does not touch I/O: spreadsheet value
//! normalization, ingestion, derived metrics, invoice reconciliation and
//! report building. It is used by the backend and, via WASM, by the browser.

pub mod export;
pub mod ingest;
pub mod metrics;
pub mod models;
pub mod normalize;
pub mod reconciliation;
pub mod schedule;
pub mod types;
pub mod validation;

pub use models::*;
pub use types::*;
pub use validation::*;
