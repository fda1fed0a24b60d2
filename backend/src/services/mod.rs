//! Business logic services for the multisplit dashboard server

pub mod dashboard;
pub mod ingestion;
pub mod orders;
pub mod reporting;
pub mod workbook;

pub use dashboard::{spawn_view_invalidation, DashboardService, ViewCache};
pub use ingestion::{IngestionService, UploadKind};
pub use orders::OrderService;
pub use reporting::{ReportingService, XLSX_CONTENT_TYPE};
