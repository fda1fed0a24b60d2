//! HTTP handlers for the multisplit dashboard API

pub mod dashboard;
pub mod health;
pub mod orders;
pub mod reporting;
pub mod uploads;

pub use dashboard::{get_brand_detail, get_dashboard, get_schedule, list_products};
pub use health::health_check;
pub use orders::{
    apply_item_action, create_order, delete_order, get_order, import_order_items, list_orders,
    reconcile_invoices,
};
pub use reporting::export_report;
pub use uploads::{get_upload_status, upload_ecommerce, upload_matrix, upload_transit};
