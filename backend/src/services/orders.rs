//! Purchase order service
//!
//! Orders are stored one document per order. Invoice reconciliation loads the
//! open orders, applies the invoice report and writes back the orders that
//! received quantity.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::ingest::{ingest_invoice_report, ingest_order_items, IngestReport};
use shared::reconciliation::{reconcile, ReconciliationSummary};
use shared::{Brand, ItemAction, OrderItem, PurchaseOrder};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::services::workbook::{read_rows, WorkbookError};
use crate::store::{self, SharedStore, ORDERS_COLLECTION};

/// Item line of a new order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItemInput {
    pub sku: String,
    #[serde(default)]
    pub factory_reference: String,
    #[serde(default)]
    pub description: String,
    pub quantity_ordered: u32,
    #[serde(default)]
    pub unit_cost: Decimal,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateOrderInput {
    #[validate(length(min = 1, max = 60))]
    pub order_number: String,
    pub supplier: Brand,
    pub issue_date: NaiveDate,
    #[validate(length(min = 1))]
    pub items: Vec<OrderItemInput>,
}

/// Reconciliation outcome including rows dropped from the report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcileReport {
    #[serde(flatten)]
    pub summary: ReconciliationSummary,
    /// Report rows without code, access key or quantity
    pub rows_skipped: usize,
}

/// Purchase order service
#[derive(Clone)]
pub struct OrderService {
    store: SharedStore,
}

impl OrderService {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    async fn all_orders(&self) -> AppResult<Vec<PurchaseOrder>> {
        self.store
            .list(ORDERS_COLLECTION)
            .await?
            .into_iter()
            .map(|(_, body)| serde_json::from_value(body).map_err(AppError::from))
            .collect()
    }

    async fn save(&self, order: &PurchaseOrder) -> AppResult<()> {
        store::save(
            self.store.as_ref(),
            ORDERS_COLLECTION,
            &order.id.to_string(),
            order,
        )
        .await
    }

    /// Orders newest first, optionally for one supplier
    pub async fn list(&self, supplier: Option<Brand>) -> AppResult<Vec<PurchaseOrder>> {
        let mut orders: Vec<PurchaseOrder> = self
            .all_orders()
            .await?
            .into_iter()
            .filter(|o| supplier.map_or(true, |s| o.supplier == s))
            .collect();
        orders.sort_by(|a, b| {
            b.issue_date
                .cmp(&a.issue_date)
                .then_with(|| b.created_at.cmp(&a.created_at))
        });
        Ok(orders)
    }

    pub async fn get(&self, order_id: Uuid) -> AppResult<PurchaseOrder> {
        store::load(self.store.as_ref(), ORDERS_COLLECTION, &order_id.to_string())
            .await?
            .ok_or_else(|| AppError::NotFound("Purchase order".to_string()))
    }

    pub async fn create(&self, user_id: Uuid, input: CreateOrderInput) -> AppResult<PurchaseOrder> {
        input.validate().map_err(|errors| {
            let field = errors
                .field_errors()
                .keys()
                .next()
                .map(|f| f.to_string())
                .unwrap_or_else(|| "order".to_string());
            AppError::Validation {
                field,
                message: "Order number and at least one item are required".to_string(),
                message_pt: "Número do pedido e ao menos um item são obrigatórios".to_string(),
            }
        })?;

        shared::validate_order_number(&input.order_number).map_err(|msg| {
            AppError::validation("order_number", msg, "Número do pedido inválido")
        })?;

        let items: Vec<OrderItem> = input
            .items
            .iter()
            .map(|i| {
                OrderItem::new(
                    &i.sku,
                    &i.factory_reference,
                    &i.description,
                    i.quantity_ordered,
                    i.unit_cost,
                )
            })
            .collect();
        shared::validate_order_items(&items)
            .map_err(|msg| AppError::validation("items", msg, "Itens do pedido inválidos"))?;

        let order = PurchaseOrder::new(
            &input.order_number,
            input.supplier,
            input.issue_date,
            items,
            Some(user_id),
        );
        self.save(&order).await?;

        tracing::info!(
            order_id = %order.id,
            order_number = %order.order_number,
            supplier = %order.supplier,
            items = order.items.len(),
            "Purchase order created"
        );
        Ok(order)
    }

    pub async fn delete(&self, order_id: Uuid) -> AppResult<()> {
        if !self
            .store
            .delete(ORDERS_COLLECTION, &order_id.to_string())
            .await?
        {
            return Err(AppError::NotFound("Purchase order".to_string()));
        }
        tracing::info!(order_id = %order_id, "Purchase order deleted");
        Ok(())
    }

    /// Record a manual invoice or schedule on one item
    pub async fn apply_item_action(
        &self,
        order_id: Uuid,
        item_id: Uuid,
        action: ItemAction,
        date: NaiveDate,
    ) -> AppResult<PurchaseOrder> {
        let mut order = self.get(order_id).await?;
        order.apply_item_action(item_id, action, date)?;
        self.save(&order).await?;
        Ok(order)
    }

    /// Read draft items from an order spreadsheet; nothing is stored
    pub async fn import_items(
        &self,
        filename: &str,
        bytes: Vec<u8>,
    ) -> AppResult<IngestReport<Vec<OrderItem>>> {
        let filename = filename.to_string();
        let report = tokio::task::spawn_blocking(move || -> Result<_, WorkbookError> {
            let rows = read_rows(&filename, bytes)?;
            Ok(ingest_order_items(&rows))
        })
        .await
        .map_err(|e| AppError::Internal(format!("Import task failed: {}", e)))??;

        if report.accepted == 0 {
            return Err(AppError::validation(
                "file",
                "No items found in the spreadsheet",
                "Nenhum item encontrado na planilha",
            ));
        }
        Ok(report)
    }

    /// Apply an invoice report to the open orders of `brand`
    pub async fn reconcile(
        &self,
        brand: Brand,
        filename: &str,
        bytes: Vec<u8>,
        date: NaiveDate,
    ) -> AppResult<ReconcileReport> {
        let orders = self.all_orders().await?;
        let filename = filename.to_string();

        let (orders, summary, rows_skipped) =
            tokio::task::spawn_blocking(move || -> Result<_, WorkbookError> {
                let rows = read_rows(&filename, bytes)?;
                let report = ingest_invoice_report(&rows);
                let mut orders = orders;
                let summary = reconcile(&mut orders, &report.records, brand, date);
                Ok((orders, summary, report.skipped))
            })
            .await
            .map_err(|e| AppError::Internal(format!("Reconciliation task failed: {}", e)))??;

        for order in orders
            .iter()
            .filter(|o| summary.updated_orders.contains(&o.id))
        {
            self.save(order).await?;
        }

        tracing::info!(
            brand = %brand,
            lines_read = summary.lines_read,
            lines_applied = summary.lines_applied,
            lines_already_applied = summary.lines_already_applied,
            lines_unmatched = summary.lines_unmatched,
            units_applied = summary.units_applied,
            orders_updated = summary.updated_orders.len(),
            "Invoice report reconciled"
        );

        Ok(ReconcileReport {
            summary,
            rows_skipped,
        })
    }
}
