//! Purchase order models

use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::normalize::normalize_sku;
use crate::types::Brand;

/// Fulfillment state of a purchase order
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Pending,
    Partial,
    Invoiced,
}

impl OrderStatus {
    /// Status for the given order totals
    pub fn from_totals(ordered: u64, invoiced: u64) -> OrderStatus {
        if invoiced == 0 {
            OrderStatus::Pending
        } else if invoiced >= ordered {
            OrderStatus::Invoiced
        } else {
            OrderStatus::Partial
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatus::Pending => write!(f, "Pendente"),
            OrderStatus::Partial => write!(f, "Parcial"),
            OrderStatus::Invoiced => write!(f, "Faturado"),
        }
    }
}

/// Kind of movement recorded against an order item
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum HistoryKind {
    Scheduled,
    Invoiced,
    /// Applied automatically from an invoice (NF) report
    InvoicedViaNf,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistoryEntry {
    #[serde(rename = "type")]
    pub kind: HistoryKind,
    pub quantity: u32,
    pub date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invoice_access_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invoice_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_unit_cost: Option<Decimal>,
}

impl HistoryEntry {
    pub fn manual(kind: HistoryKind, quantity: u32, date: NaiveDate) -> Self {
        Self {
            kind,
            quantity,
            date,
            invoice_access_key: None,
            invoice_number: None,
            actual_unit_cost: None,
        }
    }

    pub fn from_invoice(line: &InvoiceLine, quantity: u32, date: NaiveDate) -> Self {
        Self {
            kind: HistoryKind::InvoicedViaNf,
            quantity,
            date,
            invoice_access_key: Some(line.access_key.clone()),
            invoice_number: line.invoice_number.clone(),
            actual_unit_cost: line.unit_cost,
        }
    }
}

/// Manual action on an order item
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ItemAction {
    /// Units billed by the supplier
    Invoice { quantity: u32 },
    /// Units booked for delivery
    Schedule { quantity: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderError {
    #[error("Quantity must be greater than zero")]
    InvalidQuantity,

    #[error("Order item {0} not found")]
    ItemNotFound(Uuid),
}

/// A line of a purchase order
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderItem {
    pub id: Uuid,
    pub sku: String,
    #[serde(default)]
    pub factory_reference: String,
    #[serde(default)]
    pub description: String,
    pub quantity_ordered: u32,
    pub unit_cost: Decimal,
    #[serde(default)]
    pub invoiced_quantity: u32,
    #[serde(default)]
    pub scheduled_quantity: u32,
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
}

impl OrderItem {
    pub fn new(
        sku: &str,
        factory_reference: &str,
        description: &str,
        quantity_ordered: u32,
        unit_cost: Decimal,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            sku: normalize_sku(sku),
            factory_reference: factory_reference.trim().to_string(),
            description: description.trim().to_string(),
            quantity_ordered,
            unit_cost,
            invoiced_quantity: 0,
            scheduled_quantity: 0,
            history: Vec::new(),
        }
    }

    /// Units still waiting for an invoice
    pub fn pending(&self) -> u32 {
        self.quantity_ordered.saturating_sub(self.invoiced_quantity)
    }

    /// Key used to match invoice lines: the factory reference, or the SKU for
    /// items imported without one
    pub fn match_code(&self) -> String {
        let reference = normalize_sku(&self.factory_reference);
        if reference.is_empty() {
            normalize_sku(&self.sku)
        } else {
            reference
        }
    }

    /// Access keys of the invoices already applied to this item
    pub fn invoice_keys(&self) -> HashSet<String> {
        self.history
            .iter()
            .filter_map(|h| h.invoice_access_key.clone())
            .collect()
    }

    pub fn line_value(&self) -> Decimal {
        self.unit_cost * Decimal::from(self.quantity_ordered)
    }

    /// Apply a manual invoice or schedule action.
    ///
    /// Invoicing releases the same amount from the scheduled counter.
    /// Over-allocation is tolerated.
    pub fn apply(&mut self, action: ItemAction, date: NaiveDate) -> Result<(), OrderError> {
        match action {
            ItemAction::Invoice { quantity } => {
                if quantity == 0 {
                    return Err(OrderError::InvalidQuantity);
                }
                self.invoiced_quantity = self.invoiced_quantity.saturating_add(quantity);
                self.scheduled_quantity = self.scheduled_quantity.saturating_sub(quantity);
                self.history
                    .push(HistoryEntry::manual(HistoryKind::Invoiced, quantity, date));
            }
            ItemAction::Schedule { quantity } => {
                if quantity == 0 {
                    return Err(OrderError::InvalidQuantity);
                }
                self.scheduled_quantity = self.scheduled_quantity.saturating_add(quantity);
                self.history
                    .push(HistoryEntry::manual(HistoryKind::Scheduled, quantity, date));
            }
        }
        Ok(())
    }
}

/// A purchase order placed with a supplier
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PurchaseOrder {
    pub id: Uuid,
    pub order_number: String,
    pub supplier: Brand,
    pub issue_date: NaiveDate,
    #[serde(default)]
    pub status: OrderStatus,
    pub items: Vec<OrderItem>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub created_by: Option<Uuid>,
}

impl PurchaseOrder {
    pub fn new(
        order_number: &str,
        supplier: Brand,
        issue_date: NaiveDate,
        items: Vec<OrderItem>,
        created_by: Option<Uuid>,
    ) -> Self {
        let mut order = Self {
            id: Uuid::new_v4(),
            order_number: order_number.trim().to_string(),
            supplier,
            issue_date,
            status: OrderStatus::Pending,
            items,
            created_at: Utc::now(),
            created_by,
        };
        order.recompute_status();
        order
    }

    pub fn total_ordered(&self) -> u64 {
        self.items.iter().map(|i| u64::from(i.quantity_ordered)).sum()
    }

    pub fn total_invoiced(&self) -> u64 {
        self.items.iter().map(|i| u64::from(i.invoiced_quantity)).sum()
    }

    /// Order value at the quoted unit costs
    pub fn total_value(&self) -> Decimal {
        self.items.iter().map(OrderItem::line_value).sum()
    }

    /// Not yet fully invoiced
    pub fn is_open(&self) -> bool {
        self.status != OrderStatus::Invoiced
    }

    pub fn recompute_status(&mut self) {
        self.status = OrderStatus::from_totals(self.total_ordered(), self.total_invoiced());
    }

    /// Apply a manual action to one item and refresh the status
    pub fn apply_item_action(
        &mut self,
        item_id: Uuid,
        action: ItemAction,
        date: NaiveDate,
    ) -> Result<(), OrderError> {
        let item = self
            .items
            .iter_mut()
            .find(|i| i.id == item_id)
            .ok_or(OrderError::ItemNotFound(item_id))?;
        item.apply(action, date)?;
        self.recompute_status();
        Ok(())
    }
}

/// A line of an invoice (NF) report
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InvoiceLine {
    /// Manufacturer product code, normalized
    pub factory_code: String,
    pub quantity: u32,
    pub access_key: String,
    pub invoice_number: Option<String>,
    pub unit_cost: Option<Decimal>,
}
