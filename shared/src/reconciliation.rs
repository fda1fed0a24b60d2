//! Automatic invoice reconciliation
//!
//! Applies the lines of a supplier invoice (NF) report to the open purchase
//! orders of one brand. Lines are matched to order items by factory code and
//! each invoice access key is applied to a given item at most once, so
//! uploading the same report again changes nothing.

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{HistoryEntry, HistoryKind, InvoiceLine, OrderStatus, PurchaseOrder};
use crate::normalize::normalize_sku;
use crate::types::Brand;

/// Outcome of one reconciliation pass
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ReconciliationSummary {
    pub lines_read: usize,
    /// Lines whose code matched at least one open order item
    pub lines_matched: usize,
    /// Lines that moved quantity in this pass
    pub lines_applied: usize,
    /// Lines skipped because their access key was already applied
    pub lines_already_applied: usize,
    pub lines_unmatched: usize,
    pub units_applied: u64,
    pub updated_orders: Vec<Uuid>,
}

/// Quantity each line still has to give.
///
/// Units already recorded against an access key and product code in any
/// order history are deducted from the lines carrying that key and code, in
/// line order. This keeps one invoice line from being spread over several
/// orders again on a later upload.
fn remaining_line_quantities(orders: &[PurchaseOrder], lines: &[InvoiceLine]) -> Vec<u32> {
    let mut consumed: HashMap<(String, String), u64> = HashMap::new();
    for order in orders {
        for item in &order.items {
            let code = item.match_code();
            for entry in &item.history {
                if entry.kind != HistoryKind::InvoicedViaNf {
                    continue;
                }
                if let Some(key) = &entry.invoice_access_key {
                    *consumed.entry((key.clone(), code.clone())).or_default() +=
                        u64::from(entry.quantity);
                }
            }
        }
    }

    lines
        .iter()
        .map(|line| {
            let left = consumed
                .get_mut(&(line.access_key.clone(), normalize_sku(&line.factory_code)))
                .map(|c| {
                    let take = (*c).min(u64::from(line.quantity));
                    *c -= take;
                    take as u32
                })
                .unwrap_or(0);
            line.quantity - left
        })
        .collect()
}

/// Apply invoice lines to the open orders of `brand`.
///
/// Orders are visited oldest first (issue date, then order number). Within an
/// item, lines are applied in report order until nothing is pending. Order
/// status is refreshed only for orders that received quantity.
pub fn reconcile(
    orders: &mut [PurchaseOrder],
    lines: &[InvoiceLine],
    brand: Brand,
    date: NaiveDate,
) -> ReconciliationSummary {
    let mut by_code: BTreeMap<String, Vec<usize>> = BTreeMap::new();
    for (index, line) in lines.iter().enumerate() {
        let code = normalize_sku(&line.factory_code);
        if !code.is_empty() {
            by_code.entry(code).or_default().push(index);
        }
    }

    let mut remaining = remaining_line_quantities(orders, lines);
    let mut matched = vec![false; lines.len()];
    let mut applied = vec![false; lines.len()];
    let mut deduplicated = vec![false; lines.len()];
    let mut summary = ReconciliationSummary {
        lines_read: lines.len(),
        ..Default::default()
    };

    let mut open: Vec<usize> = orders
        .iter()
        .enumerate()
        .filter(|(_, o)| o.supplier == brand && o.is_open())
        .map(|(i, _)| i)
        .collect();
    open.sort_by(|&a, &b| {
        orders[a]
            .issue_date
            .cmp(&orders[b].issue_date)
            .then_with(|| orders[a].order_number.cmp(&orders[b].order_number))
    });

    for index in open {
        let order = &mut orders[index];
        let mut changed = false;

        for item in order.items.iter_mut() {
            let Some(line_ids) = by_code.get(&item.match_code()) else {
                continue;
            };
            for &id in line_ids {
                matched[id] = true;
            }

            // keys applied in earlier passes; a report may repeat a key
            // across several lines of the same product
            let known_keys = item.invoice_keys();
            let mut pending = item.pending();
            for &id in line_ids {
                if pending == 0 {
                    break;
                }
                let line = &lines[id];
                if known_keys.contains(&line.access_key) || remaining[id] == 0 {
                    deduplicated[id] = true;
                    continue;
                }

                let quantity = pending.min(remaining[id]);
                item.invoiced_quantity += quantity;
                item.history
                    .push(HistoryEntry::from_invoice(line, quantity, date));
                pending -= quantity;
                remaining[id] -= quantity;
                applied[id] = true;
                summary.units_applied += u64::from(quantity);
                changed = true;
            }
        }

        if changed {
            order.status = if order.total_invoiced() >= order.total_ordered() {
                OrderStatus::Invoiced
            } else {
                OrderStatus::Partial
            };
            summary.updated_orders.push(order.id);
        }
    }

    for id in 0..lines.len() {
        if !matched[id] {
            summary.lines_unmatched += 1;
            continue;
        }
        summary.lines_matched += 1;
        if applied[id] {
            summary.lines_applied += 1;
        } else if deduplicated[id] {
            summary.lines_already_applied += 1;
        }
    }

    summary
}
