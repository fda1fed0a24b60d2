//! Invoice reconciliation tests
//!
//! Tests for applying invoice (NF) reports to purchase orders including:
//! - Partial and complete fulfilment
//! - Re-upload idempotence keyed by access key
//! - Oldest-order-first allocation without double counting

use chrono::NaiveDate;
use proptest::prelude::*;
use rust_decimal::Decimal;
use shared::reconciliation::reconcile;
use shared::{Brand, InvoiceLine, OrderItem, OrderStatus, PurchaseOrder};

fn date(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 5, d).unwrap()
}

fn order(number: &str, day: u32, items: &[(&str, u32)]) -> PurchaseOrder {
    let items = items
        .iter()
        .map(|(code, qty)| OrderItem::new(code, code, "CONDENSADORA", *qty, Decimal::new(1000, 0)))
        .collect();
    PurchaseOrder::new(number, Brand::Daikin, date(day), items, None)
}

fn line(code: &str, quantity: u32, key: &str) -> InvoiceLine {
    InvoiceLine {
        factory_code: code.to_string(),
        quantity,
        access_key: key.to_string(),
        invoice_number: None,
        unit_cost: None,
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// Test two invoices of four fill ten units partially, a third completes it
    #[test]
    fn test_partial_then_complete() {
        let mut orders = vec![order("PO-1", 1, &[("RX09", 10)])];

        let summary = reconcile(
            &mut orders,
            &[line("RX09", 4, "K1"), line("RX09", 4, "K2")],
            Brand::Daikin,
            date(20),
        );
        assert_eq!(summary.units_applied, 8);
        assert_eq!(orders[0].items[0].invoiced_quantity, 8);
        assert_eq!(orders[0].status, OrderStatus::Partial);

        let summary = reconcile(&mut orders, &[line("RX09", 2, "K3")], Brand::Daikin, date(21));
        assert_eq!(summary.units_applied, 2);
        assert_eq!(orders[0].items[0].invoiced_quantity, 10);
        assert_eq!(orders[0].status, OrderStatus::Invoiced);
    }

    /// Test the same report applied twice changes nothing the second time
    #[test]
    fn test_reupload_is_noop() {
        let mut orders = vec![order("PO-1", 1, &[("RX09", 10)])];
        let report = [line("RX09", 4, "K1"), line("RX09", 4, "K2")];

        reconcile(&mut orders, &report, Brand::Daikin, date(20));
        let after_first = orders.clone();
        let second = reconcile(&mut orders, &report, Brand::Daikin, date(21));

        assert_eq!(second.units_applied, 0);
        assert_eq!(second.lines_already_applied, 2);
        assert!(second.updated_orders.is_empty());
        assert_eq!(orders, after_first);
    }

    /// Test one line is spread over orders oldest first and never counted twice
    #[test]
    fn test_oldest_order_first() {
        let mut orders = vec![
            order("PO-2", 15, &[("RX09", 5)]),
            order("PO-1", 2, &[("RX09", 5)]),
        ];
        let report = [line("RX09", 7, "K1")];

        let summary = reconcile(&mut orders, &report, Brand::Daikin, date(20));
        assert_eq!(summary.units_applied, 7);
        assert_eq!(orders[1].items[0].invoiced_quantity, 5);
        assert_eq!(orders[0].items[0].invoiced_quantity, 2);

        let again = reconcile(&mut orders, &report, Brand::Daikin, date(21));
        assert_eq!(again.units_applied, 0);
        assert_eq!(orders[0].items[0].invoiced_quantity, 2);
    }

    /// Test two lines of one invoice for the same product both count
    #[test]
    fn test_same_key_on_two_lines() {
        let mut orders = vec![order("PO-1", 1, &[("RX09", 10)])];
        let report = [line("RX09", 4, "K1"), line("RX09", 4, "K1")];

        let summary = reconcile(&mut orders, &report, Brand::Daikin, date(20));
        assert_eq!(orders[0].items[0].invoiced_quantity, 8);
        assert_eq!(summary.units_applied, 8);
        assert_eq!(summary.lines_already_applied, 0);

        let second = reconcile(&mut orders, &report, Brand::Daikin, date(21));
        assert_eq!(second.units_applied, 0);
        assert_eq!(orders[0].items[0].invoiced_quantity, 8);
    }

    /// Test unmatched codes and other suppliers are left alone
    #[test]
    fn test_unmatched_and_other_brand() {
        let mut orders = vec![order("PO-1", 1, &[("RX09", 10)])];

        let summary = reconcile(
            &mut orders,
            &[line("ZZ99", 3, "K1"), line("rx 09", 3, "K2")],
            Brand::Gree,
            date(20),
        );
        assert_eq!(summary.units_applied, 0);
        assert_eq!(summary.lines_unmatched, 2);
        assert_eq!(orders[0].status, OrderStatus::Pending);
    }

    /// Test invoice history keeps the access key and invoice data
    #[test]
    fn test_history_records_invoice() {
        let mut orders = vec![order("PO-1", 1, &[("RX09", 10)])];
        let mut nf = line("RX09", 3, "K1");
        nf.invoice_number = Some("101".to_string());
        nf.unit_cost = Some(Decimal::new(95050, 2));

        reconcile(&mut orders, &[nf], Brand::Daikin, date(20));
        let entry = &orders[0].items[0].history[0];
        assert_eq!(entry.invoice_access_key.as_deref(), Some("K1"));
        assert_eq!(entry.invoice_number.as_deref(), Some("101"));
        assert_eq!(entry.actual_unit_cost, Some(Decimal::new(95050, 2)));
        assert_eq!(entry.date, date(20));
    }
}

// ============================================================================
// Property Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    const CODES: [&str; 3] = ["RX09", "RX12", "RX18"];
    const KEYS: [&str; 4] = ["K1", "K2", "K3", "K4"];

    fn orders_strategy() -> impl Strategy<Value = Vec<Vec<(usize, u32)>>> {
        prop::collection::vec(prop::collection::vec((0usize..3, 1u32..20), 1..4), 1..4)
    }

    fn lines_strategy() -> impl Strategy<Value = Vec<(usize, usize, u32)>> {
        prop::collection::vec((0usize..3, 0usize..4, 1u32..15), 0..8)
    }

    fn build(orders: &[Vec<(usize, u32)>], lines: &[(usize, usize, u32)]) -> (Vec<PurchaseOrder>, Vec<InvoiceLine>) {
        let orders = orders
            .iter()
            .enumerate()
            .map(|(i, items)| {
                let items: Vec<(&str, u32)> = items.iter().map(|(c, q)| (CODES[*c], *q)).collect();
                order(&format!("PO-{}", i), (i as u32 % 28) + 1, &items)
            })
            .collect();
        let lines = lines
            .iter()
            .map(|(c, k, q)| line(CODES[*c], *q, KEYS[*k]))
            .collect();
        (orders, lines)
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Reapplying a report never moves more quantity
        #[test]
        fn prop_reconcile_idempotent(orders in orders_strategy(), lines in lines_strategy()) {
            let (mut orders, lines) = build(&orders, &lines);

            reconcile(&mut orders, &lines, Brand::Daikin, date(20));
            let after_first = orders.clone();
            let second = reconcile(&mut orders, &lines, Brand::Daikin, date(21));

            prop_assert_eq!(second.units_applied, 0);
            prop_assert_eq!(orders, after_first);
        }

        /// Items are never invoiced beyond the ordered quantity and the report
        /// is never over-consumed
        #[test]
        fn prop_reconcile_bounded(orders in orders_strategy(), lines in lines_strategy()) {
            let (mut orders, lines) = build(&orders, &lines);

            let summary = reconcile(&mut orders, &lines, Brand::Daikin, date(20));
            let available: u64 = lines.iter().map(|l| u64::from(l.quantity)).sum();
            prop_assert!(summary.units_applied <= available);

            for order in &orders {
                for item in &order.items {
                    prop_assert!(item.invoiced_quantity <= item.quantity_ordered);
                }
            }
            prop_assert_eq!(
                summary.lines_matched + summary.lines_unmatched,
                summary.lines_read
            );
        }
    }
}
