//! Validation utilities for purchase orders, exports and settings

use rust_decimal::Decimal;

use crate::metrics::StockPolicy;
use crate::models::OrderItem;

const MAX_ORDER_NUMBER_LEN: usize = 60;
const MAX_FILENAME_LEN: usize = 100;

// ============================================================================
// Purchase Orders
// ============================================================================

/// Validate a purchase order number
pub fn validate_order_number(order_number: &str) -> Result<(), &'static str> {
    let trimmed = order_number.trim();
    if trimmed.is_empty() {
        return Err("Order number is required");
    }
    if trimmed.chars().count() > MAX_ORDER_NUMBER_LEN {
        return Err("Order number is too long");
    }
    Ok(())
}

/// Validate the items of a new purchase order
pub fn validate_order_items(items: &[OrderItem]) -> Result<(), &'static str> {
    if items.is_empty() {
        return Err("An order needs at least one item");
    }
    for item in items {
        if item.sku.trim().is_empty() {
            return Err("Every item needs a SKU");
        }
        if item.quantity_ordered == 0 {
            return Err("Item quantity must be greater than zero");
        }
        if item.unit_cost < Decimal::ZERO {
            return Err("Unit cost cannot be negative");
        }
    }
    Ok(())
}

// ============================================================================
// Exports & Settings
// ============================================================================

/// Validate a user-supplied export base filename
pub fn validate_base_filename(name: &str) -> Result<(), &'static str> {
    if name.chars().count() > MAX_FILENAME_LEN {
        return Err("Filename is too long");
    }
    if name
        .chars()
        .any(|c| matches!(c, '/' | '\\' | ':' | '"' | '*' | '?' | '<' | '>' | '|') || c.is_control())
    {
        return Err("Filename contains invalid characters");
    }
    Ok(())
}

/// Thresholds must be ordered: critical <= low <= excess
pub fn validate_stock_policy(policy: &StockPolicy) -> Result<(), &'static str> {
    if policy.critical_below_days > policy.low_below_days {
        return Err("Critical threshold must not exceed the low threshold");
    }
    if policy.low_below_days > policy.excess_above_days {
        return Err("Low threshold must not exceed the excess threshold");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_number() {
        assert!(validate_order_number("PC-2025-001").is_ok());
        assert!(validate_order_number("   ").is_err());
        assert!(validate_order_number(&"9".repeat(61)).is_err());
    }

    #[test]
    fn test_order_items() {
        assert!(validate_order_items(&[]).is_err());
        let ok = OrderItem::new("A1", "", "", 2, Decimal::from(10));
        assert!(validate_order_items(&[ok.clone()]).is_ok());

        let mut zero = ok.clone();
        zero.quantity_ordered = 0;
        assert!(validate_order_items(&[ok.clone(), zero]).is_err());

        let mut negative = ok;
        negative.unit_cost = Decimal::from(-1);
        assert!(validate_order_items(&[negative]).is_err());
    }

    #[test]
    fn test_base_filename() {
        assert!(validate_base_filename("estoque_julho").is_ok());
        assert!(validate_base_filename("").is_ok());
        assert!(validate_base_filename("../etc").is_err());
        assert!(validate_base_filename("a\nb").is_err());
    }

    #[test]
    fn test_stock_policy() {
        assert!(validate_stock_policy(&StockPolicy::default()).is_ok());
        let inverted = StockPolicy {
            critical_below_days: 40,
            low_below_days: 30,
            excess_above_days: 120,
        };
        assert!(validate_stock_policy(&inverted).is_err());
    }
}
