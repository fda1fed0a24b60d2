//! Product matrix, e-commerce and transit models

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::types::{Brand, MonthlySales, ProductType};

/// Sales figures for one SKU in one channel
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct SalesFigures {
    pub by_month: MonthlySales,
    pub year_to_date: f64,
    pub prior_year: f64,
}

impl SalesFigures {
    /// Store channel figures: total minus e-commerce, clamped at zero per field
    pub fn store_share(total: &SalesFigures, ecommerce: &SalesFigures) -> SalesFigures {
        SalesFigures {
            by_month: total
                .by_month
                .zip_with(&ecommerce.by_month, |t, e| (t - e).max(0.0)),
            year_to_date: (total.year_to_date - ecommerce.year_to_date).max(0.0),
            prior_year: (total.prior_year - ecommerce.prior_year).max(0.0),
        }
    }

    /// Field-wise sum, used when a SKU appears on more than one row
    pub fn accumulate(&mut self, other: &SalesFigures) {
        self.by_month = self.by_month.zip_with(&other.by_month, |a, b| a + b);
        self.year_to_date += other.year_to_date;
        self.prior_year += other.prior_year;
    }
}

/// A product from the master sales matrix
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProductRecord {
    /// Normalized SKU, unique within a matrix snapshot
    pub code: String,
    pub description: String,
    pub brand: Brand,
    pub product_type: ProductType,
    /// Manufacturer part code, used to match invoice lines
    pub factory_reference: String,
    pub stock_on_hand: f64,
    pub sales: SalesFigures,
}

/// Incoming shipments for one SKU
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct TransitEntry {
    pub quantity: u32,
    pub earliest_date: Option<NaiveDate>,
}

impl TransitEntry {
    /// Fold another shipment line into this entry
    pub fn add_shipment(&mut self, quantity: u32, date: Option<NaiveDate>) {
        self.quantity = self.quantity.saturating_add(quantity);
        self.earliest_date = match (self.earliest_date, date) {
            (Some(current), Some(new)) => Some(current.min(new)),
            (current, new) => current.or(new),
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Month;

    #[test]
    fn test_store_share_never_negative() {
        let mut total = SalesFigures {
            year_to_date: 10.0,
            prior_year: 4.0,
            ..Default::default()
        };
        total.by_month[Month::May] = 3.0;
        let mut ecommerce = SalesFigures {
            year_to_date: 12.0,
            prior_year: 1.0,
            ..Default::default()
        };
        ecommerce.by_month[Month::May] = 1.0;

        let store = SalesFigures::store_share(&total, &ecommerce);
        assert_eq!(store.year_to_date, 0.0);
        assert_eq!(store.prior_year, 3.0);
        assert_eq!(store.by_month[Month::May], 2.0);
    }

    #[test]
    fn test_transit_keeps_earliest_date() {
        let early = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        let late = NaiveDate::from_ymd_opt(2025, 4, 1).unwrap();
        let mut entry = TransitEntry::default();
        entry.add_shipment(5, Some(late));
        entry.add_shipment(3, None);
        entry.add_shipment(2, Some(early));
        assert_eq!(entry.quantity, 10);
        assert_eq!(entry.earliest_date, Some(early));
    }
}
