//! Delivery calendar built from the transit report

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::models::{ProductRecord, TransitEntry};
use crate::types::{Brand, Month};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeliveryEvent {
    pub sku: String,
    pub description: String,
    pub brand: Brand,
    pub quantity: u32,
}

/// Expected arrivals on one day
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeliveryDay {
    pub date: NaiveDate,
    pub total_units: u64,
    pub events: Vec<DeliveryEvent>,
}

/// Arrivals expected in a month, by day.
///
/// Only SKUs present in the matrix with a positive quantity and a known
/// date are listed.
pub fn delivery_calendar(
    matrix: &[ProductRecord],
    transit: &BTreeMap<String, TransitEntry>,
    year: i32,
    month: Month,
) -> Vec<DeliveryDay> {
    let products: BTreeMap<&str, &ProductRecord> =
        matrix.iter().map(|p| (p.code.as_str(), p)).collect();

    let mut days: BTreeMap<NaiveDate, Vec<DeliveryEvent>> = BTreeMap::new();
    for (sku, entry) in transit {
        let Some(date) = entry.earliest_date else {
            continue;
        };
        if entry.quantity == 0 || date.year() != year || date.month() != month.number() {
            continue;
        }
        let Some(product) = products.get(sku.as_str()) else {
            continue;
        };
        days.entry(date).or_default().push(DeliveryEvent {
            sku: sku.clone(),
            description: product.description.clone(),
            brand: product.brand,
            quantity: entry.quantity,
        });
    }

    days.into_iter()
        .map(|(date, events)| DeliveryDay {
            date,
            total_units: events.iter().map(|e| u64::from(e.quantity)).sum(),
            events,
        })
        .collect()
}
