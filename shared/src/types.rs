//! Common types used across the platform

use std::fmt;
use std::ops::{Index, IndexMut};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Equipment brands carried by the distributor
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "UPPERCASE")]
pub enum Brand {
    Daikin,
    Elgin,
    Fujitsu,
    Gree,
    Lg,
    Samsung,
    Midea,
    /// Anything outside the commercial line-up
    Other,
}

impl Brand {
    /// Allowed brands in inference priority order
    pub const ALLOWED: [Brand; 7] = [
        Brand::Daikin,
        Brand::Elgin,
        Brand::Fujitsu,
        Brand::Gree,
        Brand::Lg,
        Brand::Samsung,
        Brand::Midea,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Brand::Daikin => "DAIKIN",
            Brand::Elgin => "ELGIN",
            Brand::Fujitsu => "FUJITSU",
            Brand::Gree => "GREE",
            Brand::Lg => "LG",
            Brand::Samsung => "SAMSUNG",
            Brand::Midea => "MIDEA",
            Brand::Other => "OTHER",
        }
    }

    /// Infer the brand from a product description.
    ///
    /// The first allowed brand name found in the upper-cased description wins.
    /// Springer is a Midea label, so a description mentioning it without any
    /// listed brand maps to [`Brand::Midea`].
    pub fn infer(description: &str) -> Brand {
        let upper = description.to_uppercase();
        Brand::ALLOWED
            .iter()
            .copied()
            .find(|brand| upper.contains(brand.as_str()))
            .unwrap_or_else(|| {
                if upper.contains("SPRINGER") {
                    Brand::Midea
                } else {
                    Brand::Other
                }
            })
    }
}

impl fmt::Display for Brand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Brand {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_uppercase();
        if upper == "OTHER" || upper == "OUTRA" {
            return Ok(Brand::Other);
        }
        Brand::ALLOWED
            .iter()
            .copied()
            .find(|brand| brand.as_str() == upper)
            .ok_or("Unknown brand")
    }
}

/// Split-system unit type
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ProductType {
    /// Outdoor unit
    Condenser,
    /// Indoor unit
    Evaporator,
    Other,
}

impl ProductType {
    /// Infer the unit type from description keywords
    pub fn infer(description: &str) -> ProductType {
        let upper = description.to_uppercase();
        if upper.contains("COND") || upper.contains("EXTERNA") {
            ProductType::Condenser
        } else if upper.contains("EVAP") || upper.contains("INTERNA") {
            ProductType::Evaporator
        } else {
            ProductType::Other
        }
    }

    /// Label used in reports
    pub fn label(&self) -> &'static str {
        match self {
            ProductType::Condenser => "Condensadora",
            ProductType::Evaporator => "Evaporadora",
            ProductType::Other => "Outros",
        }
    }
}

impl fmt::Display for ProductType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Sales channel a view is scoped to
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum SalesChannel {
    /// Everything in the product matrix
    #[default]
    Total,
    /// Physical store, i.e. total minus e-commerce
    Store,
    Ecommerce,
}

impl SalesChannel {
    pub fn label(&self) -> &'static str {
        match self {
            SalesChannel::Total => "Total",
            SalesChannel::Store => "Loja",
            SalesChannel::Ecommerce => "E-commerce",
        }
    }

    /// Token used when composing export filenames
    pub fn file_token(&self) -> &'static str {
        match self {
            SalesChannel::Total => "TOTAL",
            SalesChannel::Store => "LOJA",
            SalesChannel::Ecommerce => "ECOMMERCE",
        }
    }
}

/// Calendar month
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Month {
    January,
    February,
    March,
    April,
    May,
    June,
    July,
    August,
    September,
    October,
    November,
    December,
}

impl Month {
    pub const ALL: [Month; 12] = [
        Month::January,
        Month::February,
        Month::March,
        Month::April,
        Month::May,
        Month::June,
        Month::July,
        Month::August,
        Month::September,
        Month::October,
        Month::November,
        Month::December,
    ];

    /// Month from its 1-based number
    pub fn from_number(number: u32) -> Option<Month> {
        number
            .checked_sub(1)
            .and_then(|index| Month::ALL.get(index as usize))
            .copied()
    }

    /// 1-based month number
    pub fn number(&self) -> u32 {
        self.index() as u32 + 1
    }

    pub fn index(&self) -> usize {
        *self as usize
    }

    /// The month before this one, wrapping December
    pub fn previous(&self) -> Month {
        Month::ALL[(self.index() + 11) % 12]
    }

    /// Three-letter Portuguese abbreviation as found in sheet headers
    pub fn short_name(&self) -> &'static str {
        match self {
            Month::January => "Jan",
            Month::February => "Fev",
            Month::March => "Mar",
            Month::April => "Abr",
            Month::May => "Mai",
            Month::June => "Jun",
            Month::July => "Jul",
            Month::August => "Ago",
            Month::September => "Set",
            Month::October => "Out",
            Month::November => "Nov",
            Month::December => "Dez",
        }
    }

    pub fn full_name(&self) -> &'static str {
        match self {
            Month::January => "Janeiro",
            Month::February => "Fevereiro",
            Month::March => "Março",
            Month::April => "Abril",
            Month::May => "Maio",
            Month::June => "Junho",
            Month::July => "Julho",
            Month::August => "Agosto",
            Month::September => "Setembro",
            Month::October => "Outubro",
            Month::November => "Novembro",
            Month::December => "Dezembro",
        }
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}

/// Unit sales for each month of the year, zero-filled
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct MonthlySales([f64; 12]);

impl MonthlySales {
    pub fn new(values: [f64; 12]) -> Self {
        Self(values)
    }

    pub fn get(&self, month: Month) -> f64 {
        self.0[month.index()]
    }

    /// Sum over the given months
    pub fn sum_of(&self, months: &[Month]) -> f64 {
        months.iter().map(|m| self.get(*m)).sum()
    }

    pub fn total(&self) -> f64 {
        self.0.iter().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Month, f64)> + '_ {
        Month::ALL.iter().map(move |m| (*m, self.get(*m)))
    }

    /// Combine month by month
    pub fn zip_with(&self, other: &MonthlySales, f: impl Fn(f64, f64) -> f64) -> MonthlySales {
        let mut out = [0.0; 12];
        for (i, slot) in out.iter_mut().enumerate() {
            *slot = f(self.0[i], other.0[i]);
        }
        MonthlySales(out)
    }
}

impl Index<Month> for MonthlySales {
    type Output = f64;

    fn index(&self, month: Month) -> &f64 {
        &self.0[month.index()]
    }
}

impl IndexMut<Month> for MonthlySales {
    fn index_mut(&mut self, month: Month) -> &mut f64 {
        &mut self.0[month.index()]
    }
}

/// Stock coverage buckets used to filter product listings
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum StockFilter {
    #[default]
    All,
    Low,
    Critical,
    Excess,
}
