//! Derived sales and stock metrics
//!
//! Everything here is a pure function of the three source snapshots and a
//! [`TimeContext`]. The caller decides when to recompute.

use std::collections::BTreeMap;

use chrono::{Datelike, Local, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::models::{ProductRecord, SalesFigures, TransitEntry};
use crate::normalize::fold_header;
use crate::types::{Brand, Month, ProductType, SalesChannel, StockFilter};

/// Coverage reported when there is stock but no recent sales
pub const NO_SALES_COVERAGE_DAYS: u32 = 999;

/// Up to this day of the month the current month is left out of the
/// velocity window
pub const EARLY_MONTH_PIVOT_DAY: u32 = 10;

const BEST_SELLERS: usize = 5;

/// Number of days in the given month
pub fn days_in_month(year: i32, month: Month) -> u32 {
    let (next_year, next_month) = match month {
        Month::December => (year + 1, 1),
        other => (year, other.number() + 1),
    };
    match (
        NaiveDate::from_ymd_opt(year, month.number(), 1),
        NaiveDate::from_ymd_opt(next_year, next_month, 1),
    ) {
        (Some(first), Some(next)) => (next - first).num_days() as u32,
        _ => 30,
    }
}

/// Calendar facts derived once per request from a reference date
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimeContext {
    pub today: NaiveDate,
    pub year: i32,
    pub current_month: Month,
    pub previous_month: Month,
    pub two_months_ago: Month,
    /// Oldest first, ending with the current month
    pub last_3_months: [Month; 3],
    pub day_of_month: u32,
    pub days_in_previous_month: u32,
    pub days_in_two_months_ago: u32,
}

impl TimeContext {
    pub fn from_date(today: NaiveDate) -> Self {
        let year = today.year();
        let current_month = Month::from_number(today.month()).unwrap_or(Month::January);
        let previous_month = current_month.previous();
        let two_months_ago = previous_month.previous();

        let previous_year = if current_month == Month::January {
            year - 1
        } else {
            year
        };
        let two_ago_year = if matches!(current_month, Month::January | Month::February) {
            year - 1
        } else {
            year
        };

        Self {
            today,
            year,
            current_month,
            previous_month,
            two_months_ago,
            last_3_months: [two_months_ago, previous_month, current_month],
            day_of_month: today.day(),
            days_in_previous_month: days_in_month(previous_year, previous_month),
            days_in_two_months_ago: days_in_month(two_ago_year, two_months_ago),
        }
    }

    /// Context for the local wall-clock date
    pub fn now() -> Self {
        Self::from_date(Local::now().date_naive())
    }

    /// Sales in the velocity window and the window length in days.
    ///
    /// Early in the month the window is the two previous full months; later
    /// it is the previous month plus the elapsed part of the current one.
    pub fn velocity_window(&self, sales: &SalesFigures) -> (f64, u32) {
        if self.day_of_month <= EARLY_MONTH_PIVOT_DAY {
            (
                sales
                    .by_month
                    .sum_of(&[self.previous_month, self.two_months_ago]),
                self.days_in_previous_month + self.days_in_two_months_ago,
            )
        } else {
            (
                sales
                    .by_month
                    .sum_of(&[self.current_month, self.previous_month]),
                self.days_in_previous_month + self.day_of_month,
            )
        }
    }
}

/// Days the available units last at the window's daily sales rate
pub fn coverage_days(window_sales: f64, window_days: u32, available_units: f64) -> u32 {
    let daily_average = window_sales / f64::from(window_days.max(1));
    if daily_average > 0.0 {
        (available_units.max(0.0) / daily_average).ceil() as u32
    } else if available_units > 0.0 {
        NO_SALES_COVERAGE_DAYS
    } else {
        0
    }
}

/// Sales figures of one SKU as seen from a channel
pub fn channel_figures(
    total: &SalesFigures,
    ecommerce: Option<&SalesFigures>,
    channel: SalesChannel,
) -> SalesFigures {
    match channel {
        SalesChannel::Total => *total,
        SalesChannel::Ecommerce => ecommerce.copied().unwrap_or_default(),
        SalesChannel::Store => match ecommerce {
            Some(ecommerce) => SalesFigures::store_share(total, ecommerce),
            None => *total,
        },
    }
}

/// Coverage thresholds in days, used by stock filters
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct StockPolicy {
    pub critical_below_days: u32,
    pub low_below_days: u32,
    pub excess_above_days: u32,
}

impl Default for StockPolicy {
    fn default() -> Self {
        Self {
            critical_below_days: 15,
            low_below_days: 30,
            excess_above_days: 120,
        }
    }
}

impl StockPolicy {
    /// Whether a coverage value falls in the filter's bucket. Low includes
    /// the critical range.
    pub fn matches(&self, filter: StockFilter, coverage_days: u32) -> bool {
        match filter {
            StockFilter::All => true,
            StockFilter::Critical => coverage_days < self.critical_below_days,
            StockFilter::Low => coverage_days < self.low_below_days,
            StockFilter::Excess => coverage_days > self.excess_above_days,
        }
    }
}

/// A product with its channel figures and derived fields
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EnrichedProduct {
    pub code: String,
    pub description: String,
    pub brand: Brand,
    pub product_type: ProductType,
    pub factory_reference: String,
    pub stock_on_hand: f64,
    pub transit_quantity: u32,
    pub transit_date: Option<NaiveDate>,
    pub sales: SalesFigures,
    pub current_month_sales: f64,
    pub previous_month_sales: f64,
    /// Sales over [`TimeContext::last_3_months`]
    pub recent_sales: f64,
    pub coverage_days: u32,
}

impl EnrichedProduct {
    pub fn available_units(&self) -> f64 {
        self.stock_on_hand + f64::from(self.transit_quantity)
    }

    fn matches_search(&self, needle: &str) -> bool {
        [&self.code, &self.description, &self.factory_reference]
            .iter()
            .any(|field| fold_header(field).contains(needle))
    }
}

/// Derive one product's view for a channel
pub fn enrich_product(
    product: &ProductRecord,
    ecommerce: &BTreeMap<String, SalesFigures>,
    transit: &BTreeMap<String, TransitEntry>,
    time: &TimeContext,
    channel: SalesChannel,
) -> EnrichedProduct {
    let sales = channel_figures(&product.sales, ecommerce.get(&product.code), channel);
    let shipment = transit.get(&product.code);
    let transit_quantity = shipment.map(|t| t.quantity).unwrap_or(0);

    let (window_sales, window_days) = time.velocity_window(&sales);
    let available = product.stock_on_hand + f64::from(transit_quantity);

    EnrichedProduct {
        code: product.code.clone(),
        description: product.description.clone(),
        brand: product.brand,
        product_type: product.product_type,
        factory_reference: product.factory_reference.clone(),
        stock_on_hand: product.stock_on_hand,
        transit_quantity,
        transit_date: shipment.and_then(|t| t.earliest_date),
        current_month_sales: sales.by_month[time.current_month],
        previous_month_sales: sales.by_month[time.previous_month],
        recent_sales: sales.by_month.sum_of(&time.last_3_months),
        coverage_days: coverage_days(window_sales, window_days, available),
        sales,
    }
}

/// Headline totals across the whole matrix
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct Kpis {
    pub sales_year_to_date: f64,
    pub sales_prior_year: f64,
    pub stock_on_hand: f64,
    pub transit_units: u64,
}

/// Per-brand aggregate
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BrandSummary {
    pub brand: Brand,
    pub sales_year_to_date: f64,
    pub sales_prior_year: f64,
    pub stock_on_hand: f64,
    pub transit_units: u64,
    pub condensers: usize,
    pub evaporators: usize,
    /// Year-over-year growth as a fraction; zero without prior-year sales
    pub growth: f64,
}

impl BrandSummary {
    fn empty(brand: Brand) -> Self {
        Self {
            brand,
            sales_year_to_date: 0.0,
            sales_prior_year: 0.0,
            stock_on_hand: 0.0,
            transit_units: 0,
            condensers: 0,
            evaporators: 0,
            growth: 0.0,
        }
    }

    fn add(&mut self, product: &EnrichedProduct) {
        self.sales_year_to_date += product.sales.year_to_date;
        self.sales_prior_year += product.sales.prior_year;
        self.stock_on_hand += product.stock_on_hand;
        self.transit_units += u64::from(product.transit_quantity);
        match product.product_type {
            ProductType::Condenser => self.condensers += 1,
            ProductType::Evaporator => self.evaporators += 1,
            ProductType::Other => {}
        }
    }

    fn finish(mut self) -> Self {
        self.growth = growth(self.sales_year_to_date, self.sales_prior_year);
        self
    }
}

/// Fractional growth of `current` over `prior`; zero without a prior base
pub fn growth(current: f64, prior: f64) -> f64 {
    if prior > 0.0 {
        (current - prior) / prior
    } else {
        0.0
    }
}

/// Aggregate the allowed brands, best selling first. Products of other
/// brands are left out.
pub fn aggregate_brands(products: &[EnrichedProduct]) -> Vec<BrandSummary> {
    let mut summaries: Vec<BrandSummary> = Brand::ALLOWED
        .iter()
        .map(|brand| {
            products
                .iter()
                .filter(|p| p.brand == *brand)
                .fold(BrandSummary::empty(*brand), |mut acc, p| {
                    acc.add(p);
                    acc
                })
                .finish()
        })
        .collect();
    summaries.sort_by(|a, b| b.sales_year_to_date.total_cmp(&a.sales_year_to_date));
    summaries
}

/// Enriched matrix for one channel plus its aggregates
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DashboardView {
    pub channel: SalesChannel,
    pub time: TimeContext,
    pub kpis: Kpis,
    pub brands: Vec<BrandSummary>,
    pub products: Vec<EnrichedProduct>,
}

/// Recompute the dashboard from the latest snapshots
pub fn derive_view(
    matrix: &[ProductRecord],
    ecommerce: &BTreeMap<String, SalesFigures>,
    transit: &BTreeMap<String, TransitEntry>,
    time: &TimeContext,
    channel: SalesChannel,
) -> DashboardView {
    let products: Vec<EnrichedProduct> = matrix
        .iter()
        .map(|p| enrich_product(p, ecommerce, transit, time, channel))
        .collect();

    let kpis = products.iter().fold(Kpis::default(), |mut acc, p| {
        acc.sales_year_to_date += p.sales.year_to_date;
        acc.sales_prior_year += p.sales.prior_year;
        acc.stock_on_hand += p.stock_on_hand;
        acc.transit_units += u64::from(p.transit_quantity);
        acc
    });

    DashboardView {
        channel,
        time: *time,
        kpis,
        brands: aggregate_brands(&products),
        products,
    }
}

/// Filters for the per-brand product listing
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct BrandQuery {
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub stock_filter: StockFilter,
    #[serde(default)]
    pub hide_zero_sales: bool,
}

/// Per-brand drill-down
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BrandDetail {
    pub brand: Brand,
    pub summary: BrandSummary,
    /// Brand sales over the last three months, oldest first
    pub recent_months: [(Month, f64); 3],
    pub best_sellers: Vec<EnrichedProduct>,
    pub condensers: Vec<EnrichedProduct>,
    pub evaporators: Vec<EnrichedProduct>,
    pub others: Vec<EnrichedProduct>,
}

/// Drill into one brand of a derived view.
///
/// Summary, recent months and best sellers cover the whole brand; the
/// listings honour the query filters. Best sellers are the top five by
/// year-to-date sales, products without sales included when the brand has
/// fewer than five sellers.
pub fn brand_detail(
    view: &DashboardView,
    brand: Brand,
    query: &BrandQuery,
    policy: &StockPolicy,
) -> BrandDetail {
    let brand_products: Vec<&EnrichedProduct> =
        view.products.iter().filter(|p| p.brand == brand).collect();

    let summary = brand_products
        .iter()
        .fold(BrandSummary::empty(brand), |mut acc, p| {
            acc.add(p);
            acc
        })
        .finish();

    let recent_months = view.time.last_3_months.map(|month| {
        (
            month,
            brand_products.iter().map(|p| p.sales.by_month[month]).sum(),
        )
    });

    let mut best_sellers: Vec<EnrichedProduct> = brand_products
        .iter()
        .map(|p| (*p).clone())
        .collect();
    best_sellers.sort_by(|a, b| b.sales.year_to_date.total_cmp(&a.sales.year_to_date));
    best_sellers.truncate(BEST_SELLERS);

    let needle = query
        .search
        .as_deref()
        .map(fold_header)
        .filter(|s| !s.is_empty());

    let mut detail = BrandDetail {
        brand,
        summary,
        recent_months,
        best_sellers,
        condensers: Vec::new(),
        evaporators: Vec::new(),
        others: Vec::new(),
    };

    for product in brand_products {
        if query.hide_zero_sales && product.sales.year_to_date <= 0.0 {
            continue;
        }
        if !policy.matches(query.stock_filter, product.coverage_days) {
            continue;
        }
        if let Some(needle) = &needle {
            if !product.matches_search(needle) {
                continue;
            }
        }
        let bucket = match product.product_type {
            ProductType::Condenser => &mut detail.condensers,
            ProductType::Evaporator => &mut detail.evaporators,
            ProductType::Other => &mut detail.others,
        };
        bucket.push(product.clone());
    }

    detail
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn product(code: &str, description: &str, stock: f64, ytd: f64) -> ProductRecord {
        ProductRecord {
            code: code.to_string(),
            description: description.to_string(),
            brand: Brand::infer(description),
            product_type: ProductType::infer(description),
            factory_reference: String::new(),
            stock_on_hand: stock,
            sales: SalesFigures {
                year_to_date: ytd,
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_time_context_wraps_year() {
        let ctx = TimeContext::from_date(date(2025, 1, 5));
        assert_eq!(ctx.current_month, Month::January);
        assert_eq!(ctx.previous_month, Month::December);
        assert_eq!(ctx.two_months_ago, Month::November);
        assert_eq!(ctx.days_in_previous_month, 31);
        assert_eq!(ctx.days_in_two_months_ago, 30);
        assert_eq!(
            ctx.last_3_months,
            [Month::November, Month::December, Month::January]
        );
    }

    #[test]
    fn test_days_in_month_leap_years() {
        assert_eq!(days_in_month(2024, Month::February), 29);
        assert_eq!(days_in_month(2025, Month::February), 28);
        assert_eq!(days_in_month(2025, Month::December), 31);
    }

    #[test]
    fn test_velocity_window_early_month() {
        let ctx = TimeContext::from_date(date(2025, 3, 5));
        let mut sales = SalesFigures::default();
        sales.by_month[Month::January] = 31.0;
        sales.by_month[Month::February] = 28.0;
        sales.by_month[Month::March] = 100.0;
        assert_eq!(ctx.velocity_window(&sales), (59.0, 59));
    }

    #[test]
    fn test_velocity_window_late_month() {
        let ctx = TimeContext::from_date(date(2025, 3, 20));
        let mut sales = SalesFigures::default();
        sales.by_month[Month::January] = 31.0;
        sales.by_month[Month::February] = 28.0;
        sales.by_month[Month::March] = 12.0;
        assert_eq!(ctx.velocity_window(&sales), (40.0, 48));
    }

    #[test]
    fn test_coverage_days_branches() {
        assert_eq!(coverage_days(0.0, 61, 100.0), NO_SALES_COVERAGE_DAYS);
        assert_eq!(coverage_days(61.0, 61, 100.0), 100);
        assert_eq!(coverage_days(0.0, 61, 0.0), 0);
        assert_eq!(coverage_days(10.0, 0, 25.0), 3);
        assert_eq!(coverage_days(30.0, 60, 0.0), 0);
    }

    #[test]
    fn test_enrich_uses_transit_and_channel() {
        let ctx = TimeContext::from_date(date(2025, 5, 20));
        let mut record = product("A1", "COND LG 12K", 10.0, 40.0);
        record.sales.by_month[Month::May] = 20.0;
        record.sales.by_month[Month::April] = 10.0;

        let mut ecommerce = BTreeMap::new();
        let mut ecom = SalesFigures {
            year_to_date: 50.0,
            ..Default::default()
        };
        ecom.by_month[Month::May] = 5.0;
        ecommerce.insert("A1".to_string(), ecom);

        let mut transit = BTreeMap::new();
        transit.insert(
            "A1".to_string(),
            TransitEntry {
                quantity: 5,
                earliest_date: Some(date(2025, 6, 1)),
            },
        );

        let store = enrich_product(&record, &ecommerce, &transit, &ctx, SalesChannel::Store);
        assert_eq!(store.sales.year_to_date, 0.0);
        assert_eq!(store.current_month_sales, 15.0);
        assert_eq!(store.transit_quantity, 5);
        // window: 15 + 10 over 30 + 20 days => 0.5/day, 15 units available
        assert_eq!(store.coverage_days, 30);

        let ecommerce_view =
            enrich_product(&record, &ecommerce, &transit, &ctx, SalesChannel::Ecommerce);
        assert_eq!(ecommerce_view.current_month_sales, 5.0);

        let missing = enrich_product(&record, &BTreeMap::new(), &transit, &ctx, SalesChannel::Ecommerce);
        assert_eq!(missing.sales, SalesFigures::default());
        assert_eq!(missing.coverage_days, NO_SALES_COVERAGE_DAYS);
    }

    #[test]
    fn test_brand_aggregation_order_and_growth() {
        let ctx = TimeContext::from_date(date(2025, 5, 20));
        let mut gree = product("G1", "EVAP GREE 9K", 1.0, 30.0);
        gree.sales.prior_year = 20.0;
        let matrix = vec![
            product("L1", "COND LG 12K", 2.0, 10.0),
            gree,
            product("X1", "SUPORTE GENERICO", 9.0, 500.0),
        ];

        let view = derive_view(&matrix, &BTreeMap::new(), &BTreeMap::new(), &ctx, SalesChannel::Total);
        assert_eq!(view.brands.len(), 7);
        assert_eq!(view.brands[0].brand, Brand::Gree);
        assert_eq!(view.brands[0].evaporators, 1);
        assert!((view.brands[0].growth - 0.5).abs() < 1e-9);
        assert_eq!(view.brands[1].brand, Brand::Lg);
        assert_eq!(view.brands[1].growth, 0.0);
        assert_eq!(view.kpis.sales_year_to_date, 540.0);
        assert_eq!(view.kpis.stock_on_hand, 12.0);
    }

    #[test]
    fn test_stock_policy_buckets() {
        let policy = StockPolicy::default();
        assert!(policy.matches(StockFilter::Critical, 0));
        assert!(!policy.matches(StockFilter::Critical, 15));
        assert!(policy.matches(StockFilter::Low, 15));
        assert!(policy.matches(StockFilter::Excess, NO_SALES_COVERAGE_DAYS));
        assert!(!policy.matches(StockFilter::Excess, 120));
    }

    #[test]
    fn test_brand_detail_filters() {
        let ctx = TimeContext::from_date(date(2025, 5, 20));
        let matrix = vec![
            product("D1", "COND DAIKIN 18K", 5.0, 12.0),
            product("D2", "EVAP DAIKIN 18K", 5.0, 0.0),
            product("D3", "CONTROLE DAIKIN", 0.0, 3.0),
            product("L1", "COND LG 12K", 5.0, 90.0),
        ];
        let view = derive_view(&matrix, &BTreeMap::new(), &BTreeMap::new(), &ctx, SalesChannel::Total);

        let query = BrandQuery {
            hide_zero_sales: true,
            ..Default::default()
        };
        let detail = brand_detail(&view, Brand::Daikin, &query, &StockPolicy::default());
        assert_eq!(detail.summary.sales_year_to_date, 15.0);
        assert_eq!(detail.condensers.len(), 1);
        assert!(detail.evaporators.is_empty());
        assert_eq!(detail.others.len(), 1);
        assert_eq!(detail.best_sellers[0].code, "D1");
        assert_eq!(detail.best_sellers.len(), 3);
        assert_eq!(detail.best_sellers[2].code, "D2");

        let search = BrandQuery {
            search: Some("evap".to_string()),
            ..Default::default()
        };
        let detail = brand_detail(&view, Brand::Daikin, &search, &StockPolicy::default());
        assert_eq!(detail.evaporators.len(), 1);
        assert!(detail.condensers.is_empty());
    }
}
