//! Dashboard service: derived views over the stored snapshots

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use shared::export::{build_export, ExportConfig, ExportTable};
use shared::metrics::{
    brand_detail, derive_view, BrandDetail, BrandQuery, BrandSummary, DashboardView,
    EnrichedProduct, Kpis, StockPolicy, TimeContext,
};
use shared::schedule::{delivery_calendar, DeliveryDay};
use shared::{
    Brand, EcommerceSnapshot, MatrixSnapshot, Month, SalesChannel, SourceInfo, TransitSnapshot,
};
use tokio::sync::{broadcast::error::RecvError, RwLock};
use tokio::task::JoinHandle;

use crate::error::{AppError, AppResult};
use crate::store::{
    self, SharedStore, ANALYTICS_COLLECTION, ECOMMERCE_KEY, MATRIX_KEY, TRANSIT_KEY,
};

#[derive(Default)]
struct CachedViews {
    generation: u64,
    date: Option<NaiveDate>,
    views: HashMap<SalesChannel, Arc<DashboardView>>,
}

/// Derived views for a single reference date, one per channel.
///
/// Every invalidation bumps the generation; a view derived from snapshots
/// read under an older generation is never stored.
#[derive(Clone, Default)]
pub struct ViewCache {
    inner: Arc<RwLock<CachedViews>>,
}

impl ViewCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn generation(&self) -> u64 {
        self.inner.read().await.generation
    }

    pub async fn get(&self, date: NaiveDate, channel: SalesChannel) -> Option<Arc<DashboardView>> {
        let cached = self.inner.read().await;
        if cached.date != Some(date) {
            return None;
        }
        cached.views.get(&channel).cloned()
    }

    /// Store a view derived under `generation`. Returns false when the cache
    /// was invalidated in the meantime. A new date replaces the views held
    /// for the previous one.
    pub async fn insert(
        &self,
        generation: u64,
        date: NaiveDate,
        channel: SalesChannel,
        view: Arc<DashboardView>,
    ) -> bool {
        let mut cached = self.inner.write().await;
        if cached.generation != generation {
            return false;
        }
        if cached.date != Some(date) {
            cached.views.clear();
            cached.date = Some(date);
        }
        cached.views.insert(channel, view);
        true
    }

    pub async fn clear(&self) {
        let mut cached = self.inner.write().await;
        cached.generation = cached.generation.wrapping_add(1);
        cached.date = None;
        cached.views.clear();
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.views.len()
    }
}

/// Drop cached views whenever an analytics snapshot changes
pub fn spawn_view_invalidation(store: &SharedStore, cache: ViewCache) -> JoinHandle<()> {
    let mut changes = store.subscribe();
    tokio::spawn(async move {
        loop {
            match changes.recv().await {
                Ok(change) if change.collection == ANALYTICS_COLLECTION => {
                    cache.clear().await;
                    tracing::debug!(key = %change.key, "Dashboard views invalidated");
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    cache.clear().await;
                    tracing::warn!(skipped, "Change feed lagged, dashboard views invalidated");
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}

/// Upload state of one snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotStatus {
    pub updated_at: Option<DateTime<Utc>>,
    pub source: Option<SourceInfo>,
    pub records: usize,
}

/// Dashboard landing data: KPIs and the brand ranking
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardSummary {
    pub channel: SalesChannel,
    pub time: TimeContext,
    pub kpis: Kpis,
    pub brands: Vec<BrandSummary>,
}

/// Last upload of each snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadStatus {
    pub matrix: SnapshotStatus,
    pub ecommerce: SnapshotStatus,
    pub transit: SnapshotStatus,
}

struct Snapshots {
    matrix: MatrixSnapshot,
    ecommerce: EcommerceSnapshot,
    transit: TransitSnapshot,
}

fn status<T>(snapshot: &shared::Snapshot<T>, records: usize) -> SnapshotStatus {
    SnapshotStatus {
        updated_at: snapshot.source.as_ref().map(|_| snapshot.updated_at),
        source: snapshot.source.clone(),
        records,
    }
}

/// Dashboard service
#[derive(Clone)]
pub struct DashboardService {
    store: SharedStore,
    views: ViewCache,
    policy: StockPolicy,
}

impl DashboardService {
    pub fn new(store: SharedStore, views: ViewCache, policy: StockPolicy) -> Self {
        Self {
            store,
            views,
            policy,
        }
    }

    async fn snapshots(&self) -> AppResult<Snapshots> {
        let store = self.store.as_ref();
        Ok(Snapshots {
            matrix: store::load_or_default(store, ANALYTICS_COLLECTION, MATRIX_KEY).await?,
            ecommerce: store::load_or_default(store, ANALYTICS_COLLECTION, ECOMMERCE_KEY).await?,
            transit: store::load_or_default(store, ANALYTICS_COLLECTION, TRANSIT_KEY).await?,
        })
    }

    /// Derived view for a reference date and channel, cached until the
    /// next snapshot change
    pub async fn view(&self, today: NaiveDate, channel: SalesChannel) -> AppResult<Arc<DashboardView>> {
        if let Some(view) = self.views.get(today, channel).await {
            return Ok(view);
        }

        let generation = self.views.generation().await;
        let snapshots = self.snapshots().await?;
        let time = TimeContext::from_date(today);
        let view = Arc::new(derive_view(
            &snapshots.matrix.data,
            &snapshots.ecommerce.data,
            &snapshots.transit.data,
            &time,
            channel,
        ));

        tracing::debug!(
            %today,
            channel = ?channel,
            products = view.products.len(),
            "Dashboard view derived"
        );
        if !self.views.insert(generation, today, channel, view.clone()).await {
            tracing::debug!(%today, channel = ?channel, "Snapshots changed while deriving, view not cached");
        }
        Ok(view)
    }

    pub async fn summary(&self, today: NaiveDate, channel: SalesChannel) -> AppResult<DashboardSummary> {
        let view = self.view(today, channel).await?;
        Ok(DashboardSummary {
            channel: view.channel,
            time: view.time,
            kpis: view.kpis,
            brands: view.brands.clone(),
        })
    }

    pub async fn products(
        &self,
        today: NaiveDate,
        channel: SalesChannel,
        brand: Option<Brand>,
    ) -> AppResult<Vec<EnrichedProduct>> {
        let view = self.view(today, channel).await?;
        Ok(view
            .products
            .iter()
            .filter(|p| brand.map_or(true, |b| p.brand == b))
            .cloned()
            .collect())
    }

    pub async fn brand_detail(
        &self,
        today: NaiveDate,
        channel: SalesChannel,
        brand: Brand,
        query: &BrandQuery,
    ) -> AppResult<BrandDetail> {
        let view = self.view(today, channel).await?;
        Ok(brand_detail(&view, brand, query, &self.policy))
    }

    /// Expected arrivals for a calendar month
    pub async fn calendar(&self, year: i32, month: u32) -> AppResult<Vec<DeliveryDay>> {
        let month = Month::from_number(month).ok_or_else(|| {
            AppError::validation("month", "Month must be between 1 and 12", "O mês deve estar entre 1 e 12")
        })?;
        let snapshots = self.snapshots().await?;
        Ok(delivery_calendar(
            &snapshots.matrix.data,
            &snapshots.transit.data,
            year,
            month,
        ))
    }

    pub async fn export(&self, today: NaiveDate, config: &ExportConfig) -> AppResult<ExportTable> {
        shared::validate_base_filename(&config.base_filename)
            .map_err(|msg| AppError::validation("filename", msg, "Nome de arquivo inválido"))?;

        let snapshots = self.snapshots().await?;
        let table = build_export(
            &snapshots.matrix.data,
            &snapshots.ecommerce.data,
            &snapshots.transit.data,
            &TimeContext::from_date(today),
            config,
        );
        tracing::info!(
            brand = %config.brand,
            channel = ?config.channel,
            rows = table.rows.len(),
            "Export built"
        );
        Ok(table)
    }

    pub async fn upload_status(&self) -> AppResult<UploadStatus> {
        let snapshots = self.snapshots().await?;
        Ok(UploadStatus {
            matrix: status(&snapshots.matrix, snapshots.matrix.data.len()),
            ecommerce: status(&snapshots.ecommerce, snapshots.ecommerce.data.len()),
            transit: status(&snapshots.transit, snapshots.transit.data.len()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    use async_trait::async_trait;
    use serde_json::Value;
    use tokio::sync::broadcast;

    use crate::store::{DocumentChange, DocumentStore, MemoryDocumentStore};
    use shared::{ProductRecord, ProductType, SalesFigures};

    /// Store that replaces the matrix and invalidates the cache while the
    /// first view is still loading its snapshots
    struct ReplaceMatrixDuringLoad {
        inner: MemoryDocumentStore,
        cache: ViewCache,
        replaced: AtomicBool,
    }

    #[async_trait]
    impl DocumentStore for ReplaceMatrixDuringLoad {
        async fn get(&self, collection: &str, key: &str) -> AppResult<Option<Value>> {
            if key == TRANSIT_KEY && !self.replaced.swap(true, Ordering::SeqCst) {
                let matrix = MatrixSnapshot::new(vec![product("NEW1", Brand::Daikin, 5.0)], None);
                store::save(&self.inner, ANALYTICS_COLLECTION, MATRIX_KEY, &matrix).await?;
                self.cache.clear().await;
            }
            self.inner.get(collection, key).await
        }

        async fn put(&self, collection: &str, key: &str, body: Value) -> AppResult<()> {
            self.inner.put(collection, key, body).await
        }

        async fn delete(&self, collection: &str, key: &str) -> AppResult<bool> {
            self.inner.delete(collection, key).await
        }

        async fn list(&self, collection: &str) -> AppResult<Vec<(String, Value)>> {
            self.inner.list(collection).await
        }

        async fn ping(&self) -> AppResult<()> {
            self.inner.ping().await
        }

        fn subscribe(&self) -> broadcast::Receiver<DocumentChange> {
            self.inner.subscribe()
        }
    }

    fn product(code: &str, brand: Brand, ytd: f64) -> ProductRecord {
        ProductRecord {
            code: code.to_string(),
            description: format!("CONDENSADORA {}", brand),
            brand,
            product_type: ProductType::Condenser,
            factory_reference: String::new(),
            stock_on_hand: 10.0,
            sales: SalesFigures {
                year_to_date: ytd,
                ..SalesFigures::default()
            },
        }
    }

    async fn seeded() -> (DashboardService, SharedStore, ViewCache) {
        let store: SharedStore = Arc::new(MemoryDocumentStore::new());
        let matrix = MatrixSnapshot::new(
            vec![
                product("AAA1", Brand::Daikin, 50.0),
                product("BBB2", Brand::Gree, 80.0),
            ],
            None,
        );
        store::save(store.as_ref(), ANALYTICS_COLLECTION, MATRIX_KEY, &matrix)
            .await
            .unwrap();
        let cache = ViewCache::new();
        let service = DashboardService::new(store.clone(), cache.clone(), StockPolicy::default());
        (service, store, cache)
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 20).unwrap()
    }

    #[tokio::test]
    async fn test_summary_ranks_brands() {
        let (service, _, _) = seeded().await;
        let summary = service.summary(today(), SalesChannel::Total).await.unwrap();

        assert_eq!(summary.brands[0].brand, Brand::Gree);
        assert_eq!(summary.kpis.sales_year_to_date, 130.0);
    }

    #[tokio::test]
    async fn test_views_are_cached_per_channel() {
        let (service, _, cache) = seeded().await;
        service.view(today(), SalesChannel::Total).await.unwrap();
        service.view(today(), SalesChannel::Total).await.unwrap();
        service.view(today(), SalesChannel::Store).await.unwrap();

        assert_eq!(cache.len().await, 2);
    }

    #[tokio::test]
    async fn test_snapshot_change_clears_cache() {
        let (service, store, cache) = seeded().await;
        let task = spawn_view_invalidation(&store, cache.clone());
        service.view(today(), SalesChannel::Total).await.unwrap();
        assert_eq!(cache.len().await, 1);

        store
            .put(ANALYTICS_COLLECTION, TRANSIT_KEY, serde_json::json!({"data": {}}))
            .await
            .unwrap();

        for _ in 0..50 {
            if cache.len().await == 0 {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(cache.len().await, 0);
        task.abort();
    }

    #[tokio::test]
    async fn test_view_derived_across_invalidation_is_not_cached() {
        let inner = MemoryDocumentStore::new();
        let old = MatrixSnapshot::new(vec![product("OLD1", Brand::Daikin, 50.0)], None);
        store::save(&inner, ANALYTICS_COLLECTION, MATRIX_KEY, &old).await.unwrap();

        let cache = ViewCache::new();
        let store: SharedStore = Arc::new(ReplaceMatrixDuringLoad {
            inner,
            cache: cache.clone(),
            replaced: AtomicBool::new(false),
        });
        let service = DashboardService::new(store, cache.clone(), StockPolicy::default());

        let first = service.view(today(), SalesChannel::Total).await.unwrap();
        assert_eq!(first.products[0].code, "OLD1");
        assert_eq!(cache.len().await, 0);

        let second = service.view(today(), SalesChannel::Total).await.unwrap();
        assert_eq!(second.products.len(), 1);
        assert_eq!(second.products[0].code, "NEW1");
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_cache_holds_a_single_date() {
        let (service, _, cache) = seeded().await;
        let next_day = today().succ_opt().unwrap();

        service.view(today(), SalesChannel::Total).await.unwrap();
        service.view(today(), SalesChannel::Store).await.unwrap();
        service.view(next_day, SalesChannel::Total).await.unwrap();

        assert_eq!(cache.len().await, 1);
        assert!(cache.get(today(), SalesChannel::Total).await.is_none());
        assert!(cache.get(next_day, SalesChannel::Total).await.is_some());
    }

    #[tokio::test]
    async fn test_insert_after_clear_is_rejected() {
        let (service, _, cache) = seeded().await;
        let view = service.view(today(), SalesChannel::Total).await.unwrap();
        let stale = cache.generation().await;

        cache.clear().await;
        assert!(!cache.insert(stale, today(), SalesChannel::Total, view.clone()).await);
        assert_eq!(cache.len().await, 0);
        assert!(cache.insert(cache.generation().await, today(), SalesChannel::Total, view).await);
    }

    #[tokio::test]
    async fn test_calendar_rejects_bad_month() {
        let (service, _, _) = seeded().await;
        assert!(matches!(
            service.calendar(2025, 13).await,
            Err(AppError::Validation { .. })
        ));
    }

    #[tokio::test]
    async fn test_upload_status_without_uploads() {
        let store: SharedStore = Arc::new(MemoryDocumentStore::new());
        let service = DashboardService::new(store, ViewCache::new(), StockPolicy::default());
        let status = service.upload_status().await.unwrap();

        assert!(status.matrix.updated_at.is_none());
        assert_eq!(status.transit.records, 0);
    }
}
