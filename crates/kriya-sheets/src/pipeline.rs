//! Spreadsheet-to-database catalog import.
//!
//! One run per store:
//!
//! 1. Reclaim stale `running` logs, then open a `running` sync log. The
//!    single-running-log index rejects a concurrent run for the same store.
//! 2. Fetch and parse `Categories`, replace the store's categories.
//! 3. Re-read `slug -> id`, fetch and parse `Products`, replace the store's
//!    products.
//! 4. Stamp `google_sheet_last_sync` and close the log as `completed`.
//!
//! A failure after step 1 closes the log as `failed` and is reported in the
//! returned [`SyncReport`]. Each replace is its own transaction, so a
//! products-phase failure leaves freshly replaced categories next to the
//! previous products.

use std::collections::HashMap;
use std::time::Instant;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use kriya_db::{DbError, NewCategory, NewProduct, StoreRow};
use serde::Serialize;
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use crate::client::SheetsClient;
use crate::error::SheetsError;
use crate::rows::{
    parse_categories, parse_products, CategoryRecord, ProductRecord, CATEGORIES_RANGE,
    PRODUCTS_RANGE,
};

// ---------------------------------------------------------------------------
// Seams
// ---------------------------------------------------------------------------

/// Where sheet rows come from.
#[async_trait]
pub trait SheetSource: Send + Sync {
    async fn fetch_range(&self, sheet_id: &str, range: &str)
        -> Result<Vec<Vec<String>>, SheetsError>;
}

#[async_trait]
impl SheetSource for SheetsClient {
    async fn fetch_range(
        &self,
        sheet_id: &str,
        range: &str,
    ) -> Result<Vec<Vec<String>>, SheetsError> {
        SheetsClient::fetch_range(self, sheet_id, range).await
    }
}

/// Storage operations the importer needs.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn reclaim_stale_runs(&self, store_id: Uuid, stale_after_secs: u64)
        -> Result<u64, DbError>;
    async fn start_run(&self, store_id: Uuid) -> Result<Uuid, DbError>;
    async fn replace_categories(
        &self,
        store_id: Uuid,
        categories: &[NewCategory],
    ) -> Result<usize, DbError>;
    async fn category_slug_map(&self, store_id: Uuid) -> Result<HashMap<String, Uuid>, DbError>;
    async fn replace_products(&self, store_id: Uuid, products: &[NewProduct])
        -> Result<usize, DbError>;
    async fn touch_last_sync(&self, store_id: Uuid) -> Result<(), DbError>;
    async fn complete_run(
        &self,
        log_id: Uuid,
        products: i32,
        categories: i32,
        duration_ms: i64,
    ) -> Result<(), DbError>;
    async fn fail_run(&self, log_id: Uuid, message: &str, duration_ms: i64)
        -> Result<(), DbError>;
    async fn syncable_stores(&self) -> Result<Vec<StoreRow>, DbError>;
}

/// [`CatalogStore`] over the Postgres pool.
#[derive(Debug, Clone)]
pub struct PgCatalogStore {
    pool: PgPool,
}

impl PgCatalogStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CatalogStore for PgCatalogStore {
    async fn reclaim_stale_runs(
        &self,
        store_id: Uuid,
        stale_after_secs: u64,
    ) -> Result<u64, DbError> {
        kriya_db::reclaim_stale_sync_logs(&self.pool, store_id, stale_after_secs).await
    }

    async fn start_run(&self, store_id: Uuid) -> Result<Uuid, DbError> {
        Ok(kriya_db::start_sync_log(&self.pool, store_id).await?.id)
    }

    async fn replace_categories(
        &self,
        store_id: Uuid,
        categories: &[NewCategory],
    ) -> Result<usize, DbError> {
        kriya_db::replace_categories(&self.pool, store_id, categories).await
    }

    async fn category_slug_map(&self, store_id: Uuid) -> Result<HashMap<String, Uuid>, DbError> {
        kriya_db::category_slug_map(&self.pool, store_id).await
    }

    async fn replace_products(
        &self,
        store_id: Uuid,
        products: &[NewProduct],
    ) -> Result<usize, DbError> {
        kriya_db::replace_products(&self.pool, store_id, products).await
    }

    async fn touch_last_sync(&self, store_id: Uuid) -> Result<(), DbError> {
        kriya_db::touch_last_sync(&self.pool, store_id).await
    }

    async fn complete_run(
        &self,
        log_id: Uuid,
        products: i32,
        categories: i32,
        duration_ms: i64,
    ) -> Result<(), DbError> {
        kriya_db::complete_sync_log(&self.pool, log_id, products, categories, duration_ms).await
    }

    async fn fail_run(&self, log_id: Uuid, message: &str, duration_ms: i64) -> Result<(), DbError> {
        kriya_db::fail_sync_log(&self.pool, log_id, message, duration_ms).await
    }

    async fn syncable_stores(&self) -> Result<Vec<StoreRow>, DbError> {
        kriya_db::list_syncable_stores(&self.pool).await
    }
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub success: bool,
    pub products_count: usize,
    pub categories_count: usize,
    pub skipped_rows: usize,
    pub malformed_rows: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sync_log_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct BulkSyncSummary {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
}

/// Errors that stop a run before it starts writing.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("store has no Google Sheet configured")]
    NoSheetConfigured,

    #[error("catalog import is not configured (missing Sheets API key)")]
    ImporterUnavailable,

    #[error("a sync is already running for this store")]
    AlreadyRunning,

    #[error(transparent)]
    Fetch(#[from] SheetsError),

    #[error(transparent)]
    Db(DbError),
}

impl From<DbError> for SyncError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::SyncAlreadyRunning { .. } => SyncError::AlreadyRunning,
            other => SyncError::Db(other),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SyncOptions {
    /// A `running` log older than this is treated as abandoned.
    pub stale_after_secs: u64,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            stale_after_secs: 900,
        }
    }
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

struct RunCounts {
    categories: usize,
    products: usize,
    skipped: usize,
    malformed: usize,
}

/// Imports the store's spreadsheet into its catalog.
///
/// # Errors
///
/// - [`SyncError::NoSheetConfigured`] if the store has no sheet id.
/// - [`SyncError::ImporterUnavailable`] if `source` is `None`.
/// - [`SyncError::AlreadyRunning`] if another run holds the store.
/// - [`SyncError::Db`] if the sync log cannot be opened.
///
/// Failures after the log is open are recorded on the log and returned as a
/// report with `success == false`.
pub async fn sync_store<S, C>(
    source: Option<&S>,
    catalog: &C,
    store: &StoreRow,
    options: SyncOptions,
) -> Result<SyncReport, SyncError>
where
    S: SheetSource + ?Sized,
    C: CatalogStore + ?Sized,
{
    if !store.has_sheet() {
        return Err(SyncError::NoSheetConfigured);
    }
    let sheet_id = store.google_sheet_id.as_deref().unwrap_or_default().trim();
    let source = source.ok_or(SyncError::ImporterUnavailable)?;

    let reclaimed = catalog
        .reclaim_stale_runs(store.id, options.stale_after_secs)
        .await?;
    if reclaimed > 0 {
        tracing::warn!(store = %store.slug, reclaimed, "reclaimed abandoned sync runs");
    }

    let log_id = catalog.start_run(store.id).await?;
    let started = Instant::now();
    tracing::info!(store = %store.slug, sync_log_id = %log_id, "catalog sync started");

    let outcome = run_import(source, catalog, store, sheet_id).await;
    let duration_ms = i64::try_from(started.elapsed().as_millis()).unwrap_or(i64::MAX);

    // A log that cannot be completed is failed instead, so it never stays `running`.
    let outcome = match outcome {
        Ok(counts) => catalog
            .complete_run(
                log_id,
                saturating_i32(counts.products),
                saturating_i32(counts.categories),
                duration_ms,
            )
            .await
            .map(|()| counts)
            .map_err(|e| format!("failed to complete sync log: {e}")),
        Err(message) => Err(message),
    };

    match outcome {
        Ok(counts) => {
            tracing::info!(
                store = %store.slug,
                sync_log_id = %log_id,
                products = counts.products,
                categories = counts.categories,
                skipped = counts.skipped,
                malformed = counts.malformed,
                duration_ms,
                "catalog sync completed"
            );
            Ok(SyncReport {
                success: true,
                products_count: counts.products,
                categories_count: counts.categories,
                skipped_rows: counts.skipped,
                malformed_rows: counts.malformed,
                sync_log_id: Some(log_id),
                error: None,
            })
        }
        Err(message) => {
            tracing::error!(
                store = %store.slug,
                sync_log_id = %log_id,
                error = %message,
                duration_ms,
                "catalog sync failed"
            );
            if let Err(e) = catalog.fail_run(log_id, &message, duration_ms).await {
                tracing::error!(sync_log_id = %log_id, error = %e, "could not mark sync log failed");
            }
            Ok(SyncReport {
                success: false,
                products_count: 0,
                categories_count: 0,
                skipped_rows: 0,
                malformed_rows: 0,
                sync_log_id: Some(log_id),
                error: Some(message),
            })
        }
    }
}

async fn run_import<S, C>(
    source: &S,
    catalog: &C,
    store: &StoreRow,
    sheet_id: &str,
) -> Result<RunCounts, String>
where
    S: SheetSource + ?Sized,
    C: CatalogStore + ?Sized,
{
    let category_rows = source
        .fetch_range(sheet_id, CATEGORIES_RANGE)
        .await
        .map_err(|e| format!("failed to fetch categories: {e}"))?;
    let categories = parse_categories(&category_rows);
    log_dropped_rows(&store.slug, "Categories", &categories.skipped, &categories.malformed);

    let new_categories = to_new_categories(&categories.records);
    let categories_count = catalog
        .replace_categories(store.id, &new_categories)
        .await
        .map_err(|e| format!("failed to replace categories: {e}"))?;

    let slug_to_id = catalog
        .category_slug_map(store.id)
        .await
        .map_err(|e| format!("failed to read category ids: {e}"))?;

    let product_rows = source
        .fetch_range(sheet_id, PRODUCTS_RANGE)
        .await
        .map_err(|e| format!("failed to fetch products: {e}"))?;
    let products = parse_products(&product_rows);
    log_dropped_rows(&store.slug, "Products", &products.skipped, &products.malformed);

    let new_products = to_new_products(&products.records, &slug_to_id);
    let products_count = catalog
        .replace_products(store.id, &new_products)
        .await
        .map_err(|e| format!("failed to replace products: {e}"))?;

    catalog
        .touch_last_sync(store.id)
        .await
        .map_err(|e| format!("failed to stamp last sync: {e}"))?;

    Ok(RunCounts {
        categories: categories_count,
        products: products_count,
        skipped: categories.skipped.len() + products.skipped.len(),
        malformed: categories.malformed.len() + products.malformed.len(),
    })
}

fn log_dropped_rows(
    store: &str,
    tab: &str,
    skipped: &[(usize, String)],
    malformed: &[(usize, String)],
) {
    for (row, reason) in skipped {
        tracing::debug!(store, tab, row, reason = %reason, "sheet row skipped");
    }
    for (row, reason) in malformed {
        tracing::warn!(store, tab, row, reason = %reason, "sheet row malformed");
    }
}

fn to_new_categories(records: &[CategoryRecord]) -> Vec<NewCategory> {
    records
        .iter()
        .enumerate()
        .map(|(idx, c)| NewCategory {
            name: c.name.clone(),
            slug: c.slug.clone(),
            description: None,
            image_url: c.image_url.clone(),
            sort_order: saturating_i32(idx),
            is_active: true,
        })
        .collect()
}

fn to_new_products(records: &[ProductRecord], slug_to_id: &HashMap<String, Uuid>) -> Vec<NewProduct> {
    records
        .iter()
        .enumerate()
        .map(|(idx, p)| NewProduct {
            external_id: Some(p.external_id.clone()),
            name: p.name.clone(),
            slug: p.slug.clone(),
            description: p.description.clone(),
            price: p.price,
            compare_at_price: p.compare_at_price,
            images: p.images.clone(),
            category_id: slug_to_id.get(&p.category_slug).copied(),
            tags: p.tags.clone(),
            in_stock: p.in_stock,
            stock_quantity: None,
            variants: None,
            is_active: true,
            sort_order: saturating_i32(idx),
        })
        .collect()
}

fn saturating_i32(n: usize) -> i32 {
    i32::try_from(n).unwrap_or(i32::MAX)
}

/// Syncs every active store that has a sheet, at most `max_concurrent` at a
/// time. Per-store failures are counted, not propagated.
///
/// # Errors
///
/// Returns [`SyncError::Db`] if the store list cannot be read.
pub async fn sync_all_stores<S, C>(
    source: Option<&S>,
    catalog: &C,
    options: SyncOptions,
    max_concurrent: usize,
) -> Result<BulkSyncSummary, SyncError>
where
    S: SheetSource + ?Sized,
    C: CatalogStore + ?Sized,
{
    let stores = catalog.syncable_stores().await?;
    let total = stores.len();
    tracing::info!(total, max_concurrent, "bulk catalog sync started");

    let results: Vec<bool> = stream::iter(stores.iter())
        .map(|store| async move {
            match sync_store(source, catalog, store, options).await {
                Ok(report) => report.success,
                Err(e) => {
                    tracing::warn!(store = %store.slug, error = %e, "store sync not started");
                    false
                }
            }
        })
        .buffer_unordered(max_concurrent.max(1))
        .collect()
        .await;

    let successful = results.iter().filter(|ok| **ok).count();
    let summary = BulkSyncSummary {
        total,
        successful,
        failed: total - successful,
    };
    tracing::info!(
        total = summary.total,
        successful = summary.successful,
        failed = summary.failed,
        "bulk catalog sync finished"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use chrono::Utc;
    use rust_decimal::Decimal;

    use super::*;

    fn cells(row: &[&str]) -> Vec<String> {
        row.iter().map(|c| (*c).to_owned()).collect()
    }

    #[derive(Default)]
    struct FakeSheet {
        categories: Vec<Vec<String>>,
        products: Vec<Vec<String>>,
        fail_products: bool,
    }

    #[async_trait]
    impl SheetSource for FakeSheet {
        async fn fetch_range(
            &self,
            _sheet_id: &str,
            range: &str,
        ) -> Result<Vec<Vec<String>>, SheetsError> {
            match range {
                CATEGORIES_RANGE => Ok(self.categories.clone()),
                PRODUCTS_RANGE if self.fail_products => Err(SheetsError::UnexpectedStatus {
                    status: 403,
                    body: "forbidden".to_owned(),
                }),
                PRODUCTS_RANGE => Ok(self.products.clone()),
                other => panic!("unexpected range {other}"),
            }
        }
    }

    #[derive(Debug, Clone, PartialEq)]
    struct LogEntry {
        id: Uuid,
        status: &'static str,
        counts: Option<(i32, i32)>,
        error: Option<String>,
    }

    #[derive(Default)]
    struct State {
        categories: Vec<(Uuid, NewCategory)>,
        products: Vec<NewProduct>,
        logs: Vec<LogEntry>,
        touched: u32,
        stores: Vec<StoreRow>,
    }

    #[derive(Default)]
    struct FakeCatalog {
        state: Mutex<State>,
        fail_complete: bool,
    }

    impl FakeCatalog {
        fn writes(&self) -> usize {
            let s = self.state.lock().unwrap();
            s.categories.len() + s.products.len() + s.logs.len() + s.touched as usize
        }
    }

    #[async_trait]
    impl CatalogStore for FakeCatalog {
        async fn reclaim_stale_runs(&self, _: Uuid, _: u64) -> Result<u64, DbError> {
            Ok(0)
        }

        async fn start_run(&self, store_id: Uuid) -> Result<Uuid, DbError> {
            let mut s = self.state.lock().unwrap();
            if s.logs.iter().any(|l| l.status == "running") {
                return Err(DbError::SyncAlreadyRunning { store_id });
            }
            let id = Uuid::new_v4();
            s.logs.push(LogEntry {
                id,
                status: "running",
                counts: None,
                error: None,
            });
            Ok(id)
        }

        async fn replace_categories(
            &self,
            _: Uuid,
            categories: &[NewCategory],
        ) -> Result<usize, DbError> {
            let mut s = self.state.lock().unwrap();
            s.categories = categories
                .iter()
                .map(|c| (Uuid::new_v4(), c.clone()))
                .collect();
            Ok(categories.len())
        }

        async fn category_slug_map(&self, _: Uuid) -> Result<HashMap<String, Uuid>, DbError> {
            let s = self.state.lock().unwrap();
            Ok(s.categories
                .iter()
                .map(|(id, c)| (c.slug.clone(), *id))
                .collect())
        }

        async fn replace_products(
            &self,
            _: Uuid,
            products: &[NewProduct],
        ) -> Result<usize, DbError> {
            self.state.lock().unwrap().products = products.to_vec();
            Ok(products.len())
        }

        async fn touch_last_sync(&self, _: Uuid) -> Result<(), DbError> {
            self.state.lock().unwrap().touched += 1;
            Ok(())
        }

        async fn complete_run(
            &self,
            log_id: Uuid,
            products: i32,
            categories: i32,
            _: i64,
        ) -> Result<(), DbError> {
            if self.fail_complete {
                return Err(DbError::NotFound);
            }
            let mut s = self.state.lock().unwrap();
            let log = s.logs.iter_mut().find(|l| l.id == log_id).unwrap();
            log.status = "completed";
            log.counts = Some((products, categories));
            Ok(())
        }

        async fn fail_run(&self, log_id: Uuid, message: &str, _: i64) -> Result<(), DbError> {
            let mut s = self.state.lock().unwrap();
            let log = s.logs.iter_mut().find(|l| l.id == log_id).unwrap();
            log.status = "failed";
            log.error = Some(message.to_owned());
            Ok(())
        }

        async fn syncable_stores(&self) -> Result<Vec<StoreRow>, DbError> {
            Ok(self.state.lock().unwrap().stores.clone())
        }
    }

    fn store(slug: &str, sheet: Option<&str>) -> StoreRow {
        let now = Utc::now();
        StoreRow {
            id: Uuid::new_v4(),
            owner_id: Uuid::new_v4(),
            name: slug.to_owned(),
            slug: slug.to_owned(),
            custom_domain: None,
            tagline: None,
            logo_url: None,
            theme: "neon".to_owned(),
            currency: "USD".to_owned(),
            currency_symbol: "$".to_owned(),
            announcement: None,
            instagram_url: None,
            twitter_url: None,
            tiktok_url: None,
            google_sheet_id: sheet.map(str::to_owned),
            google_sheet_last_sync: None,
            is_active: true,
            plan: "free".to_owned(),
            settings: serde_json::json!({}),
            created_at: now,
            updated_at: now,
        }
    }

    fn acme_sheet() -> FakeSheet {
        FakeSheet {
            categories: vec![cells(&["C1", "Apparel", "apparel"])],
            products: vec![cells(&[
                "P1",
                "Tee",
                "Soft",
                "$25.00",
                "",
                "https://img/1.png",
                "apparel",
                "new,summer",
                "TRUE",
            ])],
            fail_products: false,
        }
    }

    #[tokio::test]
    async fn imports_categories_and_products() {
        let sheet = acme_sheet();
        let catalog = FakeCatalog::default();
        let acme = store("acme", Some("sheet-1"));

        let report = sync_store(Some(&sheet), &catalog, &acme, SyncOptions::default())
            .await
            .unwrap();

        assert!(report.success);
        assert_eq!(report.categories_count, 1);
        assert_eq!(report.products_count, 1);

        let s = catalog.state.lock().unwrap();
        let (apparel_id, _) = &s.categories[0];
        let tee = &s.products[0];
        assert_eq!(tee.external_id.as_deref(), Some("P1"));
        assert_eq!(tee.slug, "tee");
        assert_eq!(tee.price, Decimal::new(2500, 2));
        assert_eq!(tee.category_id, Some(*apparel_id));
        assert_eq!(tee.tags, vec!["new", "summer"]);
        assert_eq!(s.touched, 1);
        assert_eq!(s.logs.len(), 1);
        assert_eq!(s.logs[0].status, "completed");
        assert_eq!(s.logs[0].counts, Some((1, 1)));
    }

    #[tokio::test]
    async fn resync_replaces_instead_of_duplicating() {
        let sheet = acme_sheet();
        let catalog = FakeCatalog::default();
        let acme = store("acme", Some("sheet-1"));

        for _ in 0..2 {
            let report = sync_store(Some(&sheet), &catalog, &acme, SyncOptions::default())
                .await
                .unwrap();
            assert!(report.success);
        }

        let s = catalog.state.lock().unwrap();
        assert_eq!(s.categories.len(), 1);
        assert_eq!(s.products.len(), 1);
        assert_eq!(s.logs.len(), 2);
        assert!(s.logs.iter().all(|l| l.status == "completed"));
    }

    #[tokio::test]
    async fn drops_bad_rows_and_uncategorizes_unknown_slugs() {
        let sheet = FakeSheet {
            categories: vec![cells(&["C1", "Apparel", "apparel"])],
            products: vec![
                cells(&["P1", "", "", "10"]),
                cells(&["P2", "Mug", "", "0"]),
                cells(&["P3", "Poster", "", "12", "", "", "prints"]),
            ],
            fail_products: false,
        };
        let catalog = FakeCatalog::default();
        let acme = store("acme", Some("sheet-1"));

        let report = sync_store(Some(&sheet), &catalog, &acme, SyncOptions::default())
            .await
            .unwrap();

        assert!(report.success);
        assert_eq!(report.skipped_rows, 1, "missing name");
        assert_eq!(report.products_count, 2);

        let s = catalog.state.lock().unwrap();
        let mug = s.products.iter().find(|p| p.name == "Mug").unwrap();
        assert!(mug.price.is_zero());
        let poster = s.products.iter().find(|p| p.name == "Poster").unwrap();
        assert_eq!(poster.category_id, None);
    }

    #[tokio::test]
    async fn store_without_sheet_is_rejected_without_writes() {
        let sheet = acme_sheet();
        let catalog = FakeCatalog::default();
        let bare = store("bare", Some("  "));

        let err = sync_store(Some(&sheet), &catalog, &bare, SyncOptions::default())
            .await
            .unwrap_err();

        assert!(matches!(err, SyncError::NoSheetConfigured));
        assert_eq!(catalog.writes(), 0);
    }

    #[tokio::test]
    async fn missing_importer_is_reported() {
        let catalog = FakeCatalog::default();
        let acme = store("acme", Some("sheet-1"));

        let err = sync_store::<FakeSheet, _>(None, &catalog, &acme, SyncOptions::default())
            .await
            .unwrap_err();

        assert!(matches!(err, SyncError::ImporterUnavailable));
        assert_eq!(catalog.writes(), 0);
    }

    #[tokio::test]
    async fn concurrent_run_is_rejected() {
        let sheet = acme_sheet();
        let catalog = FakeCatalog::default();
        let acme = store("acme", Some("sheet-1"));
        catalog.start_run(acme.id).await.unwrap();

        let err = sync_store(Some(&sheet), &catalog, &acme, SyncOptions::default())
            .await
            .unwrap_err();

        assert!(matches!(err, SyncError::AlreadyRunning));
        let s = catalog.state.lock().unwrap();
        assert!(s.categories.is_empty());
        assert!(s.products.is_empty());
    }

    #[tokio::test]
    async fn product_fetch_failure_marks_log_failed() {
        let sheet = FakeSheet {
            fail_products: true,
            ..acme_sheet()
        };
        let catalog = FakeCatalog::default();
        let acme = store("acme", Some("sheet-1"));

        let report = sync_store(Some(&sheet), &catalog, &acme, SyncOptions::default())
            .await
            .unwrap();

        assert!(!report.success);
        let message = report.error.unwrap();
        assert!(message.contains("products"), "{message}");

        let s = catalog.state.lock().unwrap();
        assert_eq!(s.logs[0].status, "failed");
        assert_eq!(s.categories.len(), 1, "categories phase already committed");
        assert_eq!(s.touched, 0);
    }

    #[tokio::test]
    async fn completion_failure_leaves_log_failed_not_running() {
        let sheet = acme_sheet();
        let catalog = FakeCatalog {
            fail_complete: true,
            ..FakeCatalog::default()
        };
        let acme = store("acme", Some("sheet-1"));

        let report = sync_store(Some(&sheet), &catalog, &acme, SyncOptions::default())
            .await
            .unwrap();

        assert!(!report.success);
        let message = report.error.unwrap();
        assert!(message.contains("complete sync log"), "{message}");

        let s = catalog.state.lock().unwrap();
        assert_eq!(s.logs.len(), 1);
        assert_eq!(s.logs[0].status, "failed");
    }

    #[tokio::test]
    async fn sync_all_counts_outcomes() {
        let sheet = acme_sheet();
        let catalog = FakeCatalog::default();
        catalog.state.lock().unwrap().stores = vec![
            store("acme", Some("sheet-1")),
            store("bare", None),
        ];

        let summary = sync_all_stores(Some(&sheet), &catalog, SyncOptions::default(), 1)
            .await
            .unwrap();

        assert_eq!(
            summary,
            BulkSyncSummary {
                total: 2,
                successful: 1,
                failed: 1,
            }
        );
    }
}
