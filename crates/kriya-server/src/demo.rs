//! Catalog served to requests that resolve to no tenant.
//!
//! Backed by a demo spreadsheet when one is configured, otherwise by the
//! built-in sample. Sheet contents are cached for the demo TTL; a failed
//! fetch serves the sample without caching it, so the next request retries.

use std::sync::Arc;
use std::time::Duration;

use kriya_core::sample::{sample_categories, sample_products, sample_store_config};
use kriya_core::{CatalogCategory, CatalogProduct, StoreConfig};
use kriya_sheets::{
    parse_categories, parse_products, parse_store_config, CategoryRecord, ProductRecord,
    SheetSource, SheetsError, CATEGORIES_RANGE, CONFIG_RANGE, PRODUCTS_RANGE,
};

use crate::tenant::cache::{Clock, TtlCache};

const CACHE_KEY: &str = "demo";

#[derive(Debug, Clone, PartialEq)]
pub struct DemoCatalog {
    pub config: StoreConfig,
    pub categories: Vec<CatalogCategory>,
    pub products: Vec<CatalogProduct>,
}

impl DemoCatalog {
    #[must_use]
    pub fn builtin() -> Self {
        Self {
            config: sample_store_config(),
            categories: sample_categories(),
            products: sample_products(),
        }
    }
}

pub struct DemoSource {
    sheet: Option<(Arc<dyn SheetSource>, String)>,
    cache: TtlCache<Arc<DemoCatalog>>,
    builtin: Arc<DemoCatalog>,
}

impl DemoSource {
    /// Sample-only source; nothing is ever fetched.
    pub fn builtin(clock: Arc<dyn Clock>) -> Self {
        Self {
            sheet: None,
            cache: TtlCache::new(Duration::ZERO, clock),
            builtin: Arc::new(DemoCatalog::builtin()),
        }
    }

    pub fn from_sheet(
        source: Arc<dyn SheetSource>,
        sheet_id: String,
        ttl: Duration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            sheet: Some((source, sheet_id)),
            cache: TtlCache::new(ttl, clock),
            builtin: Arc::new(DemoCatalog::builtin()),
        }
    }

    pub async fn current(&self) -> Arc<DemoCatalog> {
        let Some((source, sheet_id)) = &self.sheet else {
            return Arc::clone(&self.builtin);
        };
        if let Some(hit) = self.cache.get(CACHE_KEY).await {
            return hit;
        }

        match load_sheet(source.as_ref(), sheet_id).await {
            Ok(catalog) => {
                let catalog = Arc::new(catalog);
                self.cache
                    .insert(CACHE_KEY.to_owned(), Arc::clone(&catalog))
                    .await;
                tracing::info!(
                    products = catalog.products.len(),
                    categories = catalog.categories.len(),
                    "loaded demo catalog from sheet"
                );
                catalog
            }
            Err(e) => {
                tracing::warn!(error = %e, "demo sheet unavailable, serving built-in sample");
                Arc::clone(&self.builtin)
            }
        }
    }

    /// Drops the cached sheet contents and loads them again.
    pub async fn refresh(&self) -> Arc<DemoCatalog> {
        self.cache.clear().await;
        self.current().await
    }
}

async fn load_sheet(source: &dyn SheetSource, sheet_id: &str) -> Result<DemoCatalog, SheetsError> {
    let (product_rows, category_rows, config_rows) = tokio::try_join!(
        source.fetch_range(sheet_id, PRODUCTS_RANGE),
        source.fetch_range(sheet_id, CATEGORIES_RANGE),
        source.fetch_range(sheet_id, CONFIG_RANGE),
    )?;

    Ok(DemoCatalog {
        config: parse_store_config(&config_rows),
        categories: parse_categories(&category_rows)
            .records
            .into_iter()
            .map(category_from_record)
            .collect(),
        products: parse_products(&product_rows)
            .records
            .into_iter()
            .map(product_from_record)
            .collect(),
    })
}

fn category_from_record(record: CategoryRecord) -> CatalogCategory {
    CatalogCategory {
        id: record.external_id,
        name: record.name,
        slug: record.slug,
        description: None,
        image: record.image_url,
    }
}

fn product_from_record(record: ProductRecord) -> CatalogProduct {
    CatalogProduct {
        id: record.external_id,
        name: record.name,
        description: record.description.unwrap_or_default(),
        price: record.price,
        compare_at_price: record.compare_at_price,
        images: record.images,
        category: record.category_slug,
        tags: record.tags,
        in_stock: record.in_stock,
        variants: Vec::new(),
    }
}
