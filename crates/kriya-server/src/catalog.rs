//! Storefront reads for the resolved tenant.
//!
//! Requests without a tenant, and every request when no database is
//! configured, are answered from the demo catalog. Database failures degrade
//! to empty results and are logged; the storefront never sees a 5xx from here.

use std::sync::Arc;

use kriya_core::catalog::UNCATEGORIZED;
use kriya_core::{CatalogCategory, CatalogProduct, ProductVariant, SocialLinks, StoreConfig};
use kriya_db::{CategoryRow, DbError, ProductWithCategoryRow, StoreRow};
use sqlx::PgPool;
use uuid::Uuid;

use crate::demo::DemoSource;

/// Backing store, chosen once at startup from `DATABASE_URL`.
#[derive(Debug, Clone)]
pub enum DataSource {
    Configured(PgPool),
    Demo,
}

impl DataSource {
    #[must_use]
    pub fn pool(&self) -> Option<&PgPool> {
        match self {
            DataSource::Configured(pool) => Some(pool),
            DataSource::Demo => None,
        }
    }
}

#[derive(Clone)]
pub struct CatalogService {
    source: DataSource,
    demo: Arc<DemoSource>,
}

impl CatalogService {
    pub fn new(source: DataSource, demo: Arc<DemoSource>) -> Self {
        Self { source, demo }
    }

    /// The pool to read `tenant` from, or `None` when demo data applies.
    fn tenant_pool<'a>(&'a self, tenant: Option<&StoreRow>) -> Option<(&'a PgPool, Uuid)> {
        Some((self.source.pool()?, tenant?.id))
    }

    pub async fn store_config(&self, tenant: Option<&StoreRow>) -> StoreConfig {
        match tenant {
            Some(store) if self.source.pool().is_some() => store_config_from_row(store),
            _ => self.demo.current().await.config.clone(),
        }
    }

    pub async fn list_products(&self, tenant: Option<&StoreRow>) -> Vec<CatalogProduct> {
        let Some((pool, store_id)) = self.tenant_pool(tenant) else {
            return self.demo.current().await.products.clone();
        };
        products_or_empty(
            kriya_db::list_active_products(pool, store_id).await,
            "list products",
        )
    }

    pub async fn list_products_by_category(
        &self,
        tenant: Option<&StoreRow>,
        category_slug: &str,
    ) -> Vec<CatalogProduct> {
        let Some((pool, store_id)) = self.tenant_pool(tenant) else {
            let demo = self.demo.current().await;
            return demo
                .products
                .iter()
                .filter(|p| p.category == category_slug)
                .cloned()
                .collect();
        };
        products_or_empty(
            kriya_db::list_active_products_by_category(pool, store_id, category_slug).await,
            "list products by category",
        )
    }

    pub async fn search(&self, tenant: Option<&StoreRow>, query: &str) -> Vec<CatalogProduct> {
        let Some((pool, store_id)) = self.tenant_pool(tenant) else {
            let demo = self.demo.current().await;
            return demo
                .products
                .iter()
                .filter(|p| p.matches_query(query))
                .cloned()
                .collect();
        };
        products_or_empty(
            kriya_db::search_active_products(pool, store_id, query).await,
            "search products",
        )
    }

    pub async fn get_product(&self, tenant: Option<&StoreRow>, id: &str) -> Option<CatalogProduct> {
        let Some((pool, store_id)) = self.tenant_pool(tenant) else {
            let demo = self.demo.current().await;
            return demo.products.iter().find(|p| p.id == id).cloned();
        };
        let product_id = Uuid::parse_str(id).ok()?;
        match kriya_db::get_active_product(pool, store_id, product_id).await {
            Ok(row) => row.map(product_from_row),
            Err(e) => {
                tracing::error!(store_id = %store_id, product_id = %product_id, error = %e, "get product failed");
                None
            }
        }
    }

    pub async fn list_categories(&self, tenant: Option<&StoreRow>) -> Vec<CatalogCategory> {
        let Some((pool, store_id)) = self.tenant_pool(tenant) else {
            return self.demo.current().await.categories.clone();
        };
        match kriya_db::list_active_categories(pool, store_id).await {
            Ok(rows) => rows.into_iter().map(category_from_row).collect(),
            Err(e) => {
                tracing::error!(store_id = %store_id, error = %e, "list categories failed");
                Vec::new()
            }
        }
    }
}

fn products_or_empty(
    result: Result<Vec<ProductWithCategoryRow>, DbError>,
    operation: &'static str,
) -> Vec<CatalogProduct> {
    match result {
        Ok(rows) => rows.into_iter().map(product_from_row).collect(),
        Err(e) => {
            tracing::error!(operation, error = %e, "catalog read failed");
            Vec::new()
        }
    }
}

pub(crate) fn product_from_row(row: ProductWithCategoryRow) -> CatalogProduct {
    let p = row.product;
    let variants = p
        .variants
        .and_then(|v| serde_json::from_value::<Vec<ProductVariant>>(v).ok())
        .unwrap_or_default();
    CatalogProduct {
        id: p.id.to_string(),
        name: p.name,
        description: p.description.unwrap_or_default(),
        price: p.price,
        compare_at_price: p.compare_at_price,
        images: p.images,
        category: row
            .category_slug
            .unwrap_or_else(|| UNCATEGORIZED.to_owned()),
        tags: p.tags,
        in_stock: p.in_stock,
        variants,
    }
}

fn category_from_row(row: CategoryRow) -> CatalogCategory {
    CatalogCategory {
        id: row.id.to_string(),
        name: row.name,
        slug: row.slug,
        description: row.description,
        image: row.image_url,
    }
}

fn store_config_from_row(store: &StoreRow) -> StoreConfig {
    StoreConfig {
        name: store.name.clone(),
        tagline: store.tagline.clone().unwrap_or_default(),
        theme: store.theme.parse().unwrap_or_default(),
        logo: store.logo_url.clone(),
        currency: store.currency.clone(),
        currency_symbol: store.currency_symbol.clone(),
        announcement: store.announcement.clone(),
        social_links: SocialLinks {
            instagram: store.instagram_url.clone(),
            twitter: store.twitter_url.clone(),
            tiktok: store.tiktok_url.clone(),
        },
    }
}
