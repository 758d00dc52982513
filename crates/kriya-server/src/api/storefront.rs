//! Public storefront reads. The tenant comes from `Host` + `x-pathname`;
//! unresolved requests see the demo catalog.

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use kriya_core::{CatalogCategory, CatalogProduct, StoreConfig};
use serde::{Deserialize, Serialize};

use crate::middleware::RequestId;
use crate::tenant::CurrentTenant;

use super::{ok, ApiError, ApiResponse, AppState};

#[derive(Debug, Deserialize)]
pub(super) struct ProductsQuery {
    pub category: Option<String>,
    pub search: Option<String>,
}

#[derive(Debug, Serialize)]
pub(super) struct RefreshData {
    pub products: usize,
    pub categories: usize,
}

/// GET /api/v1/store/products: `search` wins over `category` when both are set.
pub(super) async fn list_products(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    CurrentTenant(tenant): CurrentTenant,
    Query(params): Query<ProductsQuery>,
) -> Json<ApiResponse<Vec<CatalogProduct>>> {
    let tenant = tenant.as_deref();
    let search = params.search.as_deref().map(str::trim).filter(|s| !s.is_empty());
    let category = params
        .category
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());

    let products = match (search, category) {
        (Some(q), _) => state.catalog.search(tenant, q).await,
        (None, Some(slug)) => state.catalog.list_products_by_category(tenant, slug).await,
        (None, None) => state.catalog.list_products(tenant).await,
    };
    ok(req_id.0, products)
}

pub(super) async fn get_product(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    CurrentTenant(tenant): CurrentTenant,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<CatalogProduct>>, ApiError> {
    match state.catalog.get_product(tenant.as_deref(), &id).await {
        Some(product) => Ok(ok(req_id.0, product)),
        None => Err(ApiError::new(
            req_id.0,
            "not_found",
            format!("product '{id}' not found"),
        )),
    }
}

pub(super) async fn list_categories(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    CurrentTenant(tenant): CurrentTenant,
) -> Json<ApiResponse<Vec<CatalogCategory>>> {
    ok(req_id.0, state.catalog.list_categories(tenant.as_deref()).await)
}

pub(super) async fn get_config(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    CurrentTenant(tenant): CurrentTenant,
) -> Json<ApiResponse<StoreConfig>> {
    ok(req_id.0, state.catalog.store_config(tenant.as_deref()).await)
}

/// POST /api/v1/refresh: drops the tenant and demo caches and reloads the
/// demo catalog.
pub(super) async fn refresh(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Json<ApiResponse<RefreshData>> {
    state.tenants.clear().await;
    let demo = state.demo.refresh().await;
    tracing::info!(
        products = demo.products.len(),
        categories = demo.categories.len(),
        "caches refreshed"
    );
    ok(
        req_id.0,
        RefreshData {
            products: demo.products.len(),
            categories: demo.categories.len(),
        },
    )
}
