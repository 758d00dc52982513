//! Owner dashboard: manual category and product edits, order status.
//!
//! Every handler first proves the caller owns the store; the storage calls
//! are then scoped by `store_id`.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use kriya_core::{slugify, OrderStatus};
use kriya_db::{
    CategoryRow, DbError, NewCategory, NewProduct, OrderRow, ProductPatch, ProductRow,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::middleware::{OwnerId, RequestId};

use super::{map_db_error, ok, require_pool, ApiError, ApiResponse, AppState};

// ---------------------------------------------------------------------------
// Request / response bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub(super) struct CreateCategoryRequest {
    pub name: String,
    pub slug: Option<String>,
    pub description: Option<String>,
    #[serde(alias = "imageUrl")]
    pub image_url: Option<String>,
    #[serde(default, alias = "sortOrder")]
    pub sort_order: i32,
}

#[derive(Debug, Deserialize)]
pub(super) struct CreateProductRequest {
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    #[serde(alias = "compareAtPrice")]
    pub compare_at_price: Option<Decimal>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(alias = "categoryId")]
    pub category_id: Option<Uuid>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default = "default_true", alias = "inStock")]
    pub in_stock: bool,
    #[serde(alias = "stockQuantity")]
    pub stock_quantity: Option<i32>,
    pub variants: Option<serde_json::Value>,
    #[serde(default, alias = "sortOrder")]
    pub sort_order: i32,
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct UpdateProductRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    #[serde(alias = "compareAtPrice")]
    pub compare_at_price: Option<Decimal>,
    pub images: Option<Vec<String>>,
    #[serde(alias = "categoryId")]
    pub category_id: Option<Uuid>,
    pub tags: Option<Vec<String>>,
    #[serde(alias = "inStock")]
    pub in_stock: Option<bool>,
    #[serde(alias = "stockQuantity")]
    pub stock_quantity: Option<i32>,
    #[serde(alias = "isActive")]
    pub is_active: Option<bool>,
    #[serde(alias = "sortOrder")]
    pub sort_order: Option<i32>,
    #[serde(default, alias = "clearDescription")]
    pub clear_description: bool,
    #[serde(default, alias = "clearCompareAtPrice")]
    pub clear_compare_at_price: bool,
    #[serde(default, alias = "clearCategory")]
    pub clear_category: bool,
}

#[derive(Debug, Deserialize)]
pub(super) struct OrdersQuery {
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct UpdateOrderRequest {
    pub status: String,
}

/// Dashboard product view: the stored row plus its category slug.
#[derive(Debug, Serialize)]
pub(super) struct DashboardProduct {
    #[serde(flatten)]
    pub product: ProductRow,
    pub category_slug: Option<String>,
}

fn default_true() -> bool {
    true
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn owned_pool<'a>(
    state: &'a AppState,
    req_id: &str,
    store_id: Uuid,
    owner: OwnerId,
) -> Result<&'a PgPool, ApiError> {
    let pool = require_pool(state, req_id)?;
    kriya_db::get_store_for_owner(pool, store_id, owner.0)
        .await
        .map_err(|e| map_db_error(req_id.to_owned(), &e))?;
    Ok(pool)
}

fn validate_price(req_id: &str, field: &str, price: Decimal) -> Result<(), ApiError> {
    if price.is_sign_negative() && !price.is_zero() {
        return Err(ApiError::new(
            req_id,
            "validation_error",
            format!("{field} must be zero or greater"),
        ));
    }
    Ok(())
}

/// A product may only point at a category of its own store.
async fn ensure_category_in_store(
    pool: &PgPool,
    req_id: &str,
    store_id: Uuid,
    category_id: Option<Uuid>,
) -> Result<(), ApiError> {
    let Some(category_id) = category_id else {
        return Ok(());
    };
    let found = kriya_db::category_in_store(pool, store_id, category_id)
        .await
        .map_err(|e| map_db_error(req_id.to_owned(), &e))?;
    if !found {
        return Err(ApiError::new(
            req_id,
            "validation_error",
            "category does not belong to this store",
        ));
    }
    Ok(())
}

fn clean_tags(tags: Vec<String>) -> Vec<String> {
    tags.into_iter()
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect()
}

// ---------------------------------------------------------------------------
// Categories
// ---------------------------------------------------------------------------

pub(super) async fn list_categories(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(owner): Extension<OwnerId>,
    Path(store_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<CategoryRow>>>, ApiError> {
    let rid = &req_id.0;
    let pool = owned_pool(&state, rid, store_id, owner).await?;
    let rows = kriya_db::list_store_categories(pool, store_id)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;
    Ok(ok(req_id.0, rows))
}

pub(super) async fn create_category(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(owner): Extension<OwnerId>,
    Path(store_id): Path<Uuid>,
    Json(body): Json<CreateCategoryRequest>,
) -> Result<(StatusCode, Json<ApiResponse<CategoryRow>>), ApiError> {
    let rid = &req_id.0;
    let name = body.name.trim();
    let slug = slugify(body.slug.as_deref().unwrap_or(name));
    if name.is_empty() || slug.is_empty() {
        return Err(ApiError::new(
            rid,
            "validation_error",
            "category needs a name that yields a slug",
        ));
    }

    let pool = owned_pool(&state, rid, store_id, owner).await?;
    let new = NewCategory {
        name: name.to_owned(),
        slug,
        description: body.description,
        image_url: body.image_url,
        sort_order: body.sort_order,
        is_active: true,
    };
    let row = kriya_db::create_category(pool, store_id, &new)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;
    Ok((StatusCode::CREATED, ok(req_id.0, row)))
}

pub(super) async fn delete_category(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(owner): Extension<OwnerId>,
    Path((store_id, category_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, ApiError> {
    let rid = &req_id.0;
    let pool = owned_pool(&state, rid, store_id, owner).await?;
    kriya_db::delete_category(pool, store_id, category_id)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Products
// ---------------------------------------------------------------------------

pub(super) async fn list_products(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(owner): Extension<OwnerId>,
    Path(store_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<DashboardProduct>>>, ApiError> {
    let rid = &req_id.0;
    let pool = owned_pool(&state, rid, store_id, owner).await?;
    let rows = kriya_db::list_store_products(pool, store_id)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;
    let data = rows
        .into_iter()
        .map(|r| DashboardProduct {
            product: r.product,
            category_slug: r.category_slug,
        })
        .collect();
    Ok(ok(req_id.0, data))
}

pub(super) async fn create_product(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(owner): Extension<OwnerId>,
    Path(store_id): Path<Uuid>,
    Json(body): Json<CreateProductRequest>,
) -> Result<(StatusCode, Json<ApiResponse<ProductRow>>), ApiError> {
    let rid = &req_id.0;
    let name = body.name.trim();
    let slug = slugify(name);
    if slug.is_empty() {
        return Err(ApiError::new(rid, "validation_error", "product name is required"));
    }
    validate_price(rid, "price", body.price)?;
    if let Some(compare_at) = body.compare_at_price {
        validate_price(rid, "compare_at_price", compare_at)?;
    }

    let pool = owned_pool(&state, rid, store_id, owner).await?;
    ensure_category_in_store(pool, rid, store_id, body.category_id).await?;
    let new = NewProduct {
        external_id: None,
        name: name.to_owned(),
        slug,
        description: body.description,
        price: body.price.round_dp(2),
        compare_at_price: body.compare_at_price.map(|p| p.round_dp(2)),
        images: body.images,
        category_id: body.category_id,
        tags: clean_tags(body.tags),
        in_stock: body.in_stock,
        stock_quantity: body.stock_quantity,
        variants: body.variants,
        is_active: true,
        sort_order: body.sort_order,
    };
    let row = kriya_db::create_product(pool, store_id, &new)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;
    Ok((StatusCode::CREATED, ok(req_id.0, row)))
}

pub(super) async fn update_product(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(owner): Extension<OwnerId>,
    Path((store_id, product_id)): Path<(Uuid, Uuid)>,
    Json(body): Json<UpdateProductRequest>,
) -> Result<Json<ApiResponse<ProductRow>>, ApiError> {
    let rid = &req_id.0;
    if let Some(price) = body.price {
        validate_price(rid, "price", price)?;
    }
    if let Some(compare_at) = body.compare_at_price {
        validate_price(rid, "compare_at_price", compare_at)?;
    }
    if body.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
        return Err(ApiError::new(rid, "validation_error", "name cannot be blank"));
    }

    let pool = owned_pool(&state, rid, store_id, owner).await?;
    if !body.clear_category {
        ensure_category_in_store(pool, rid, store_id, body.category_id).await?;
    }
    let patch = ProductPatch {
        name: body.name.map(|n| n.trim().to_owned()),
        description: body.description,
        price: body.price.map(|p| p.round_dp(2)),
        compare_at_price: body.compare_at_price.map(|p| p.round_dp(2)),
        images: body.images,
        category_id: body.category_id,
        tags: body.tags.map(clean_tags),
        in_stock: body.in_stock,
        stock_quantity: body.stock_quantity,
        is_active: body.is_active,
        sort_order: body.sort_order,
        clear_description: body.clear_description,
        clear_compare_at_price: body.clear_compare_at_price,
        clear_category: body.clear_category,
    };
    let row = kriya_db::update_product(pool, store_id, product_id, &patch)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;
    Ok(ok(req_id.0, row))
}

pub(super) async fn delete_product(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(owner): Extension<OwnerId>,
    Path((store_id, product_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, ApiError> {
    let rid = &req_id.0;
    let pool = owned_pool(&state, rid, store_id, owner).await?;
    kriya_db::delete_product(pool, store_id, product_id)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Orders
// ---------------------------------------------------------------------------

pub(super) async fn list_orders(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(owner): Extension<OwnerId>,
    Path(store_id): Path<Uuid>,
    Query(params): Query<OrdersQuery>,
) -> Result<Json<ApiResponse<Vec<OrderRow>>>, ApiError> {
    let rid = &req_id.0;
    let status = params
        .status
        .as_deref()
        .map(|s| {
            s.parse::<OrderStatus>()
                .map_err(|e| ApiError::new(rid, "validation_error", e.to_string()))
        })
        .transpose()?;

    let pool = owned_pool(&state, rid, store_id, owner).await?;
    let rows = kriya_db::list_orders(pool, store_id, status.map(OrderStatus::as_str))
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;
    Ok(ok(req_id.0, rows))
}

/// PATCH /api/v1/stores/{id}/orders/{order_id}: moves the order forward or
/// cancels it. The update is conditional on the status read here, so a
/// concurrent change surfaces as 409 rather than an invalid transition.
pub(super) async fn update_order(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(owner): Extension<OwnerId>,
    Path((store_id, order_id)): Path<(Uuid, Uuid)>,
    Json(body): Json<UpdateOrderRequest>,
) -> Result<Json<ApiResponse<OrderRow>>, ApiError> {
    let rid = &req_id.0;
    let next = body
        .status
        .parse::<OrderStatus>()
        .map_err(|e| ApiError::new(rid, "validation_error", e.to_string()))?;

    let pool = owned_pool(&state, rid, store_id, owner).await?;
    let order = kriya_db::get_order(pool, store_id, order_id)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;
    let current = order
        .status
        .parse::<OrderStatus>()
        .map_err(|e| ApiError::new(rid, "internal_error", e.to_string()))?;
    current
        .transition_to(next)
        .map_err(|e| ApiError::new(rid, "validation_error", e.to_string()))?;

    let row = kriya_db::update_order_status(pool, store_id, order_id, current.as_str(), next.as_str())
        .await
        .map_err(|e| order_update_error(rid, &e))?;
    tracing::info!(order = %row.order_number, from = %current, to = %next, "order status changed");
    Ok(ok(req_id.0, row))
}

/// The order was read moments ago, so a guard miss means its status moved.
fn order_update_error(req_id: &str, error: &DbError) -> ApiError {
    match error {
        DbError::NotFound => ApiError::new(
            req_id,
            "conflict",
            "order status changed concurrently; reload and retry",
        ),
        e => map_db_error(req_id.to_owned(), e),
    }
}
