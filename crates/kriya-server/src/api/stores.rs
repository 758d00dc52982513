//! Owner store management: list, create, read, settings update.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use kriya_core::{validate_store_slug, Theme};
use kriya_db::{NewStore, StoreRow, StoreSettingsPatch};
use serde::Deserialize;
use uuid::Uuid;

use crate::middleware::{OwnerId, RequestId};

use super::{map_db_error, ok, require_pool, ApiError, ApiResponse, AppState};

#[derive(Debug, Deserialize)]
pub(super) struct CreateStoreRequest {
    pub name: String,
    pub slug: String,
    pub tagline: Option<String>,
    pub theme: Option<String>,
    pub currency: Option<String>,
    #[serde(alias = "currencySymbol")]
    pub currency_symbol: Option<String>,
    #[serde(alias = "googleSheetId")]
    pub google_sheet_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct UpdateStoreRequest {
    pub name: Option<String>,
    pub tagline: Option<String>,
    #[serde(alias = "logoUrl")]
    pub logo_url: Option<String>,
    pub theme: Option<String>,
    pub currency: Option<String>,
    #[serde(alias = "currencySymbol")]
    pub currency_symbol: Option<String>,
    pub announcement: Option<String>,
    #[serde(alias = "instagramUrl")]
    pub instagram_url: Option<String>,
    #[serde(alias = "twitterUrl")]
    pub twitter_url: Option<String>,
    #[serde(alias = "tiktokUrl")]
    pub tiktok_url: Option<String>,
    #[serde(alias = "googleSheetId")]
    pub google_sheet_id: Option<String>,
    #[serde(alias = "customDomain")]
    pub custom_domain: Option<String>,
    #[serde(alias = "isActive")]
    pub is_active: Option<bool>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

fn parse_theme(req_id: &str, raw: Option<&str>) -> Result<Option<Theme>, ApiError> {
    raw.map(|t| {
        t.parse::<Theme>()
            .map_err(|e| ApiError::new(req_id, "validation_error", e.to_string()))
    })
    .transpose()
}

/// GET /api/v1/stores: caller's stores, newest first.
pub(super) async fn list_stores(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(owner): Extension<OwnerId>,
) -> Result<Json<ApiResponse<Vec<StoreRow>>>, ApiError> {
    let pool = require_pool(&state, &req_id.0)?;
    let stores = kriya_db::list_stores_by_owner(pool, owner.0)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;
    Ok(ok(req_id.0, stores))
}

/// POST /api/v1/stores: validates the slug, enforces the owner's plan limit,
/// then inserts. A taken slug is a 409.
pub(super) async fn create_store(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(owner): Extension<OwnerId>,
    Json(body): Json<CreateStoreRequest>,
) -> Result<(StatusCode, Json<ApiResponse<StoreRow>>), ApiError> {
    let rid = &req_id.0;

    let name = body.name.trim();
    if name.is_empty() || name.len() > 100 {
        return Err(ApiError::new(
            rid,
            "validation_error",
            "name must be 1-100 characters",
        ));
    }
    let slug = body.slug.trim().to_ascii_lowercase();
    validate_store_slug(&slug).map_err(|e| ApiError::new(rid, "validation_error", e.to_string()))?;
    let theme = parse_theme(rid, body.theme.as_deref())?.unwrap_or_default();

    let pool = require_pool(&state, rid)?;

    let tagline = non_blank(body.tagline);
    let currency = non_blank(body.currency);
    let currency_symbol = non_blank(body.currency_symbol);
    let google_sheet_id = non_blank(body.google_sheet_id);
    let new = NewStore {
        owner_id: owner.0,
        name,
        slug: &slug,
        tagline: tagline.as_deref(),
        theme: theme.as_str(),
        currency: currency.as_deref().unwrap_or("USD"),
        currency_symbol: currency_symbol.as_deref().unwrap_or("$"),
        google_sheet_id: google_sheet_id.as_deref(),
    };

    let store = kriya_db::create_store(pool, &new).await.map_err(|e| {
        if e.is_unique_violation() {
            ApiError::new(rid, "conflict", format!("slug '{slug}' is already taken"))
        } else {
            map_db_error(rid.clone(), &e)
        }
    })?;

    tracing::info!(store = %store.slug, owner = %owner.0, "store created");
    Ok((StatusCode::CREATED, ok(req_id.0, store)))
}

pub(super) async fn get_store(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(owner): Extension<OwnerId>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<StoreRow>>, ApiError> {
    let pool = require_pool(&state, &req_id.0)?;
    let store = kriya_db::get_store_for_owner(pool, id, owner.0)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;
    Ok(ok(req_id.0, store))
}

/// PATCH /api/v1/stores/{id}: sparse settings update. The slug is not
/// accepted. Both the old and new cache entries are dropped.
pub(super) async fn update_store(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(owner): Extension<OwnerId>,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateStoreRequest>,
) -> Result<Json<ApiResponse<StoreRow>>, ApiError> {
    let rid = &req_id.0;
    let theme = parse_theme(rid, body.theme.as_deref())?;
    if body.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
        return Err(ApiError::new(rid, "validation_error", "name cannot be blank"));
    }

    let pool = require_pool(&state, rid)?;
    let before = kriya_db::get_store_for_owner(pool, id, owner.0)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;

    let patch = StoreSettingsPatch {
        name: body.name.map(|n| n.trim().to_owned()),
        tagline: body.tagline,
        logo_url: body.logo_url,
        theme: theme.map(|t| t.as_str().to_owned()),
        currency: body.currency,
        currency_symbol: body.currency_symbol,
        announcement: body.announcement,
        instagram_url: body.instagram_url,
        twitter_url: body.twitter_url,
        tiktok_url: body.tiktok_url,
        google_sheet_id: body.google_sheet_id.map(|s| s.trim().to_owned()),
        custom_domain: body.custom_domain.map(|d| d.trim().to_ascii_lowercase()),
        is_active: body.is_active,
    };

    let store = kriya_db::update_store_settings(pool, id, owner.0, &patch)
        .await
        .map_err(|e| {
            if e.is_unique_violation() {
                ApiError::new(rid, "conflict", "custom domain is already in use")
            } else {
                map_db_error(rid.clone(), &e)
            }
        })?;

    state.tenants.invalidate_store(&before).await;
    state.tenants.invalidate_store(&store).await;

    Ok(ok(req_id.0, store))
}
