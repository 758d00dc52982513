//! Database operations for the `stores` table.

use chrono::{DateTime, Utc};
use kriya_core::Plan;
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `stores` table.
///
/// `theme` and `plan` are stored as constrained `TEXT`; parse them with
/// [`kriya_core::Theme`] / [`kriya_core::Plan`] when branching on them.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct StoreRow {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub slug: String,
    pub custom_domain: Option<String>,
    pub tagline: Option<String>,
    pub logo_url: Option<String>,
    pub theme: String,
    pub currency: String,
    pub currency_symbol: String,
    pub announcement: Option<String>,
    pub instagram_url: Option<String>,
    pub twitter_url: Option<String>,
    pub tiktok_url: Option<String>,
    pub google_sheet_id: Option<String>,
    pub google_sheet_last_sync: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub plan: String,
    pub settings: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StoreRow {
    #[must_use]
    pub fn plan(&self) -> Plan {
        self.plan.parse().unwrap_or_default()
    }

    #[must_use]
    pub fn has_sheet(&self) -> bool {
        self.google_sheet_id
            .as_deref()
            .is_some_and(|id| !id.trim().is_empty())
    }
}

/// Fields accepted when creating a store. Slug validation happens before this
/// point; the insert relies on the unique index for the availability check.
#[derive(Debug, Clone)]
pub struct NewStore<'a> {
    pub owner_id: Uuid,
    pub name: &'a str,
    pub slug: &'a str,
    pub tagline: Option<&'a str>,
    pub theme: &'a str,
    pub currency: &'a str,
    pub currency_symbol: &'a str,
    pub google_sheet_id: Option<&'a str>,
}

/// Sparse settings update. `None` leaves a column untouched. The slug is not
/// part of this patch and cannot be changed after creation.
#[derive(Debug, Clone, Default)]
pub struct StoreSettingsPatch {
    pub name: Option<String>,
    pub tagline: Option<String>,
    pub logo_url: Option<String>,
    pub theme: Option<String>,
    pub currency: Option<String>,
    pub currency_symbol: Option<String>,
    pub announcement: Option<String>,
    pub instagram_url: Option<String>,
    pub twitter_url: Option<String>,
    pub tiktok_url: Option<String>,
    pub google_sheet_id: Option<String>,
    pub custom_domain: Option<String>,
    pub is_active: Option<bool>,
}

const STORE_COLUMNS: &str = "id, owner_id, name, slug, custom_domain, tagline, logo_url, theme, \
     currency, currency_symbol, announcement, instagram_url, twitter_url, tiktok_url, \
     google_sheet_id, google_sheet_last_sync, is_active, plan, settings, created_at, updated_at";

// ---------------------------------------------------------------------------
// Tenant lookups
// ---------------------------------------------------------------------------

/// Returns the active store with this slug, or `None`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_active_store_by_slug(
    pool: &PgPool,
    slug: &str,
) -> Result<Option<StoreRow>, DbError> {
    let row = sqlx::query_as::<_, StoreRow>(&format!(
        "SELECT {STORE_COLUMNS} FROM stores WHERE slug = $1 AND is_active = true"
    ))
    .bind(slug)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Returns the active store mapped to this custom domain, or `None`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_active_store_by_domain(
    pool: &PgPool,
    domain: &str,
) -> Result<Option<StoreRow>, DbError> {
    let row = sqlx::query_as::<_, StoreRow>(&format!(
        "SELECT {STORE_COLUMNS} FROM stores WHERE custom_domain = $1 AND is_active = true"
    ))
    .bind(domain)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Fetches a store only if `owner_id` owns it. A store owned by someone else
/// is indistinguishable from a missing one.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the store is missing or not owned, or
/// [`DbError::Sqlx`].
pub async fn get_store_for_owner(
    pool: &PgPool,
    id: Uuid,
    owner_id: Uuid,
) -> Result<StoreRow, DbError> {
    sqlx::query_as::<_, StoreRow>(&format!(
        "SELECT {STORE_COLUMNS} FROM stores WHERE id = $1 AND owner_id = $2"
    ))
    .bind(id)
    .bind(owner_id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)
}

// ---------------------------------------------------------------------------
// Owner dashboard
// ---------------------------------------------------------------------------

/// Lists an owner's stores, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_stores_by_owner(pool: &PgPool, owner_id: Uuid) -> Result<Vec<StoreRow>, DbError> {
    let rows = sqlx::query_as::<_, StoreRow>(&format!(
        "SELECT {STORE_COLUMNS} FROM stores WHERE owner_id = $1 ORDER BY created_at DESC, id"
    ))
    .bind(owner_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Inserts a new store on the `free` plan, enforcing the owner's store limit.
///
/// The limit comes from the highest plan on any of the owner's existing
/// stores. Creation for one owner is serialized with a transaction-scoped
/// advisory lock, so concurrent requests cannot both pass the count check.
///
/// # Errors
///
/// - [`DbError::PlanLimitReached`] if the owner already holds as many stores
///   as their plan allows.
/// - [`DbError::Sqlx`] if the insert fails; a taken slug surfaces as a
///   unique violation (see [`DbError::is_unique_violation`]).
pub async fn create_store(pool: &PgPool, new: &NewStore<'_>) -> Result<StoreRow, DbError> {
    let mut tx = pool.begin().await?;

    sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1::text))")
        .bind(new.owner_id.to_string())
        .execute(&mut *tx)
        .await?;

    let existing = sqlx::query_as::<_, StoreRow>(&format!(
        "SELECT {STORE_COLUMNS} FROM stores WHERE owner_id = $1"
    ))
    .bind(new.owner_id)
    .fetch_all(&mut *tx)
    .await?;

    let plan = existing.iter().map(StoreRow::plan).max().unwrap_or_default();
    let current = i64::try_from(existing.len()).unwrap_or(i64::MAX);
    if !plan.allows_another_store(current) {
        return Err(DbError::PlanLimitReached {
            plan,
            limit: plan.store_limit().unwrap_or(current),
        });
    }

    let row = sqlx::query_as::<_, StoreRow>(&format!(
        "INSERT INTO stores (id, owner_id, name, slug, tagline, theme, currency, currency_symbol, google_sheet_id) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
         RETURNING {STORE_COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(new.owner_id)
    .bind(new.name)
    .bind(new.slug)
    .bind(new.tagline)
    .bind(new.theme)
    .bind(new.currency)
    .bind(new.currency_symbol)
    .bind(new.google_sheet_id)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(row)
}

/// Applies a sparse settings update to an owned store and returns the new row.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the store is missing or not owned by
/// `owner_id`, or [`DbError::Sqlx`] (unique violation on a taken custom domain).
pub async fn update_store_settings(
    pool: &PgPool,
    id: Uuid,
    owner_id: Uuid,
    patch: &StoreSettingsPatch,
) -> Result<StoreRow, DbError> {
    sqlx::query_as::<_, StoreRow>(&format!(
        "UPDATE stores SET \
             name = COALESCE($3, name), \
             tagline = COALESCE($4, tagline), \
             logo_url = COALESCE($5, logo_url), \
             theme = COALESCE($6, theme), \
             currency = COALESCE($7, currency), \
             currency_symbol = COALESCE($8, currency_symbol), \
             announcement = COALESCE($9, announcement), \
             instagram_url = COALESCE($10, instagram_url), \
             twitter_url = COALESCE($11, twitter_url), \
             tiktok_url = COALESCE($12, tiktok_url), \
             google_sheet_id = COALESCE($13, google_sheet_id), \
             custom_domain = COALESCE($14, custom_domain), \
             is_active = COALESCE($15, is_active), \
             updated_at = NOW() \
         WHERE id = $1 AND owner_id = $2 \
         RETURNING {STORE_COLUMNS}"
    ))
    .bind(id)
    .bind(owner_id)
    .bind(patch.name.as_deref())
    .bind(patch.tagline.as_deref())
    .bind(patch.logo_url.as_deref())
    .bind(patch.theme.as_deref())
    .bind(patch.currency.as_deref())
    .bind(patch.currency_symbol.as_deref())
    .bind(patch.announcement.as_deref())
    .bind(patch.instagram_url.as_deref())
    .bind(patch.twitter_url.as_deref())
    .bind(patch.tiktok_url.as_deref())
    .bind(patch.google_sheet_id.as_deref())
    .bind(patch.custom_domain.as_deref())
    .bind(patch.is_active)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)
}

// ---------------------------------------------------------------------------
// Import bookkeeping
// ---------------------------------------------------------------------------

/// Sets `google_sheet_last_sync = NOW()`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn touch_last_sync(pool: &PgPool, id: Uuid) -> Result<(), DbError> {
    sqlx::query("UPDATE stores SET google_sheet_last_sync = NOW(), updated_at = NOW() WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Active stores with a spreadsheet configured, ordered by slug.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_syncable_stores(pool: &PgPool) -> Result<Vec<StoreRow>, DbError> {
    let rows = sqlx::query_as::<_, StoreRow>(&format!(
        "SELECT {STORE_COLUMNS} FROM stores \
         WHERE is_active = true AND google_sheet_id IS NOT NULL AND google_sheet_id <> '' \
         ORDER BY slug"
    ))
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
