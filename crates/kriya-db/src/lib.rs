use std::collections::HashSet;
use std::time::Duration;

use kriya_core::{AppConfig, Plan};
use sqlx::{migrate::Migrate, postgres::PgPoolOptions, PgPool};
use thiserror::Error;
use uuid::Uuid;

pub mod catalog;
pub mod orders;
pub mod stores;
pub mod sync_logs;

pub use catalog::{
    category_in_store, category_slug_map, create_category, create_product, delete_category,
    delete_product, get_active_product, list_active_categories, list_active_products,
    list_active_products_by_category, list_store_categories, list_store_products,
    replace_categories, replace_products, search_active_products, update_product, CategoryRow,
    NewCategory, NewProduct, ProductPatch, ProductRow, ProductWithCategoryRow,
};
pub use orders::{get_order, list_orders, update_order_status, OrderRow};
pub use stores::{
    create_store, get_active_store_by_domain, get_active_store_by_slug, get_store_for_owner,
    list_stores_by_owner, list_syncable_stores, touch_last_sync, update_store_settings, NewStore, StoreRow,
    StoreSettingsPatch,
};
pub use sync_logs::{
    complete_sync_log, fail_sync_log, list_sync_logs, reclaim_stale_sync_logs, start_sync_log,
    SyncLogRow,
};

const DEFAULT_MAX_CONNECTIONS: u32 = 10;
const DEFAULT_MIN_CONNECTIONS: u32 = 1;
const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 10;

/// Postgres SQLSTATE for `unique_violation`.
const UNIQUE_VIOLATION: &str = "23505";

// Path relative to crates/kriya-db/Cargo.toml; resolves to <workspace-root>/migrations/
static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations");

#[derive(Debug, Clone, Copy)]
pub struct PoolConfig {
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_secs: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: DEFAULT_MAX_CONNECTIONS,
            min_connections: DEFAULT_MIN_CONNECTIONS,
            acquire_timeout_secs: DEFAULT_ACQUIRE_TIMEOUT_SECS,
        }
    }
}

impl PoolConfig {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            max_connections: config.db_max_connections,
            min_connections: config.db_min_connections,
            acquire_timeout_secs: config.db_acquire_timeout_secs,
        }
    }
}

#[derive(Debug, Error)]
pub enum DbError {
    #[error("DATABASE_URL is not set")]
    MissingDatabaseUrl,
    #[error("record not found")]
    NotFound,
    #[error("a sync is already running for store {store_id}")]
    SyncAlreadyRunning { store_id: Uuid },
    #[error("sync log {id} is not in status '{expected_status}'")]
    InvalidSyncTransition {
        id: Uuid,
        expected_status: &'static str,
    },
    #[error("the {plan} plan allows {limit} store(s)")]
    PlanLimitReached { plan: Plan, limit: i64 },
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl DbError {
    /// True when the underlying database error is a unique-constraint violation.
    #[must_use]
    pub fn is_unique_violation(&self) -> bool {
        match self {
            DbError::Sqlx(e) => is_unique_violation(e),
            _ => false,
        }
    }
}

/// True when `err` is a Postgres `unique_violation` (SQLSTATE 23505).
#[must_use]
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) => db.code().as_deref() == Some(UNIQUE_VIOLATION),
        _ => false,
    }
}

/// Opens the pool described by `config`. Pool sizing and the acquire timeout
/// come from the `KRIYA_DB_*` settings.
///
/// # Errors
///
/// Returns [`DbError::MissingDatabaseUrl`] when the config carries no URL, or
/// [`DbError::Sqlx`] if the first connection fails.
pub async fn connect_pool_from_config(config: &AppConfig) -> Result<PgPool, DbError> {
    let url = config
        .database_url
        .as_deref()
        .ok_or(DbError::MissingDatabaseUrl)?;
    let pool_config = PoolConfig::from_app_config(config);

    let pool = PgPoolOptions::new()
        .max_connections(pool_config.max_connections)
        .min_connections(pool_config.min_connections)
        .acquire_timeout(Duration::from_secs(pool_config.acquire_timeout_secs))
        .connect(url)
        .await?;
    Ok(pool)
}

/// Applies the embedded migrations and returns how many were pending.
///
/// # Errors
///
/// Returns [`sqlx::migrate::MigrateError`] if the history table cannot be
/// read or any migration fails.
pub async fn run_migrations(pool: &PgPool) -> Result<usize, sqlx::migrate::MigrateError> {
    let pending = {
        let mut conn = pool.acquire().await?;
        conn.ensure_migrations_table().await?;
        let applied: HashSet<i64> = conn
            .list_applied_migrations()
            .await?
            .into_iter()
            .map(|m| m.version)
            .collect();
        MIGRATOR
            .iter()
            .filter(|m| m.migration_type.is_up_migration() && !applied.contains(&m.version))
            .count()
    };

    MIGRATOR.run(pool).await?;
    Ok(pending)
}

/// Round-trips `SELECT 1` through the pool.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if no connection can be acquired or the query
/// fails.
pub async fn health_check(pool: &PgPool) -> Result<(), DbError> {
    sqlx::query_scalar::<_, i32>("SELECT 1").fetch_one(pool).await?;
    Ok(())
}
