//! Catalog import trigger and history for an owned store.

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use kriya_db::SyncLogRow;
use kriya_sheets::{sync_store, PgCatalogStore, SheetsClient, SyncError, SyncReport};
use serde::Deserialize;
use uuid::Uuid;

use crate::middleware::{OwnerId, RequestId};

use super::{map_db_error, normalize_limit, ok, require_pool, ApiError, ApiResponse, AppState};

#[derive(Debug, Deserialize)]
pub(super) struct SyncLogsQuery {
    pub limit: Option<i64>,
}

fn map_sync_error(req_id: String, error: SyncError) -> ApiError {
    match error {
        SyncError::NoSheetConfigured => ApiError::new(
            req_id,
            "bad_request",
            "no Google Sheet connected to this store",
        ),
        SyncError::AlreadyRunning => ApiError::new(
            req_id,
            "conflict",
            "a sync is already running for this store",
        ),
        SyncError::ImporterUnavailable => ApiError::new(
            req_id,
            "service_unavailable",
            "catalog import is not configured",
        ),
        SyncError::Db(e) => map_db_error(req_id, &e),
        SyncError::Fetch(e) => {
            tracing::error!(error = %e, "sheet fetch failed before sync started");
            ApiError::new(req_id, "internal_error", e.to_string())
        }
    }
}

/// POST /api/v1/stores/{id}/sync: runs the import inline. A run that starts
/// and then fails is a 500 carrying the recorded message.
pub(super) async fn trigger_sync(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(owner): Extension<OwnerId>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<SyncReport>>, ApiError> {
    let rid = &req_id.0;
    let pool = require_pool(&state, rid)?;
    let store = kriya_db::get_store_for_owner(pool, id, owner.0)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;

    let catalog = PgCatalogStore::new(pool.clone());
    let report = sync_store::<SheetsClient, _>(
        state.sheets.as_deref(),
        &catalog,
        &store,
        state.sync_options,
    )
    .await
    .map_err(|e| map_sync_error(rid.clone(), e))?;

    if !report.success {
        let message = report
            .error
            .unwrap_or_else(|| "sync failed".to_owned());
        return Err(ApiError::new(req_id.0, "internal_error", message));
    }

    state.tenants.invalidate_store(&store).await;
    Ok(ok(req_id.0, report))
}

/// GET /api/v1/stores/{id}/sync-logs: most recent first.
pub(super) async fn list_sync_logs(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(owner): Extension<OwnerId>,
    Path(id): Path<Uuid>,
    Query(params): Query<SyncLogsQuery>,
) -> Result<Json<ApiResponse<Vec<SyncLogRow>>>, ApiError> {
    let rid = &req_id.0;
    let pool = require_pool(&state, rid)?;
    kriya_db::get_store_for_owner(pool, id, owner.0)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;

    let logs = kriya_db::list_sync_logs(pool, id, normalize_limit(params.limit))
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;
    Ok(ok(req_id.0, logs))
}
