//! `sync` and `sync-logs` commands. This is the cron entrypoint for catalog
//! imports; the server does not schedule them itself.

use anyhow::Context;
use kriya_core::{AppConfig, SyncStatus};
use kriya_sheets::{
    sync_all_stores, sync_store, PgCatalogStore, SheetsClient, SyncError, SyncOptions,
};
use sqlx::PgPool;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum SyncTarget {
    Store(String),
    All,
}

pub(crate) async fn run_sync(
    pool: &PgPool,
    config: &AppConfig,
    target: SyncTarget,
) -> anyhow::Result<()> {
    let client = SheetsClient::from_app_config(config)
        .context("failed to build Sheets client")?
        .ok_or(SyncError::ImporterUnavailable)?;
    let catalog = PgCatalogStore::new(pool.clone());
    let options = SyncOptions {
        stale_after_secs: config.sync_stale_secs,
    };

    match target {
        SyncTarget::Store(slug) => {
            let store = kriya_db::get_active_store_by_slug(pool, &slug)
                .await?
                .ok_or_else(|| anyhow::anyhow!("store '{slug}' not found or inactive"))?;
            tracing::info!(store = %slug, sheet = ?store.google_sheet_id, "syncing store");
            let report = sync_store(Some(&client), &catalog, &store, options).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            if !report.success {
                anyhow::bail!(
                    "sync of '{slug}' failed: {}",
                    report.error.unwrap_or_default()
                );
            }
        }
        SyncTarget::All => {
            let summary = sync_all_stores(
                Some(&client),
                &catalog,
                options,
                config.sync_max_concurrent_stores,
            )
            .await?;
            println!(
                "synced {}/{} store(s), {} failed",
                summary.successful, summary.total, summary.failed
            );
            if summary.failed > 0 {
                anyhow::bail!("{} store sync(s) failed", summary.failed);
            }
        }
    }

    Ok(())
}

pub(crate) async fn print_sync_logs(pool: &PgPool, slug: &str, limit: i64) -> anyhow::Result<()> {
    let store = kriya_db::get_active_store_by_slug(pool, slug)
        .await?
        .ok_or_else(|| anyhow::anyhow!("store '{slug}' not found or inactive"))?;
    let logs = kriya_db::list_sync_logs(pool, store.id, limit.clamp(1, 100)).await?;

    if logs.is_empty() {
        println!("no sync runs recorded for '{slug}'");
        return Ok(());
    }
    for log in logs {
        let finished = log.sync_status().is_some_and(SyncStatus::is_terminal);
        let duration = match (finished, log.duration_ms) {
            (false, _) => "running".to_owned(),
            (true, Some(ms)) => ms.to_string(),
            (true, None) => "-".to_owned(),
        };
        println!(
            "{}  {:<9}  products={:<5} categories={:<4} duration_ms={:<7} {}",
            log.created_at.format("%Y-%m-%d %H:%M:%S"),
            log.status,
            log.products_synced,
            log.categories_synced,
            duration,
            log.error_message.unwrap_or_default(),
        );
    }
    Ok(())
}
