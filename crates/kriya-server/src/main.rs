mod api;
mod catalog;
mod demo;
mod middleware;
mod tenant;

use std::sync::Arc;
use std::time::Duration;

use kriya_core::{AppConfig, ResolverConfig};
use kriya_sheets::{SheetsClient, SyncOptions};
use tracing_subscriber::EnvFilter;

use crate::{
    api::{build_app, default_rate_limit_state, AppState},
    catalog::DataSource,
    demo::DemoSource,
    middleware::AuthState,
    tenant::cache::{Clock, SystemClock, TenantCache},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Arc::new(kriya_core::load_app_config()?);
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let source = match config.database_url.as_deref() {
        Some(_) => {
            let pool = kriya_db::connect_pool_from_config(&config).await?;
            kriya_db::run_migrations(&pool).await?;
            DataSource::Configured(pool)
        }
        None => {
            tracing::warn!("DATABASE_URL not set; serving the demo catalog only");
            DataSource::Demo
        }
    };

    let sheets = SheetsClient::from_app_config(&config)?.map(Arc::new);
    if sheets.is_none() {
        tracing::info!("GOOGLE_SHEETS_API_KEY not set; catalog import disabled");
    }

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let demo = Arc::new(build_demo_source(&config, sheets.as_ref(), Arc::clone(&clock)));
    let tenants = Arc::new(TenantCache::new(
        Duration::from_secs(config.tenant_cache_ttl_secs),
        clock,
    ));

    let state = AppState::new(
        source,
        demo,
        tenants,
        ResolverConfig::from(config.as_ref()),
        sheets,
        SyncOptions {
            stale_after_secs: config.sync_stale_secs,
        },
    );
    let auth = AuthState::from_config(&config);
    let app = build_app(state, auth, default_rate_limit_state());

    tracing::info!(env = %config.env, addr = %config.bind_addr, "kriya-server listening");
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

fn build_demo_source(
    config: &AppConfig,
    sheets: Option<&Arc<SheetsClient>>,
    clock: Arc<dyn Clock>,
) -> DemoSource {
    match (sheets, config.demo_sheet_id.as_deref()) {
        (Some(client), Some(sheet_id)) => {
            tracing::info!(sheet_id, "demo catalog backed by spreadsheet");
            DemoSource::from_sheet(
                Arc::clone(client) as Arc<dyn kriya_sheets::SheetSource>,
                sheet_id.to_owned(),
                Duration::from_secs(config.demo_cache_ttl_secs),
                clock,
            )
        }
        _ => DemoSource::builtin(clock),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
