mod sync;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::sync::SyncTarget;

#[derive(Debug, Parser)]
#[command(name = "kriya-cli")]
#[command(about = "Kriya storefront operations")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Database maintenance
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
    /// Import a store's catalog from its Google Sheet
    Sync {
        /// Store slug to sync
        #[arg(long, conflicts_with = "all", required_unless_present = "all")]
        store: Option<String>,

        /// Sync every active store with a sheet configured
        #[arg(long)]
        all: bool,
    },
    /// Show recent sync runs for a store
    SyncLogs {
        #[arg(long)]
        store: String,

        #[arg(long, default_value_t = 10)]
        limit: i64,
    },
}

#[derive(Debug, Subcommand)]
enum DbCommands {
    /// Apply pending migrations
    Migrate,
    /// Check database connectivity
    Ping,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = kriya_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let Some(command) = cli.command else {
        println!("kriya-cli: run with --help to list commands");
        return Ok(());
    };

    let pool = kriya_db::connect_pool_from_config(&config).await?;

    match command {
        Commands::Db {
            command: DbCommands::Migrate,
        } => {
            let applied = kriya_db::run_migrations(&pool).await?;
            println!("applied {applied} migration(s)");
        }
        Commands::Db {
            command: DbCommands::Ping,
        } => {
            kriya_db::health_check(&pool).await?;
            println!("database ok");
        }
        Commands::Sync { store, all } => {
            let target = if all {
                SyncTarget::All
            } else {
                SyncTarget::Store(store.unwrap_or_default())
            };
            sync::run_sync(&pool, &config, target).await?;
        }
        Commands::SyncLogs { store, limit } => {
            sync::print_sync_logs(&pool, &store, limit).await?;
        }
    }

    Ok(())
}
