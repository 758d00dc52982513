use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the process environment so it can be tested against a
/// plain `HashMap`.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;

    let optional = |var: &str| -> Option<String> {
        lookup(var)
            .ok()
            .map(|v| v.trim().to_owned())
            .filter(|v| !v.is_empty())
    };

    let or_default = |var: &str, default: &str| -> String {
        optional(var).unwrap_or_else(|| default.to_string())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_addr = |var: &str, default: &str| -> Result<SocketAddr, ConfigError> {
        or_default(var, default)
            .parse::<SocketAddr>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        or_default(var, default)
            .parse::<usize>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let env = parse_environment(&or_default("KRIYA_ENV", "development"))?;
    let database_url = optional("DATABASE_URL");
    let jwt_secret = optional("KRIYA_JWT_SECRET");

    // Only local development may run with owner routes locked out.
    if jwt_secret.is_none() && env != Environment::Development {
        return Err(ConfigError::MissingEnvVar("KRIYA_JWT_SECRET".to_string()));
    }

    let bind_addr = parse_addr("KRIYA_BIND_ADDR", "0.0.0.0:3000")?;
    let log_level = or_default("KRIYA_LOG_LEVEL", "info");

    let base_domain = or_default("KRIYA_BASE_DOMAIN", "kriya.store").to_lowercase();
    let local_hosts: Vec<String> = or_default("KRIYA_LOCAL_HOSTS", "localhost,127.0.0.1")
        .split(',')
        .map(|h| h.trim().to_lowercase())
        .filter(|h| !h.is_empty())
        .collect();

    let tenant_cache_ttl_secs = parse_u64("KRIYA_TENANT_CACHE_TTL_SECS", "60")?;
    let demo_cache_ttl_secs = parse_u64("KRIYA_DEMO_CACHE_TTL_SECS", "60")?;

    let db_max_connections = parse_u32("KRIYA_DB_MAX_CONNECTIONS", "10")?;
    let db_min_connections = parse_u32("KRIYA_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs = parse_u64("KRIYA_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    let sheets_api_key = optional("GOOGLE_SHEETS_API_KEY");
    let sheets_base_url = or_default("KRIYA_SHEETS_BASE_URL", "https://sheets.googleapis.com");
    let sheets_timeout_secs = parse_u64("KRIYA_SHEETS_TIMEOUT_SECS", "30")?;
    let sheets_max_retries = parse_u32("KRIYA_SHEETS_MAX_RETRIES", "3")?;
    let sheets_retry_backoff_base_secs = parse_u64("KRIYA_SHEETS_RETRY_BACKOFF_BASE_SECS", "2")?;
    let demo_sheet_id = optional("KRIYA_DEMO_SHEET_ID");

    let sync_stale_secs = parse_u64("KRIYA_SYNC_STALE_SECS", "900")?;
    let sync_max_concurrent_stores = parse_usize("KRIYA_SYNC_MAX_CONCURRENT_STORES", "1")?;

    Ok(AppConfig {
        database_url,
        env,
        bind_addr,
        log_level,
        base_domain,
        local_hosts,
        jwt_secret,
        tenant_cache_ttl_secs,
        demo_cache_ttl_secs,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        sheets_api_key,
        sheets_base_url,
        sheets_timeout_secs,
        sheets_max_retries,
        sheets_retry_backoff_base_secs,
        demo_sheet_id,
        sync_stale_secs,
        sync_max_concurrent_stores,
    })
}

fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "KRIYA_ENV".to_string(),
            reason: format!("expected development, test, or production; got '{other}'"),
        }),
    }
}
