use std::net::SocketAddr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    /// `None` runs the service against the built-in demo catalog.
    pub database_url: Option<String>,
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub base_domain: String,
    pub local_hosts: Vec<String>,
    pub jwt_secret: Option<String>,
    pub tenant_cache_ttl_secs: u64,
    pub demo_cache_ttl_secs: u64,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub sheets_api_key: Option<String>,
    pub sheets_base_url: String,
    pub sheets_timeout_secs: u64,
    pub sheets_max_retries: u32,
    pub sheets_retry_backoff_base_secs: u64,
    pub demo_sheet_id: Option<String>,
    pub sync_stale_secs: u64,
    pub sync_max_concurrent_stores: usize,
}

impl AppConfig {
    #[must_use]
    pub fn is_development(&self) -> bool {
        self.env == Environment::Development
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field(
                "database_url",
                &self.database_url.as_ref().map(|_| "[redacted]"),
            )
            .field("base_domain", &self.base_domain)
            .field("local_hosts", &self.local_hosts)
            .field("jwt_secret", &self.jwt_secret.as_ref().map(|_| "[redacted]"))
            .field("tenant_cache_ttl_secs", &self.tenant_cache_ttl_secs)
            .field("demo_cache_ttl_secs", &self.demo_cache_ttl_secs)
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field(
                "sheets_api_key",
                &self.sheets_api_key.as_ref().map(|_| "[redacted]"),
            )
            .field("sheets_base_url", &self.sheets_base_url)
            .field("sheets_timeout_secs", &self.sheets_timeout_secs)
            .field("sheets_max_retries", &self.sheets_max_retries)
            .field(
                "sheets_retry_backoff_base_secs",
                &self.sheets_retry_backoff_base_secs,
            )
            .field("demo_sheet_id", &self.demo_sheet_id)
            .field("sync_stale_secs", &self.sync_stale_secs)
            .field(
                "sync_max_concurrent_stores",
                &self.sync_max_concurrent_stores,
            )
            .finish()
    }
}
