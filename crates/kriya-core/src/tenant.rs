//! Request-to-tenant identifier resolution.
//!
//! Pure host/path logic: never touches storage and never fails. Unresolvable
//! inputs fall back to [`StoreIdentifier::Demo`].

use std::fmt;

use crate::app_config::AppConfig;

/// How a request names its tenant.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StoreIdentifier {
    Slug(String),
    Domain(String),
    Demo,
}

impl StoreIdentifier {
    /// Cache key in `kind:value` form. `Demo` is never cached but still has a
    /// stable key for logging.
    #[must_use]
    pub fn cache_key(&self) -> String {
        match self {
            StoreIdentifier::Slug(slug) => format!("slug:{slug}"),
            StoreIdentifier::Domain(domain) => format!("domain:{domain}"),
            StoreIdentifier::Demo => "demo:demo".to_string(),
        }
    }
}

impl fmt::Display for StoreIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.cache_key())
    }
}

#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Platform domain; tenants live at `<slug>.<base_domain>`.
    pub base_domain: String,
    /// Hosts treated as local development, where the tenant comes from a
    /// `/store/<slug>` path prefix instead of the subdomain.
    pub local_hosts: Vec<String>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            base_domain: "kriya.store".to_string(),
            local_hosts: vec!["localhost".to_string(), "127.0.0.1".to_string()],
        }
    }
}

impl From<&AppConfig> for ResolverConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            base_domain: config.base_domain.clone(),
            local_hosts: config.local_hosts.clone(),
        }
    }
}

/// Derives the tenant identifier for a request from its `Host` header and path.
#[must_use]
pub fn resolve_identifier(host: &str, path: &str, config: &ResolverConfig) -> StoreIdentifier {
    let host = strip_port(host.trim()).to_ascii_lowercase();
    let base = config.base_domain.trim().to_ascii_lowercase();

    if host.is_empty() || config.local_hosts.iter().any(|local| *local == host) {
        return slug_from_path(path).map_or(StoreIdentifier::Demo, StoreIdentifier::Slug);
    }

    if host == base {
        return StoreIdentifier::Demo;
    }

    let Some(subdomain) = host
        .strip_suffix(base.as_str())
        .and_then(|rest| rest.strip_suffix('.'))
    else {
        return StoreIdentifier::Domain(host);
    };

    if subdomain.is_empty() || subdomain == "www" {
        StoreIdentifier::Demo
    } else {
        StoreIdentifier::Slug(subdomain.to_string())
    }
}

fn strip_port(host: &str) -> &str {
    match host.rsplit_once(':') {
        Some((name, port)) if !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit()) => {
            name
        }
        _ => host,
    }
}

fn slug_from_path(path: &str) -> Option<String> {
    let rest = path.strip_prefix("/store/")?;
    let segment = rest.split(['/', '?', '#']).next().unwrap_or_default();
    if segment.is_empty() {
        None
    } else {
        Some(segment.to_ascii_lowercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> ResolverConfig {
        ResolverConfig::default()
    }

    #[test]
    fn localhost_with_store_path_yields_slug() {
        assert_eq!(
            resolve_identifier("localhost:3000", "/store/acme/products", &cfg()),
            StoreIdentifier::Slug("acme".to_string())
        );
        assert_eq!(
            resolve_identifier("127.0.0.1", "/store/acme", &cfg()),
            StoreIdentifier::Slug("acme".to_string())
        );
    }

    #[test]
    fn localhost_without_store_path_is_demo() {
        assert_eq!(
            resolve_identifier("localhost:3000", "/", &cfg()),
            StoreIdentifier::Demo
        );
        assert_eq!(
            resolve_identifier("localhost", "/store/", &cfg()),
            StoreIdentifier::Demo
        );
    }

    #[test]
    fn subdomain_of_base_yields_slug() {
        assert_eq!(
            resolve_identifier("acme.kriya.store", "/", &cfg()),
            StoreIdentifier::Slug("acme".to_string())
        );
        assert_eq!(
            resolve_identifier("ACME.Kriya.Store:443", "/", &cfg()),
            StoreIdentifier::Slug("acme".to_string())
        );
    }

    #[test]
    fn bare_and_www_base_are_demo() {
        assert_eq!(
            resolve_identifier("kriya.store", "/", &cfg()),
            StoreIdentifier::Demo
        );
        assert_eq!(
            resolve_identifier("www.kriya.store", "/", &cfg()),
            StoreIdentifier::Demo
        );
    }

    #[test]
    fn foreign_host_is_custom_domain() {
        assert_eq!(
            resolve_identifier("shop.acme.com:8080", "/", &cfg()),
            StoreIdentifier::Domain("shop.acme.com".to_string())
        );
    }

    #[test]
    fn suffix_without_dot_boundary_is_custom_domain() {
        assert_eq!(
            resolve_identifier("fookriya.store", "/", &cfg()),
            StoreIdentifier::Domain("fookriya.store".to_string())
        );
    }

    #[test]
    fn store_path_is_ignored_off_localhost() {
        assert_eq!(
            resolve_identifier("acme.kriya.store", "/store/other", &cfg()),
            StoreIdentifier::Slug("acme".to_string())
        );
    }

    #[test]
    fn cache_keys_are_kind_prefixed() {
        assert_eq!(
            StoreIdentifier::Slug("acme".into()).cache_key(),
            "slug:acme"
        );
        assert_eq!(
            StoreIdentifier::Domain("shop.acme.com".into()).cache_key(),
            "domain:shop.acme.com"
        );
    }
}
