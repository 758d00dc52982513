pub mod cache;

use std::convert::Infallible;
use std::sync::Arc;

use axum::{extract::FromRequestParts, http::header::HOST, http::request::Parts};
use kriya_core::{resolve_identifier, StoreIdentifier};
use kriya_db::StoreRow;

use crate::api::AppState;
use crate::catalog::DataSource;
use crate::middleware::PATHNAME_HEADER;

/// The store a storefront request belongs to, `None` for demo traffic.
///
/// Resolved lazily from `Host` and the forwarded `x-pathname`; handlers that
/// do not extract it never touch the tenant cache.
#[derive(Debug, Clone)]
pub struct CurrentTenant(pub Option<Arc<StoreRow>>);

impl FromRequestParts<AppState> for CurrentTenant {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let host = parts
            .headers
            .get(HOST)
            .and_then(|v| v.to_str().ok())
            .or_else(|| parts.uri.host())
            .unwrap_or_default();
        let path = parts
            .headers
            .get(PATHNAME_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_else(|| parts.uri.path());

        let identifier = resolve_identifier(host, path, &state.resolver);
        let tenant = match (&identifier, &state.source) {
            (StoreIdentifier::Demo, _) | (_, DataSource::Demo) => None,
            (_, DataSource::Configured(pool)) => state.tenants.resolve(&identifier, pool).await,
        };

        tracing::debug!(tenant = %identifier, found = tenant.is_some(), "resolved tenant");
        Ok(Self(tenant))
    }
}
