use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use uuid::Uuid;

/// Request path forwarded to tenant resolution.
pub const PATHNAME_HEADER: &str = "x-pathname";

/// Correlation id echoed in every response envelope.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

/// Authenticated store owner, taken from the JWT `sub` claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OwnerId(pub Uuid);

#[derive(Debug, Serialize, Deserialize)]
pub struct OwnerClaims {
    pub sub: String,
    pub exp: usize,
}

/// Bearer JWT settings used by middleware.
#[derive(Clone)]
pub struct AuthState {
    key: Option<Arc<DecodingKey>>,
    validation: Arc<Validation>,
}

impl std::fmt::Debug for AuthState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthState")
            .field("enabled", &self.key.is_some())
            .finish_non_exhaustive()
    }
}

impl AuthState {
    /// HS256 verification with `secret`.
    #[must_use]
    pub fn with_secret(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_aud = false;
        Self {
            key: Some(Arc::new(DecodingKey::from_secret(secret.as_bytes()))),
            validation: Arc::new(validation),
        }
    }

    /// Builds auth from `KRIYA_JWT_SECRET`.
    ///
    /// Without a secret every owner route answers 401. Config loading already
    /// refuses a missing secret outside development.
    pub fn from_config(config: &kriya_core::AppConfig) -> Self {
        match config.jwt_secret.as_deref() {
            Some(secret) => Self::with_secret(secret),
            None => {
                tracing::warn!("KRIYA_JWT_SECRET not set; owner routes will reject all requests");
                Self {
                    key: None,
                    validation: Arc::new(Validation::new(Algorithm::HS256)),
                }
            }
        }
    }

    fn verify(&self, token: &str) -> Option<OwnerId> {
        let key = self.key.as_deref()?;
        let data = jsonwebtoken::decode::<OwnerClaims>(token, key, &self.validation)
            .map_err(|e| tracing::debug!(error = %e, "JWT validation failed"))
            .ok()?;
        Uuid::parse_str(&data.claims.sub).ok().map(OwnerId)
    }
}

/// Fixed-window limiter for owner routes, one window per bearer token.
#[derive(Debug, Clone)]
pub struct RateLimitState {
    max_requests: usize,
    window: Duration,
    windows: Arc<Mutex<HashMap<String, (Instant, usize)>>>,
}

impl RateLimitState {
    #[must_use]
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            windows: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Counts one request for `caller`; false once the window is full.
    async fn admit(&self, caller: &str, now: Instant) -> bool {
        let mut windows = self.windows.lock().await;
        windows.retain(|_, (started, _)| now.saturating_duration_since(*started) < self.window);

        let (_, count) = windows.entry(caller.to_owned()).or_insert((now, 0));
        if *count >= self.max_requests {
            return false;
        }
        *count += 1;
        true
    }
}

#[derive(Debug, Serialize)]
struct MiddlewareErrorBody {
    error: MiddlewareError,
}

#[derive(Debug, Serialize)]
struct MiddlewareError {
    code: &'static str,
    message: &'static str,
}

fn middleware_error(status: StatusCode, code: &'static str, message: &'static str) -> Response {
    (
        status,
        Json(MiddlewareErrorBody {
            error: MiddlewareError { code, message },
        }),
    )
        .into_response()
}

/// Propagates `x-request-id`, minting a UUID when the client sent none. The
/// id lands in request extensions as [`RequestId`] and on the response.
pub async fn request_id(mut req: Request, next: Next) -> Response {
    let id = req
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map_or_else(|| Uuid::new_v4().to_string(), String::from);

    req.extensions_mut().insert(RequestId(id.clone()));

    let mut res = next.run(req).await;

    if let Ok(val) = HeaderValue::from_str(&id) {
        res.headers_mut().insert("x-request-id", val);
    }

    res
}

/// Paths that never need a tenant: framework assets, images, favicon, and
/// anything with a file extension.
fn is_asset_path(path: &str) -> bool {
    path.starts_with("/_next/")
        || path.starts_with("/static/")
        || path == "/favicon.ico"
        || path
            .rsplit('/')
            .next()
            .is_some_and(|last| last.contains('.'))
}

/// Stamps the request path into `x-pathname` for tenant resolution and
/// mirrors it on the response. A value forwarded by the client wins.
pub async fn stamp_pathname(mut req: Request, next: Next) -> Response {
    let path = req.uri().path().to_owned();
    if is_asset_path(&path) {
        return next.run(req).await;
    }

    let stamped = match req.headers().get(PATHNAME_HEADER) {
        Some(existing) => Some(existing.clone()),
        None => HeaderValue::from_str(&path).ok(),
    };
    if let Some(value) = &stamped {
        req.headers_mut().insert(PATHNAME_HEADER, value.clone());
    }

    let mut res = next.run(req).await;
    if let Some(value) = stamped {
        res.headers_mut().insert(PATHNAME_HEADER, value);
    }
    res
}

/// Requires a valid bearer JWT and inserts [`OwnerId`] for handlers.
pub async fn require_owner(State(auth): State<AuthState>, mut req: Request, next: Next) -> Response {
    let owner = extract_bearer_token(req.headers().get(AUTHORIZATION)).and_then(|t| auth.verify(t));

    match owner {
        Some(owner) => {
            req.extensions_mut().insert(owner);
            next.run(req).await
        }
        None => middleware_error(
            StatusCode::UNAUTHORIZED,
            "unauthorized",
            "missing or invalid bearer token",
        ),
    }
}

/// Rejects a caller with 429 after `max_requests` in the current window.
/// Requests without a token share one anonymous window.
pub async fn enforce_rate_limit(
    State(rate_limit): State<RateLimitState>,
    req: Request,
    next: Next,
) -> Response {
    let caller = extract_bearer_token(req.headers().get(AUTHORIZATION)).unwrap_or("anonymous");
    if !rate_limit.admit(caller, Instant::now()).await {
        return middleware_error(
            StatusCode::TOO_MANY_REQUESTS,
            "rate_limited",
            "rate limit exceeded",
        );
    }
    next.run(req).await
}

fn extract_bearer_token(value: Option<&HeaderValue>) -> Option<&str> {
    value
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .filter(|s| !s.trim().is_empty())
}
