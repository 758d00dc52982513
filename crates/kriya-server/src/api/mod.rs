mod dashboard;
mod storefront;
mod stores;
mod sync;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::State,
    http::{header, HeaderName, Method, StatusCode},
    response::IntoResponse,
    routing::{get, patch, post},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use kriya_core::ResolverConfig;
use kriya_db::DbError;
use kriya_sheets::{SheetsClient, SyncOptions};
use serde::Serialize;
use sqlx::PgPool;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::catalog::{CatalogService, DataSource};
use crate::demo::DemoSource;
use crate::middleware::{
    enforce_rate_limit, request_id, require_owner, stamp_pathname, AuthState, RateLimitState,
    RequestId, PATHNAME_HEADER,
};
use crate::tenant::cache::TenantCache;

#[derive(Clone)]
pub struct AppState {
    pub source: DataSource,
    pub catalog: CatalogService,
    pub tenants: Arc<TenantCache>,
    pub demo: Arc<DemoSource>,
    pub resolver: Arc<ResolverConfig>,
    /// `None` when no Sheets API key is configured.
    pub sheets: Option<Arc<SheetsClient>>,
    pub sync_options: SyncOptions,
}

impl AppState {
    pub fn new(
        source: DataSource,
        demo: Arc<DemoSource>,
        tenants: Arc<TenantCache>,
        resolver: ResolverConfig,
        sheets: Option<Arc<SheetsClient>>,
        sync_options: SyncOptions,
    ) -> Self {
        Self {
            catalog: CatalogService::new(source.clone(), Arc::clone(&demo)),
            source,
            tenants,
            demo,
            resolver: Arc::new(resolver),
            sheets,
            sync_options,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: ErrorBody,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct HealthData {
    status: &'static str,
    database: &'static str,
}

impl ResponseMeta {
    pub(super) fn new(request_id: String) -> Self {
        Self {
            request_id,
            timestamp: Utc::now(),
        }
    }
}

impl ApiError {
    pub fn new(
        request_id: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            error: ErrorBody {
                code: code.into(),
                message: message.into(),
            },
            meta: ResponseMeta::new(request_id.into()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.error.code.as_str() {
            "not_found" => StatusCode::NOT_FOUND,
            "unauthorized" => StatusCode::UNAUTHORIZED,
            "forbidden" => StatusCode::FORBIDDEN,
            "bad_request" | "validation_error" => StatusCode::BAD_REQUEST,
            "conflict" => StatusCode::CONFLICT,
            "rate_limited" => StatusCode::TOO_MANY_REQUESTS,
            "service_unavailable" => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

pub(super) fn ok<T: Serialize>(request_id: String, data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse {
        data,
        meta: ResponseMeta::new(request_id),
    })
}

pub(super) fn normalize_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(20).clamp(1, 100)
}

/// Maps storage errors onto API codes. Missing and not-owned rows are both
/// `not_found`.
pub(super) fn map_db_error(request_id: String, error: &DbError) -> ApiError {
    match error {
        DbError::NotFound => ApiError::new(request_id, "not_found", "not found"),
        DbError::SyncAlreadyRunning { .. } => ApiError::new(
            request_id,
            "conflict",
            "a sync is already running for this store",
        ),
        DbError::PlanLimitReached { .. } => ApiError::new(
            request_id,
            "forbidden",
            format!("{error}; upgrade to add more"),
        ),
        e if e.is_unique_violation() => {
            ApiError::new(request_id, "conflict", "a record with that slug already exists")
        }
        e => {
            tracing::error!(error = %e, "database query failed");
            ApiError::new(request_id, "internal_error", "database query failed")
        }
    }
}

/// Owner routes need the database; demo mode answers 503.
pub(super) fn require_pool<'a>(state: &'a AppState, request_id: &str) -> Result<&'a PgPool, ApiError> {
    state.source.pool().ok_or_else(|| {
        ApiError::new(
            request_id,
            "service_unavailable",
            "no database configured; running in demo mode",
        )
    })
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-request-id"),
            HeaderName::from_static(PATHNAME_HEADER),
        ])
}

fn owner_router(auth: AuthState, rate_limit: RateLimitState) -> Router<AppState> {
    Router::new()
        .route(
            "/api/v1/stores",
            get(stores::list_stores).post(stores::create_store),
        )
        .route(
            "/api/v1/stores/{id}",
            get(stores::get_store).patch(stores::update_store),
        )
        .route("/api/v1/stores/{id}/sync", post(sync::trigger_sync))
        .route("/api/v1/stores/{id}/sync-logs", get(sync::list_sync_logs))
        .route(
            "/api/v1/stores/{id}/categories",
            get(dashboard::list_categories).post(dashboard::create_category),
        )
        .route(
            "/api/v1/stores/{id}/categories/{category_id}",
            axum::routing::delete(dashboard::delete_category),
        )
        .route(
            "/api/v1/stores/{id}/products",
            get(dashboard::list_products).post(dashboard::create_product),
        )
        .route(
            "/api/v1/stores/{id}/products/{product_id}",
            patch(dashboard::update_product).delete(dashboard::delete_product),
        )
        .route("/api/v1/stores/{id}/orders", get(dashboard::list_orders))
        .route(
            "/api/v1/stores/{id}/orders/{order_id}",
            patch(dashboard::update_order),
        )
        .layer(
            ServiceBuilder::new()
                .layer(axum::middleware::from_fn_with_state(
                    rate_limit,
                    enforce_rate_limit,
                ))
                .layer(axum::middleware::from_fn_with_state(auth, require_owner)),
        )
}

pub fn build_app(state: AppState, auth: AuthState, rate_limit: RateLimitState) -> Router {
    let public_routes = Router::new()
        .route("/api/v1/health", get(health))
        .route("/api/v1/store/products", get(storefront::list_products))
        .route("/api/v1/store/products/{id}", get(storefront::get_product))
        .route("/api/v1/store/categories", get(storefront::list_categories))
        .route("/api/v1/store/config", get(storefront::get_config))
        .route("/api/v1/refresh", post(storefront::refresh));

    Router::new()
        .merge(public_routes)
        .merge(owner_router(auth, rate_limit))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(build_cors())
                .layer(axum::middleware::from_fn(request_id))
                .layer(axum::middleware::from_fn(stamp_pathname)),
        )
        .with_state(state)
}

async fn health(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> impl IntoResponse {
    let meta = ResponseMeta::new(req_id.0);

    let Some(pool) = state.source.pool() else {
        return (
            StatusCode::OK,
            Json(ApiResponse {
                data: HealthData {
                    status: "ok",
                    database: "not_configured",
                },
                meta,
            }),
        );
    };

    match kriya_db::health_check(pool).await {
        Ok(()) => (
            StatusCode::OK,
            Json(ApiResponse {
                data: HealthData {
                    status: "ok",
                    database: "ok",
                },
                meta,
            }),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "health check: database unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ApiResponse {
                    data: HealthData {
                        status: "degraded",
                        database: "unavailable",
                    },
                    meta,
                }),
            )
        }
    }
}

pub fn default_rate_limit_state() -> RateLimitState {
    RateLimitState::new(120, Duration::from_secs(60))
}

#[cfg(test)]
mod tests {
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use axum::response::Response;
    use tower::ServiceExt;
    use uuid::Uuid;

    use super::*;
    use crate::middleware::tests::{issue_token, TEST_SECRET};
    use crate::tenant::cache::tests::MockClock;

    fn state(source: DataSource) -> AppState {
        let clock = MockClock::new();
        AppState::new(
            source,
            Arc::new(DemoSource::builtin(clock.clone())),
            Arc::new(TenantCache::new(Duration::from_secs(60), clock)),
            ResolverConfig::default(),
            None,
            SyncOptions::default(),
        )
    }

    fn app(source: DataSource) -> Router {
        build_app(
            state(source),
            AuthState::with_secret(TEST_SECRET),
            default_rate_limit_state(),
        )
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, serde_json::Value, Response<()>) {
        let response = app.oneshot(request).await.expect("response");
        let (parts, body) = response.into_parts();
        let bytes = to_bytes(body, usize::MAX).await.expect("body bytes");
        let json = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("json parse")
        };
        (parts.status, json, Response::from_parts(parts, ()))
    }

    fn get_req(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).expect("request")
    }

    fn json_req(method: &str, uri: &str, owner: Uuid, body: &serde_json::Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .header(
                header::AUTHORIZATION,
                format!("Bearer {}", issue_token(owner, TEST_SECRET)),
            )
            .body(Body::from(body.to_string()))
            .expect("request")
    }

    #[test]
    fn normalize_limit_applies_defaults_and_bounds() {
        assert_eq!(normalize_limit(None), 20);
        assert_eq!(normalize_limit(Some(0)), 1);
        assert_eq!(normalize_limit(Some(1_000)), 100);
        assert_eq!(normalize_limit(Some(25)), 25);
    }

    #[test]
    fn api_error_codes_map_to_statuses() {
        for (code, status) in [
            ("validation_error", StatusCode::BAD_REQUEST),
            ("forbidden", StatusCode::FORBIDDEN),
            ("conflict", StatusCode::CONFLICT),
            ("service_unavailable", StatusCode::SERVICE_UNAVAILABLE),
            ("internal_error", StatusCode::INTERNAL_SERVER_ERROR),
        ] {
            assert_eq!(ApiError::new("req-1", code, "x").into_response().status(), status);
        }
    }

    #[test]
    fn sync_conflict_maps_to_409() {
        let err = map_db_error(
            "req-1".into(),
            &DbError::SyncAlreadyRunning {
                store_id: Uuid::new_v4(),
            },
        );
        assert_eq!(err.into_response().status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn health_reports_demo_mode() {
        let (status, json, _) = send(app(DataSource::Demo), get_req("/api/v1/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["database"], "not_configured");
        assert!(json["meta"]["request_id"].is_string());
    }

    #[tokio::test]
    async fn storefront_serves_demo_catalog() {
        let (status, json, _) = send(app(DataSource::Demo), get_req("/api/v1/store/products")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"].as_array().map(Vec::len), Some(8));

        let (_, json, _) = send(
            app(DataSource::Demo),
            get_req("/api/v1/store/products?category=home"),
        )
        .await;
        let products = json["data"].as_array().expect("data array");
        assert!(!products.is_empty());
        assert!(products.iter().all(|p| p["category"] == "home"));

        let (_, json, _) = send(
            app(DataSource::Demo),
            get_req("/api/v1/store/products?search=watch"),
        )
        .await;
        assert_eq!(json["data"][0]["name"], "Minimal Watch");
    }

    #[tokio::test]
    async fn storefront_product_and_config() {
        let (status, json, _) = send(app(DataSource::Demo), get_req("/api/v1/store/products/1")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["name"], "Oversized Graphic Tee");
        assert_eq!(json["data"]["compareAtPrice"], "60");

        let (status, json, _) =
            send(app(DataSource::Demo), get_req("/api/v1/store/products/nope")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["error"]["code"], "not_found");

        let (_, json, _) = send(app(DataSource::Demo), get_req("/api/v1/store/config")).await;
        assert_eq!(json["data"]["name"], "KRIYA");
        assert_eq!(json["data"]["currencySymbol"], "$");
    }

    #[tokio::test]
    async fn refresh_returns_counts() {
        let request = Request::builder()
            .method("POST")
            .uri("/api/v1/refresh")
            .body(Body::empty())
            .expect("request");
        let (status, json, _) = send(app(DataSource::Demo), request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["products"], 8);
        assert_eq!(json["data"]["categories"], 4);
    }

    #[tokio::test]
    async fn pathname_is_stamped_and_client_value_kept() {
        let (_, _, response) = send(app(DataSource::Demo), get_req("/api/v1/store/config")).await;
        assert_eq!(
            response.headers().get(PATHNAME_HEADER).unwrap(),
            "/api/v1/store/config"
        );

        let request = Request::builder()
            .uri("/api/v1/store/config")
            .header(PATHNAME_HEADER, "/store/acme/products")
            .body(Body::empty())
            .expect("request");
        let (_, _, response) = send(app(DataSource::Demo), request).await;
        assert_eq!(
            response.headers().get(PATHNAME_HEADER).unwrap(),
            "/store/acme/products"
        );
    }

    #[tokio::test]
    async fn owner_routes_require_token() {
        let (status, json, _) = send(app(DataSource::Demo), get_req("/api/v1/stores")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json["error"]["code"], "unauthorized");
    }

    #[tokio::test]
    async fn owner_routes_unavailable_in_demo_mode() {
        let owner = Uuid::new_v4();
        let request = Request::builder()
            .uri("/api/v1/stores")
            .header(
                header::AUTHORIZATION,
                format!("Bearer {}", issue_token(owner, TEST_SECRET)),
            )
            .body(Body::empty())
            .expect("request");
        let (status, json, _) = send(app(DataSource::Demo), request).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(json["error"]["code"], "service_unavailable");
    }

    #[tokio::test]
    async fn create_store_rejects_bad_slug_before_touching_storage() {
        let body = serde_json::json!({ "name": "Ab", "slug": "ab" });
        let (status, json, _) = send(
            app(DataSource::Demo),
            json_req("POST", "/api/v1/stores", Uuid::new_v4(), &body),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"]["code"], "validation_error");
    }

    // -------------------------------------------------------------------------
    // Owner routes against Postgres
    // -------------------------------------------------------------------------

    async fn create_store(pool: &PgPool, owner: Uuid, slug: &str) -> (StatusCode, serde_json::Value) {
        let body = serde_json::json!({
            "name": format!("Store {slug}"),
            "slug": slug,
            "currencySymbol": "₹",
        });
        let (status, json, _) = send(
            app(DataSource::Configured(pool.clone())),
            json_req("POST", "/api/v1/stores", owner, &body),
        )
        .await;
        (status, json)
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn create_store_accepts_camel_case_and_returns_201(pool: PgPool) {
        let (status, json) = create_store(&pool, Uuid::new_v4(), "acme").await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(json["data"]["slug"], "acme");
        assert_eq!(json["data"]["currency_symbol"], "₹");
        assert_eq!(json["data"]["plan"], "free");
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn free_plan_blocks_second_store(pool: PgPool) {
        let owner = Uuid::new_v4();
        assert_eq!(create_store(&pool, owner, "first-shop").await.0, StatusCode::CREATED);

        let (status, json) = create_store(&pool, owner, "second-shop").await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(json["error"]["code"], "forbidden");

        let stores = kriya_db::list_stores_by_owner(&pool, owner).await.unwrap();
        assert_eq!(stores.len(), 1);
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn duplicate_slug_is_a_conflict(pool: PgPool) {
        assert_eq!(
            create_store(&pool, Uuid::new_v4(), "taken").await.0,
            StatusCode::CREATED
        );
        let (status, _) = create_store(&pool, Uuid::new_v4(), "taken").await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn non_owner_sync_is_not_found_without_writes(pool: PgPool) {
        let owner = Uuid::new_v4();
        let (_, json) = create_store(&pool, owner, "acme").await;
        let store_id = json["data"]["id"].as_str().unwrap().to_owned();

        let (status, _, _) = send(
            app(DataSource::Configured(pool.clone())),
            json_req(
                "POST",
                &format!("/api/v1/stores/{store_id}/sync"),
                Uuid::new_v4(),
                &serde_json::json!({}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let id = Uuid::parse_str(&store_id).unwrap();
        let logs = kriya_db::list_sync_logs(&pool, id, 10).await.unwrap();
        assert!(logs.is_empty());
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn sync_without_sheet_is_bad_request(pool: PgPool) {
        let owner = Uuid::new_v4();
        let (_, json) = create_store(&pool, owner, "acme").await;
        let store_id = json["data"]["id"].as_str().unwrap().to_owned();

        let (status, json, _) = send(
            app(DataSource::Configured(pool.clone())),
            json_req(
                "POST",
                &format!("/api/v1/stores/{store_id}/sync"),
                owner,
                &serde_json::json!({}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"]["code"], "bad_request");
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn patch_store_updates_settings_and_keeps_slug(pool: PgPool) {
        let owner = Uuid::new_v4();
        let (_, json) = create_store(&pool, owner, "acme").await;
        let store_id = json["data"]["id"].as_str().unwrap().to_owned();

        let (status, json, _) = send(
            app(DataSource::Configured(pool.clone())),
            json_req(
                "PATCH",
                &format!("/api/v1/stores/{store_id}"),
                owner,
                &serde_json::json!({ "tagline": "Fresh drops", "theme": "brutal", "slug": "renamed" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["tagline"], "Fresh drops");
        assert_eq!(json["data"]["theme"], "brutal");
        assert_eq!(json["data"]["slug"], "acme");
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn dashboard_product_lifecycle(pool: PgPool) {
        let owner = Uuid::new_v4();
        let (_, json) = create_store(&pool, owner, "acme").await;
        let store_id = json["data"]["id"].as_str().unwrap().to_owned();
        let base = format!("/api/v1/stores/{store_id}");

        let (status, category, _) = send(
            app(DataSource::Configured(pool.clone())),
            json_req(
                "POST",
                &format!("{base}/categories"),
                owner,
                &serde_json::json!({ "name": "Home Goods" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(category["data"]["slug"], "home-goods");

        let (status, _, _) = send(
            app(DataSource::Configured(pool.clone())),
            json_req(
                "POST",
                &format!("{base}/products"),
                owner,
                &serde_json::json!({ "name": "Mug", "price": "-1" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, product, _) = send(
            app(DataSource::Configured(pool.clone())),
            json_req(
                "POST",
                &format!("{base}/products"),
                owner,
                &serde_json::json!({
                    "name": "Mug",
                    "price": "12.50",
                    "categoryId": category["data"]["id"],
                }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let product_id = product["data"]["id"].as_str().unwrap().to_owned();

        let (status, updated, _) = send(
            app(DataSource::Configured(pool.clone())),
            json_req(
                "PATCH",
                &format!("{base}/products/{product_id}"),
                owner,
                &serde_json::json!({ "inStock": false }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["data"]["in_stock"], false);
        assert_eq!(updated["data"]["name"], "Mug");

        let delete = Request::builder()
            .method("DELETE")
            .uri(format!("{base}/products/{product_id}"))
            .header(
                header::AUTHORIZATION,
                format!("Bearer {}", issue_token(owner, TEST_SECRET)),
            )
            .body(Body::empty())
            .expect("request");
        let (status, _, _) = send(app(DataSource::Configured(pool.clone())), delete).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
    }

    async fn create_json(
        pool: &PgPool,
        owner: Uuid,
        path: &str,
        body: &serde_json::Value,
    ) -> (StatusCode, serde_json::Value) {
        let (status, json, _) = send(
            app(DataSource::Configured(pool.clone())),
            json_req("POST", path, owner, body),
        )
        .await;
        (status, json)
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn product_cannot_use_another_stores_category(pool: PgPool) {
        let alice = Uuid::new_v4();
        let (_, alpha) = create_store(&pool, alice, "alpha").await;
        let alpha_id = alpha["data"]["id"].as_str().unwrap().to_owned();
        let (_, foreign) = create_json(
            &pool,
            alice,
            &format!("/api/v1/stores/{alpha_id}/categories"),
            &serde_json::json!({ "name": "Secret" }),
        )
        .await;
        let foreign_category = foreign["data"]["id"].clone();

        let bob = Uuid::new_v4();
        let (_, bravo) = create_store(&pool, bob, "bravo").await;
        let bravo_id = bravo["data"]["id"].as_str().unwrap().to_owned();
        let base = format!("/api/v1/stores/{bravo_id}");

        let (status, json) = create_json(
            &pool,
            bob,
            &format!("{base}/products"),
            &serde_json::json!({ "name": "Mug", "price": "5", "categoryId": foreign_category }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"]["code"], "validation_error");

        let (status, product) = create_json(
            &pool,
            bob,
            &format!("{base}/products"),
            &serde_json::json!({ "name": "Mug", "price": "5" }),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let product_id = product["data"]["id"].as_str().unwrap().to_owned();

        let (status, _, _) = send(
            app(DataSource::Configured(pool.clone())),
            json_req(
                "PATCH",
                &format!("{base}/products/{product_id}"),
                bob,
                &serde_json::json!({ "categoryId": foreign_category }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let id = Uuid::parse_str(&bravo_id).unwrap();
        let products = kriya_db::list_store_products(&pool, id).await.unwrap();
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].product.category_id, None);
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn patch_can_clear_optional_product_fields(pool: PgPool) {
        let owner = Uuid::new_v4();
        let (_, json) = create_store(&pool, owner, "acme").await;
        let store_id = json["data"]["id"].as_str().unwrap().to_owned();
        let base = format!("/api/v1/stores/{store_id}");

        let (_, category) = create_json(
            &pool,
            owner,
            &format!("{base}/categories"),
            &serde_json::json!({ "name": "Mugs" }),
        )
        .await;
        let (_, product) = create_json(
            &pool,
            owner,
            &format!("{base}/products"),
            &serde_json::json!({
                "name": "Mug",
                "description": "Stoneware",
                "price": "12",
                "compareAtPrice": "15",
                "categoryId": category["data"]["id"],
            }),
        )
        .await;
        let product_id = product["data"]["id"].as_str().unwrap().to_owned();
        assert!(!product["data"]["category_id"].is_null());

        let (status, updated, _) = send(
            app(DataSource::Configured(pool.clone())),
            json_req(
                "PATCH",
                &format!("{base}/products/{product_id}"),
                owner,
                &serde_json::json!({
                    "clearDescription": true,
                    "clearCompareAtPrice": true,
                    "clearCategory": true,
                }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(updated["data"]["description"].is_null());
        assert!(updated["data"]["compare_at_price"].is_null());
        assert!(updated["data"]["category_id"].is_null());
        assert_eq!(updated["data"]["name"], "Mug");
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn storefront_resolves_tenant_from_pathname(pool: PgPool) {
        let owner = Uuid::new_v4();
        let (_, json) = create_store(&pool, owner, "acme").await;
        let store_id = Uuid::parse_str(json["data"]["id"].as_str().unwrap()).unwrap();
        kriya_db::replace_categories(
            &pool,
            store_id,
            &[kriya_db::NewCategory {
                name: "Apparel".into(),
                slug: "apparel".into(),
                description: None,
                image_url: None,
                sort_order: 0,
                is_active: true,
            }],
        )
        .await
        .unwrap();

        let request = Request::builder()
            .uri("/api/v1/store/categories")
            .header(header::HOST, "localhost:3000")
            .header(PATHNAME_HEADER, "/store/acme")
            .body(Body::empty())
            .expect("request");
        let (_, json, _) = send(app(DataSource::Configured(pool.clone())), request).await;
        let categories = json["data"].as_array().expect("data array");
        assert_eq!(categories.len(), 1);
        assert_eq!(categories[0]["slug"], "apparel");

        let request = Request::builder()
            .uri("/api/v1/store/config")
            .header(header::HOST, "acme.kriya.store")
            .body(Body::empty())
            .expect("request");
        let (_, json, _) = send(app(DataSource::Configured(pool)), request).await;
        assert_eq!(json["data"]["name"], "Store acme");
    }
}
