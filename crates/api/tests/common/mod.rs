use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use sqlx::PgPool;
use tower::ServiceExt;

use remedian_api::config::{GovernanceConfig, ServerConfig};
use remedian_api::router::build_app_router;
use remedian_api::state::AppState;

pub const TENANT: &str = "tenant-a";
pub const ACTOR: &str = "oncall@acme.test";

/// Build a test `ServerConfig` with safe defaults: all governance flags
/// off, matching a fresh deployment.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        governance: GovernanceConfig::default(),
    }
}

/// Build the full application router with all middleware layers, using the
/// given database pool and default (all-off) governance flags.
///
/// This goes through `build_app_router` so integration tests exercise the
/// same middleware stack (CORS, request ID, timeout, tracing, panic
/// recovery) that production uses.
pub fn build_test_app(pool: PgPool) -> Router {
    build_test_app_with(pool, test_config())
}

/// Variant of [`build_test_app`] for tests that need specific governance
/// flags.
pub fn build_test_app_with(pool: PgPool, config: ServerConfig) -> Router {
    let state = AppState::new(pool, config.clone());
    build_app_router(state, &config)
}

/// A test config with execution enabled and otherwise-default governance.
pub fn execution_enabled_config() -> ServerConfig {
    let mut config = test_config();
    config.governance.enable_execution = true;
    config
}

/// GET a path with no identity headers.
pub async fn get(app: Router, uri: &str) -> Response {
    let request = Request::builder()
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

/// GET a path as a tenant.
pub async fn get_as(app: Router, uri: &str, tenant: &str) -> Response {
    let request = Request::builder()
        .uri(uri)
        .header("x-tenant-id", tenant)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

/// POST a JSON body as a tenant, optionally with an actor identity.
pub async fn post_json(
    app: Router,
    uri: &str,
    tenant: &str,
    actor: Option<&str>,
    body: serde_json::Value,
) -> Response {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("x-tenant-id", tenant)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(actor) = actor {
        builder = builder.header("x-actor-id", actor);
    }
    let request = builder.body(Body::from(body.to_string())).unwrap();
    app.oneshot(request).await.unwrap()
}

/// POST with an empty body as a tenant, optionally with an actor identity.
pub async fn post_empty(app: Router, uri: &str, tenant: &str, actor: Option<&str>) -> Response {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("x-tenant-id", tenant);
    if let Some(actor) = actor {
        builder = builder.header("x-actor-id", actor);
    }
    let request = builder.body(Body::empty()).unwrap();
    app.oneshot(request).await.unwrap()
}

/// Collect a response body and parse it as JSON.
pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Propose a minimal `restart_pod` action and return its ID.
pub async fn propose_action(app: &Router, tenant: &str) -> i64 {
    let response = post_json(
        app.clone(),
        "/api/v1/safe-actions",
        tenant,
        None,
        serde_json::json!({
            "runId": uuid::Uuid::new_v4(),
            "actionType": "restart_pod",
            "proposedPayload": {"namespace": "prod", "pod": "api-0"},
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await["data"]["id"].as_i64().unwrap()
}

/// Propose, then approve as the default actor. Returns the record ID.
pub async fn propose_and_approve(app: &Router, tenant: &str) -> i64 {
    let id = propose_action(app, tenant).await;
    let response = post_empty(
        app.clone(),
        &format!("/api/v1/safe-actions/{id}/approve"),
        tenant,
        Some(ACTOR),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    id
}
