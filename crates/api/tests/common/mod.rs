//! Shared harness for HTTP-level integration tests.
//!
//! Builds the full application router with the same middleware stack as
//! `main.rs`, so tests exercise exactly what production serves, and
//! provides small request/response helpers around `tower::ServiceExt`.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderName, Method, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use sqlx::PgPool;
use tower::ServiceExt;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use gymclass_api::auth::jwt::JwtConfig;
use gymclass_api::auth::password::hash_password;
use gymclass_api::config::ServerConfig;
use gymclass_api::routes;
use gymclass_api::state::AppState;
use gymclass_db::models::user::{CreateUser, User};
use gymclass_db::repositories::{RoleRepo, UserRepo};

/// Build a test `ServerConfig` with safe defaults and a fixed JWT secret.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        jwt: JwtConfig {
            secret: "integration-test-secret".to_string(),
            access_token_expiry_mins: 30,
            refresh_token_expiry_days: 14,
        },
    }
}

/// Build the full application router with all middleware layers, using the
/// given database pool.
pub fn build_test_app(pool: PgPool) -> Router {
    let state = AppState {
        pool,
        config: Arc::new(test_config()),
    };

    let cors = CorsLayer::new()
        .allow_origin(["http://localhost:5173".parse().unwrap()])
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::PATCH,
        ])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .allow_credentials(true)
        .max_age(Duration::from_secs(3600));

    let request_id_header = HeaderName::from_static("x-request-id");

    Router::new()
        .merge(routes::health::router())
        .nest("/api/v1", routes::api_routes())
        .layer(CatchPanicLayer::new())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(30),
        ))
        .layer(PropagateRequestIdLayer::new(request_id_header.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::new(request_id_header, MakeRequestUuid))
        .layer(cors)
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

async fn send(
    app: &Router,
    method: Method,
    path: &str,
    body: Option<serde_json::Value>,
    token: Option<&str>,
) -> Response {
    let mut builder = Request::builder().method(method).uri(path);
    if let Some(token) = token {
        builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(json) => builder
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .expect("request builds"),
        None => builder.body(Body::empty()).expect("request builds"),
    };
    app.clone().oneshot(request).await.expect("request succeeds")
}

pub async fn get(app: &Router, path: &str) -> Response {
    send(app, Method::GET, path, None, None).await
}

pub async fn get_auth(app: &Router, path: &str, token: &str) -> Response {
    send(app, Method::GET, path, None, Some(token)).await
}

pub async fn post_json(app: &Router, path: &str, body: serde_json::Value) -> Response {
    send(app, Method::POST, path, Some(body), None).await
}

pub async fn post_json_auth(
    app: &Router,
    path: &str,
    body: serde_json::Value,
    token: &str,
) -> Response {
    send(app, Method::POST, path, Some(body), Some(token)).await
}

pub async fn put_json_auth(
    app: &Router,
    path: &str,
    body: serde_json::Value,
    token: &str,
) -> Response {
    send(app, Method::PUT, path, Some(body), Some(token)).await
}

/// Read the full response body as JSON.
pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body collects")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("body is valid JSON")
}

// ---------------------------------------------------------------------------
// Seed helpers
// ---------------------------------------------------------------------------

/// Create a user directly in the database with the given role name and a
/// known password, returning the row and the plaintext password.
pub async fn seed_user(pool: &PgPool, email: &str, role_name: &str) -> (User, String) {
    let password = "test-password-1";
    let hash = hash_password(password).expect("hashing succeeds");
    let role = RoleRepo::find_by_name(pool, role_name)
        .await
        .expect("role query succeeds")
        .expect("role is seeded");
    let user = UserRepo::create(
        pool,
        &CreateUser {
            name: "Test User".to_string(),
            email: email.to_string(),
            password_hash: hash,
            role_id: role.id,
        },
    )
    .await
    .expect("user creation succeeds");
    (user, password.to_string())
}

/// Log a user in via the API, returning the JSON auth response.
pub async fn login(app: &Router, email: &str, password: &str) -> serde_json::Value {
    let response = post_json(
        app,
        "/api/v1/auth/login",
        serde_json::json!({ "email": email, "password": password }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    body_json(response).await
}

/// Log in and return just the access token.
pub async fn login_token(app: &Router, email: &str, password: &str) -> String {
    login(app, email, password).await["access_token"]
        .as_str()
        .expect("access_token present")
        .to_string()
}
