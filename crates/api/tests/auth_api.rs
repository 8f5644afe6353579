//! HTTP-level tests for registration, login, token refresh, and the
//! profile endpoints.

mod common;

use axum::http::StatusCode;
use common::{body_json, get_auth, login, login_token, post_json, put_json_auth, seed_user};
use gymclass_core::roles::ROLE_STUDENT;
use serde_json::json;
use sqlx::PgPool;

#[sqlx::test(migrations = "../../db/migrations")]
async fn register_creates_a_signed_in_student(pool: PgPool) {
    let app = common::build_test_app(pool);

    let response = post_json(
        &app,
        "/api/v1/auth/register",
        json!({
            "name": "Ana Silva",
            "email": "ana@test.com",
            "password": "secret1",
            "confirm_password": "secret1",
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = body_json(response).await;
    assert_eq!(body["user"]["role"], "student");
    assert!(body["access_token"].as_str().is_some());
    assert!(body["refresh_token"].as_str().is_some());

    // The returned token works against a protected route.
    let token = body["access_token"].as_str().unwrap();
    let me = get_auth(&app, "/api/v1/me", token).await;
    assert_eq!(me.status(), StatusCode::OK);
    let me = body_json(me).await;
    assert_eq!(me["email"], "ana@test.com");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn register_aggregates_validation_errors(pool: PgPool) {
    let app = common::build_test_app(pool);

    let response = post_json(
        &app,
        "/api/v1/auth/register",
        json!({
            "name": "Jo",
            "email": "not-an-email",
            "password": "123",
            "confirm_password": "456",
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert_eq!(body["code"], "VALIDATION_ERROR");
    // All failing checks are reported together, not just the first.
    let message = body["error"].as_str().unwrap();
    assert!(message.contains("Name"));
    assert!(message.contains("email") || message.contains("Email"));
    assert!(message.contains("Password"));
    assert!(message.contains("Passwords do not match"));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn duplicate_email_registration_conflicts(pool: PgPool) {
    let app = common::build_test_app(pool.clone());
    seed_user(&pool, "ana@test.com", ROLE_STUDENT).await;

    let response = post_json(
        &app,
        "/api/v1/auth/register",
        json!({
            "name": "Ana Clone",
            "email": "ana@test.com",
            "password": "secret1",
            "confirm_password": "secret1",
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn login_rejects_bad_credentials(pool: PgPool) {
    let app = common::build_test_app(pool.clone());
    let (user, password) = seed_user(&pool, "ana@test.com", ROLE_STUDENT).await;

    // Correct credentials work.
    let body = login(&app, &user.email, &password).await;
    assert_eq!(body["user"]["id"], user.id);

    // Wrong password: 401 with a non-committal message.
    let response = post_json(
        &app,
        "/api/v1/auth/login",
        json!({ "email": user.email, "password": "wrong-password" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // Unknown email: same 401.
    let response = post_json(
        &app,
        "/api/v1/auth/login",
        json!({ "email": "ghost@test.com", "password": "whatever1" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn refresh_rotates_the_session(pool: PgPool) {
    let app = common::build_test_app(pool.clone());
    let (user, password) = seed_user(&pool, "ana@test.com", ROLE_STUDENT).await;

    let body = login(&app, &user.email, &password).await;
    let refresh_token = body["refresh_token"].as_str().unwrap().to_string();

    let response = post_json(
        &app,
        "/api/v1/auth/refresh",
        json!({ "refresh_token": refresh_token }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let refreshed = body_json(response).await;
    assert!(refreshed["access_token"].as_str().is_some());

    // The old refresh token was revoked by rotation.
    let response = post_json(
        &app,
        "/api/v1/auth/refresh",
        json!({ "refresh_token": refresh_token }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn protected_routes_require_a_token(pool: PgPool) {
    let app = common::build_test_app(pool);

    let response = common::get(&app, "/api/v1/me").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = get_auth(&app, "/api/v1/me", "not-a-jwt").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn profile_update_validates_and_persists(pool: PgPool) {
    let app = common::build_test_app(pool.clone());
    let (user, password) = seed_user(&pool, "ana@test.com", ROLE_STUDENT).await;
    let token = login_token(&app, &user.email, &password).await;

    // Invalid merged profile is rejected.
    let response = put_json_auth(&app, "/api/v1/me", json!({ "name": "X" }), &token).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Valid rename sticks.
    let response =
        put_json_auth(&app, "/api/v1/me", json!({ "name": "Ana Maria" }), &token).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["name"], "Ana Maria");
    assert_eq!(body["email"], "ana@test.com");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn change_password_requires_the_current_one(pool: PgPool) {
    let app = common::build_test_app(pool.clone());
    let (user, password) = seed_user(&pool, "ana@test.com", ROLE_STUDENT).await;
    let token = login_token(&app, &user.email, &password).await;

    // Wrong current password: rejected.
    let response = common::post_json_auth(
        &app,
        "/api/v1/me/change-password",
        json!({
            "current_password": "wrong",
            "new_password": "brand-new-1",
            "confirm_password": "brand-new-1",
        }),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // New password equal to the current one: validation failure.
    let response = common::post_json_auth(
        &app,
        "/api/v1/me/change-password",
        json!({
            "current_password": password,
            "new_password": password,
            "confirm_password": password,
        }),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Correct flow succeeds, and the new password logs in.
    let response = common::post_json_auth(
        &app,
        "/api/v1/me/change-password",
        json!({
            "current_password": password,
            "new_password": "brand-new-1",
            "confirm_password": "brand-new-1",
        }),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    login(&app, &user.email, "brand-new-1").await;
}
