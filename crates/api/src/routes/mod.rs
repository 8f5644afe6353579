pub mod admin;
pub mod auth;
pub mod classes;
pub mod health;
pub mod me;
pub mod reservations;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /auth/register                     register (public)
/// /auth/login                        login (public)
/// /auth/refresh                      refresh (public)
/// /auth/logout                       logout (requires auth)
///
/// /me                                profile get, update
/// /me/change-password                change password (POST)
/// /me/reservations                   upcoming confirmed reservations
/// /me/history                        settled reservations (?limit=)
/// /me/stats                          counts + attendance rate
///
/// /classes                           list, create
/// /classes/schedule                  weekly calendar with next occurrences
/// /classes/{id}                      get, update, delete
/// /classes/{id}/active               set active flag (PATCH)
/// /classes/{id}/roster               occurrence roster (instructor)
///
/// /reservations                      book (POST), admin listing (GET)
/// /reservations/{id}                 get
/// /reservations/{id}/cancel          cancel (POST)
/// /reservations/{id}/attendance      mark attended/absent (POST)
///
/// /admin/users                       list (admin only)
/// /admin/users/{id}                  get, update, deactivate
/// /admin/stats                       aggregate statistics
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/me", me::router())
        .nest("/classes", classes::router())
        .nest("/reservations", reservations::router())
        .nest("/admin", admin::router())
}
