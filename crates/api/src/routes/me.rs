//! Route definitions for the authenticated user's own resources.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::me;
use crate::state::AppState;

/// Routes mounted at `/me`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(me::get_profile).put(me::update_profile))
        .route("/change-password", post(me::change_password))
        .route("/reservations", get(me::my_reservations))
        .route("/history", get(me::my_history))
        .route("/stats", get(me::my_stats))
}
