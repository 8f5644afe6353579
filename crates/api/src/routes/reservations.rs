//! Route definitions for reservations.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::reservations;
use crate::state::AppState;

/// Routes mounted at `/reservations`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            post(reservations::book).get(reservations::list),
        )
        .route("/{id}", get(reservations::get_by_id))
        .route("/{id}/cancel", post(reservations::cancel))
        .route("/{id}/attendance", post(reservations::mark_attendance))
}
