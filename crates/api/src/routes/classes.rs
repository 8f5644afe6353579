//! Route definitions for classes.

use axum::routing::{get, patch};
use axum::Router;

use crate::handlers::classes;
use crate::state::AppState;

/// Routes mounted at `/classes`.
///
/// ```text
/// GET    /            -> list (filters via query params)
/// POST   /            -> create (instructor/admin)
/// GET    /schedule    -> weekly calendar
/// GET    /{id}        -> get_by_id
/// PUT    /{id}        -> update (owner/admin)
/// DELETE /{id}        -> delete (owner/admin)
/// PATCH  /{id}/active -> set_active (owner/admin)
/// GET    /{id}/roster -> roster (owner/admin)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(classes::list).post(classes::create))
        .route("/schedule", get(classes::schedule))
        .route(
            "/{id}",
            get(classes::get_by_id)
                .put(classes::update)
                .delete(classes::delete),
        )
        .route("/{id}/active", patch(classes::set_active))
        .route("/{id}/roster", get(classes::roster))
}
