//! Shared query parameter types for API handlers.

use serde::Deserialize;

/// Generic `?limit=` parameter for capped listings (reservation history).
///
/// Values are clamped by the handler before hitting the repository.
#[derive(Debug, Deserialize)]
pub struct LimitParams {
    pub limit: Option<i64>,
}
