//! Role lookup model.

use gymclass_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A role row from the seeded `roles` table.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Role {
    pub id: DbId,
    pub name: String,
    pub description: Option<String>,
    pub created_at: Timestamp,
}
