//! Repository for the seeded `roles` lookup table.

use gymclass_core::types::DbId;
use sqlx::PgPool;

use crate::models::role::Role;

const COLUMNS: &str = "id, name, description, created_at";

/// Read-only access to roles; the table is seeded by migration.
pub struct RoleRepo;

impl RoleRepo {
    /// Find a role by its well-known name.
    pub async fn find_by_name(pool: &PgPool, name: &str) -> Result<Option<Role>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM roles WHERE name = $1");
        sqlx::query_as::<_, Role>(&query)
            .bind(name)
            .fetch_optional(pool)
            .await
    }

    /// Resolve a role id to its name.
    pub async fn resolve_name(pool: &PgPool, id: DbId) -> Result<String, sqlx::Error> {
        let row: (String,) = sqlx::query_as("SELECT name FROM roles WHERE id = $1")
            .bind(id)
            .fetch_one(pool)
            .await?;
        Ok(row.0)
    }

    /// List all roles.
    pub async fn list(pool: &PgPool) -> Result<Vec<Role>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM roles ORDER BY id");
        sqlx::query_as::<_, Role>(&query).fetch_all(pool).await
    }
}
