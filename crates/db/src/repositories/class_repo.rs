//! Repository for the `classes` table.

use gymclass_core::types::DbId;
use sqlx::PgPool;

use crate::models::gym_class::{ClassFilter, CreateGymClass, GymClass, UpdateGymClass};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, modality, instructor_id, weekday, start_time, duration_minutes, \
                       capacity, occupied_seats, is_active, description, created_at, updated_at";

/// Listing contract: weekday Monday-first (Sunday last), then start time
/// ascending. `weekday` is stored Sunday = 0, hence the rotation.
const LISTING_ORDER: &str = "ORDER BY (weekday + 6) % 7, start_time, id";

/// Provides CRUD operations for classes.
///
/// `occupied_seats` is deliberately not mutable through this repository:
/// it changes only inside [`super::ReservationRepo`] transactions, which
/// keeps it equal to the class's count of `confirmed` reservations.
pub struct ClassRepo;

impl ClassRepo {
    /// Insert a new class with an empty seat counter, returning the row.
    pub async fn create(pool: &PgPool, input: &CreateGymClass) -> Result<GymClass, sqlx::Error> {
        let query = format!(
            "INSERT INTO classes
                (modality, instructor_id, weekday, start_time, duration_minutes, capacity, description)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, GymClass>(&query)
            .bind(&input.modality)
            .bind(input.instructor_id)
            .bind(input.weekday)
            .bind(input.start_time)
            .bind(input.duration_minutes)
            .bind(input.capacity)
            .bind(&input.description)
            .fetch_one(pool)
            .await
    }

    /// Find a class by internal ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<GymClass>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM classes WHERE id = $1");
        sqlx::query_as::<_, GymClass>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List classes matching `filter`, ordered by weekday (Monday first,
    /// Sunday last) then start time ascending.
    pub async fn list(pool: &PgPool, filter: &ClassFilter) -> Result<Vec<GymClass>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM classes
             WHERE ($1::text IS NULL OR modality = $1)
               AND ($2::bigint IS NULL OR instructor_id = $2)
               AND ($3::smallint IS NULL OR weekday = $3)
               AND ($4::boolean IS NULL OR is_active = $4)
             {LISTING_ORDER}"
        );
        sqlx::query_as::<_, GymClass>(&query)
            .bind(&filter.modality)
            .bind(filter.instructor_id)
            .bind(filter.weekday)
            .bind(filter.is_active)
            .fetch_all(pool)
            .await
    }

    /// List active classes (the student calendar view).
    pub async fn list_active(pool: &PgPool) -> Result<Vec<GymClass>, sqlx::Error> {
        let filter = ClassFilter {
            is_active: Some(true),
            ..ClassFilter::default()
        };
        Self::list(pool, &filter).await
    }

    /// Update a class. Only non-`None` fields in `input` are applied.
    ///
    /// Returns `None` if no row with the given `id` exists.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateGymClass,
    ) -> Result<Option<GymClass>, sqlx::Error> {
        let query = format!(
            "UPDATE classes SET
                modality = COALESCE($2, modality),
                instructor_id = COALESCE($3, instructor_id),
                weekday = COALESCE($4, weekday),
                start_time = COALESCE($5, start_time),
                duration_minutes = COALESCE($6, duration_minutes),
                capacity = COALESCE($7, capacity),
                description = COALESCE($8, description),
                updated_at = NOW()
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, GymClass>(&query)
            .bind(id)
            .bind(&input.modality)
            .bind(input.instructor_id)
            .bind(input.weekday)
            .bind(input.start_time)
            .bind(input.duration_minutes)
            .bind(input.capacity)
            .bind(&input.description)
            .fetch_optional(pool)
            .await
    }

    /// Delete a class. Its reservations go with it (FK cascade).
    ///
    /// Returns `true` if a row was deleted.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM classes WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Flip the active flag. Returns the updated row, or `None` if absent.
    pub async fn set_active(
        pool: &PgPool,
        id: DbId,
        active: bool,
    ) -> Result<Option<GymClass>, sqlx::Error> {
        let query = format!(
            "UPDATE classes SET is_active = $2, updated_at = NOW()
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, GymClass>(&query)
            .bind(id)
            .bind(active)
            .fetch_optional(pool)
            .await
    }

    /// Whether the class has at least one free seat. Missing classes report
    /// `false`.
    pub async fn has_available_seats(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let row: Option<(bool,)> =
            sqlx::query_as("SELECT occupied_seats < capacity FROM classes WHERE id = $1")
                .bind(id)
                .fetch_optional(pool)
                .await?;
        Ok(row.map(|r| r.0).unwrap_or(false))
    }

    /// Recompute `occupied_seats` from live `confirmed` reservations.
    ///
    /// Reconciliation path for counter drift (e.g. after a partial failure
    /// restored from backup). Returns the corrected value, or `None` if the
    /// class does not exist.
    pub async fn recount_occupied_seats(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<i32>, sqlx::Error> {
        let row: Option<(i32,)> = sqlx::query_as(
            "UPDATE classes SET
                occupied_seats = (
                    SELECT COUNT(*)::int FROM reservations
                    WHERE class_id = $1 AND status = 'confirmed'
                ),
                updated_at = NOW()
             WHERE id = $1
             RETURNING occupied_seats",
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;
        Ok(row.map(|r| r.0))
    }
}
