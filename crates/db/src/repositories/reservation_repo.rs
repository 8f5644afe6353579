//! Repository for the `reservations` table: the booking rule engine.
//!
//! Every mutating operation runs in a single transaction and locks the row
//! it pivots on with `SELECT ... FOR UPDATE`: `book` locks the class row so
//! concurrent bookings against one class serialize, `cancel` and
//! `mark_attendance` lock the reservation row. The `occupied_seats`
//! counter on the class is written only here, inside those transactions,
//! so it cannot drift from the count of `confirmed` reservations.

use gymclass_core::booking::{self, ReservationStatus};
use gymclass_core::error::CoreError;
use gymclass_core::rules::{CANCEL_LEAD_TIME_HOURS, MAX_ACTIVE_RESERVATIONS};
use gymclass_core::schedule;
use gymclass_core::types::{DbId, Timestamp};
use sqlx::PgPool;

use crate::error::RepoError;
use crate::models::reservation::{
    CreateReservation, Reservation, ReservationCounts, ReservationFilter,
};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, class_id, student_id, occurrence_at, status, cancelled_at, \
                       cancellation_reason, created_at";

/// Reason recorded when a student cancels without providing one.
const DEFAULT_CANCEL_REASON: &str = "cancelled by student";

/// Reservation lifecycle operations and queries.
pub struct ReservationRepo;

impl ReservationRepo {
    /// Book a seat on one concrete class occurrence.
    ///
    /// Enforces, in order: the per-student active-reservation cap, class
    /// capacity, and the no-duplicate rule; then inserts the `confirmed`
    /// reservation and bumps the class's seat counter. The whole sequence
    /// is one transaction, so precondition failures write nothing and the
    /// insert + counter update land together or not at all.
    pub async fn book(pool: &PgPool, input: &CreateReservation) -> Result<Reservation, RepoError> {
        let mut tx = pool.begin().await?;

        // Lock the class row: concurrent bookings for this class serialize
        // here, which is what keeps the capacity check race-free.
        let class: Option<(i32, i32, bool)> = sqlx::query_as(
            "SELECT capacity, occupied_seats, is_active FROM classes WHERE id = $1 FOR UPDATE",
        )
        .bind(input.class_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some((capacity, occupied_seats, is_active)) = class else {
            return Err(CoreError::NotFound {
                entity: "Class",
                id: input.class_id,
            }
            .into());
        };
        if !is_active {
            return Err(CoreError::Conflict("Class is not active".into()).into());
        }

        let (active_count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM reservations WHERE student_id = $1 AND status = 'confirmed'",
        )
        .bind(input.student_id)
        .fetch_one(&mut *tx)
        .await?;
        if active_count >= i64::from(MAX_ACTIVE_RESERVATIONS) {
            return Err(CoreError::ReservationLimitReached {
                max: MAX_ACTIVE_RESERVATIONS,
            }
            .into());
        }

        if occupied_seats >= capacity {
            return Err(CoreError::ClassFull.into());
        }

        let (duplicate,): (bool,) = sqlx::query_as(
            "SELECT EXISTS (
                SELECT 1 FROM reservations
                WHERE student_id = $1 AND class_id = $2 AND occurrence_at = $3
                  AND status = 'confirmed'
             )",
        )
        .bind(input.student_id)
        .bind(input.class_id)
        .bind(input.occurrence_at)
        .fetch_one(&mut *tx)
        .await?;
        if duplicate {
            return Err(CoreError::DuplicateReservation.into());
        }

        let insert = format!(
            "INSERT INTO reservations (class_id, student_id, occurrence_at)
             VALUES ($1, $2, $3)
             RETURNING {COLUMNS}"
        );
        let reservation = sqlx::query_as::<_, Reservation>(&insert)
            .bind(input.class_id)
            .bind(input.student_id)
            .bind(input.occurrence_at)
            .fetch_one(&mut *tx)
            .await?;

        sqlx::query(
            "UPDATE classes SET occupied_seats = occupied_seats + 1, updated_at = NOW()
             WHERE id = $1",
        )
        .bind(input.class_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(reservation)
    }

    /// Cancel a reservation, enforcing the lead-time window.
    ///
    /// Cancelling an already-cancelled reservation is a no-op that returns
    /// the stored row; the seat counter is decremented only when the prior
    /// status was `confirmed`, so redundant calls cannot double-decrement.
    pub async fn cancel(
        pool: &PgPool,
        id: DbId,
        reason: Option<&str>,
        now: Timestamp,
    ) -> Result<Reservation, RepoError> {
        Self::cancel_inner(pool, id, reason, Some(now)).await
    }

    /// Cancel without the lead-time gate.
    ///
    /// For admin-initiated cancellations; student-facing callers go through
    /// [`Self::cancel`].
    pub async fn cancel_unrestricted(
        pool: &PgPool,
        id: DbId,
        reason: Option<&str>,
    ) -> Result<Reservation, RepoError> {
        Self::cancel_inner(pool, id, reason, None).await
    }

    async fn cancel_inner(
        pool: &PgPool,
        id: DbId,
        reason: Option<&str>,
        lead_time_from: Option<Timestamp>,
    ) -> Result<Reservation, RepoError> {
        let mut tx = pool.begin().await?;

        let select = format!("SELECT {COLUMNS} FROM reservations WHERE id = $1 FOR UPDATE");
        let Some(reservation) = sqlx::query_as::<_, Reservation>(&select)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
        else {
            return Err(CoreError::NotFound {
                entity: "Reservation",
                id,
            }
            .into());
        };

        match parse_status(&reservation)? {
            // Idempotent: already cancelled, nothing to change and no
            // second decrement.
            ReservationStatus::Cancelled => return Ok(reservation),
            ReservationStatus::Confirmed => {}
            other => {
                return Err(CoreError::Conflict(format!(
                    "Cannot cancel a reservation marked {other}"
                ))
                .into());
            }
        }

        if let Some(now) = lead_time_from {
            if !schedule::can_cancel(reservation.occurrence_at, now) {
                return Err(CoreError::CancellationWindowClosed {
                    hours: CANCEL_LEAD_TIME_HOURS,
                }
                .into());
            }
        }

        let update = format!(
            "UPDATE reservations
             SET status = 'cancelled', cancelled_at = NOW(), cancellation_reason = $2
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        let cancelled = sqlx::query_as::<_, Reservation>(&update)
            .bind(id)
            .bind(reason.unwrap_or(DEFAULT_CANCEL_REASON))
            .fetch_one(&mut *tx)
            .await?;

        // Floors at 0; the prior-status check above already guarantees a
        // matching increment happened.
        sqlx::query(
            "UPDATE classes
             SET occupied_seats = GREATEST(occupied_seats - 1, 0), updated_at = NOW()
             WHERE id = $1",
        )
        .bind(reservation.class_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(cancelled)
    }

    /// Mark a confirmed reservation as `attended` or `absent`.
    ///
    /// Any other target status is rejected, as is any prior status other
    /// than `confirmed`. The seat counter is untouched: the seat was used.
    pub async fn mark_attendance(
        pool: &PgPool,
        id: DbId,
        status: ReservationStatus,
    ) -> Result<Reservation, RepoError> {
        if !matches!(
            status,
            ReservationStatus::Attended | ReservationStatus::Absent
        ) {
            return Err(CoreError::Validation(format!(
                "Attendance status must be attended or absent, got {status}"
            ))
            .into());
        }

        let mut tx = pool.begin().await?;

        let select = format!("SELECT {COLUMNS} FROM reservations WHERE id = $1 FOR UPDATE");
        let Some(reservation) = sqlx::query_as::<_, Reservation>(&select)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
        else {
            return Err(CoreError::NotFound {
                entity: "Reservation",
                id,
            }
            .into());
        };

        let current = parse_status(&reservation)?;
        booking::validate_transition(current, status).map_err(CoreError::Conflict)?;

        let update = format!(
            "UPDATE reservations SET status = $2 WHERE id = $1 RETURNING {COLUMNS}"
        );
        let updated = sqlx::query_as::<_, Reservation>(&update)
            .bind(id)
            .bind(status.as_str())
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(updated)
    }

    /// Find a reservation by internal ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Reservation>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM reservations WHERE id = $1");
        sqlx::query_as::<_, Reservation>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List reservations matching `filter`, most recent occurrence first.
    pub async fn list(
        pool: &PgPool,
        filter: &ReservationFilter,
    ) -> Result<Vec<Reservation>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM reservations
             WHERE ($1::bigint IS NULL OR student_id = $1)
               AND ($2::bigint IS NULL OR class_id = $2)
               AND ($3::text IS NULL OR status = $3)
             ORDER BY occurrence_at DESC, id DESC"
        );
        sqlx::query_as::<_, Reservation>(&query)
            .bind(filter.student_id)
            .bind(filter.class_id)
            .bind(filter.status.map(ReservationStatus::as_str))
            .fetch_all(pool)
            .await
    }

    /// Upcoming `confirmed` reservations for a student, soonest first.
    pub async fn list_active_for_student(
        pool: &PgPool,
        student_id: DbId,
    ) -> Result<Vec<Reservation>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM reservations
             WHERE student_id = $1 AND status = 'confirmed'
             ORDER BY occurrence_at ASC, id ASC"
        );
        sqlx::query_as::<_, Reservation>(&query)
            .bind(student_id)
            .fetch_all(pool)
            .await
    }

    /// Settled reservations (cancelled / attended / absent) for a student,
    /// newest occurrence first, capped at `limit` rows.
    pub async fn list_history_for_student(
        pool: &PgPool,
        student_id: DbId,
        limit: i64,
    ) -> Result<Vec<Reservation>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM reservations
             WHERE student_id = $1 AND status IN ('cancelled', 'attended', 'absent')
             ORDER BY occurrence_at DESC, id DESC
             LIMIT $2"
        );
        sqlx::query_as::<_, Reservation>(&query)
            .bind(student_id)
            .bind(limit)
            .fetch_all(pool)
            .await
    }

    /// Roster for one concrete class occurrence: everyone who booked and
    /// did not cancel, in booking order.
    pub async fn list_roster(
        pool: &PgPool,
        class_id: DbId,
        occurrence_at: Timestamp,
    ) -> Result<Vec<Reservation>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM reservations
             WHERE class_id = $1 AND occurrence_at = $2
               AND status IN ('confirmed', 'attended', 'absent')
             ORDER BY created_at ASC, id ASC"
        );
        sqlx::query_as::<_, Reservation>(&query)
            .bind(class_id)
            .bind(occurrence_at)
            .fetch_all(pool)
            .await
    }

    /// Per-status reservation counts for one student.
    pub async fn count_by_status(
        pool: &PgPool,
        student_id: DbId,
    ) -> Result<ReservationCounts, sqlx::Error> {
        let (confirmed, cancelled, attended, absent): (i64, i64, i64, i64) = sqlx::query_as(
            "SELECT
                COUNT(*) FILTER (WHERE status = 'confirmed'),
                COUNT(*) FILTER (WHERE status = 'cancelled'),
                COUNT(*) FILTER (WHERE status = 'attended'),
                COUNT(*) FILTER (WHERE status = 'absent')
             FROM reservations WHERE student_id = $1",
        )
        .bind(student_id)
        .fetch_one(pool)
        .await?;

        Ok(ReservationCounts {
            total: confirmed + cancelled + attended + absent,
            confirmed,
            cancelled,
            attended,
            absent,
        })
    }

    /// Attended share of a student's completed occurrences, as a rounded
    /// percentage (0 when nothing is settled yet).
    pub async fn attendance_rate_for_student(
        pool: &PgPool,
        student_id: DbId,
    ) -> Result<u32, sqlx::Error> {
        let counts = Self::count_by_status(pool, student_id).await?;
        Ok(booking::attendance_rate(counts.attended, counts.absent))
    }
}

/// Parse the stored status string, surfacing schema drift as an internal
/// error instead of panicking.
fn parse_status(reservation: &Reservation) -> Result<ReservationStatus, CoreError> {
    ReservationStatus::parse(&reservation.status).ok_or_else(|| {
        CoreError::Internal(format!(
            "unknown reservation status: {}",
            reservation.status
        ))
    })
}
