//! Reservation entity model and DTOs.

use gymclass_core::booking::ReservationStatus;
use gymclass_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A reservation row: one student's booking of one concrete class
/// occurrence. Rows are never physically deleted by the lifecycle;
/// `status` carries the state.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Reservation {
    pub id: DbId,
    pub class_id: DbId,
    pub student_id: DbId,
    pub occurrence_at: Timestamp,
    /// One of `confirmed`, `cancelled`, `attended`, `absent` (enforced by
    /// the table CHECK constraint).
    pub status: String,
    pub cancelled_at: Option<Timestamp>,
    pub cancellation_reason: Option<String>,
    pub created_at: Timestamp,
}

/// DTO for booking a seat.
#[derive(Debug)]
pub struct CreateReservation {
    pub class_id: DbId,
    pub student_id: DbId,
    pub occurrence_at: Timestamp,
}

/// Filters for listing reservations. `None` fields match everything.
#[derive(Debug, Default)]
pub struct ReservationFilter {
    pub student_id: Option<DbId>,
    pub class_id: Option<DbId>,
    pub status: Option<ReservationStatus>,
}

/// Per-status reservation counts for one student.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ReservationCounts {
    pub total: i64,
    pub confirmed: i64,
    pub cancelled: i64,
    pub attended: i64,
    pub absent: i64,
}
