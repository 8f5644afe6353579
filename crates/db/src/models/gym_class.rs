//! Class entity model and DTOs.

use chrono::NaiveTime;
use gymclass_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A recurring weekly class slot from the `classes` table.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct GymClass {
    pub id: DbId,
    pub modality: String,
    pub instructor_id: DbId,
    /// Day of the week, Sunday = 0 .. Saturday = 6.
    pub weekday: i16,
    pub start_time: NaiveTime,
    pub duration_minutes: i32,
    pub capacity: i32,
    /// Denormalized count of this class's `confirmed` reservations.
    /// Written only inside `ReservationRepo` transactions.
    pub occupied_seats: i32,
    pub is_active: bool,
    pub description: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl GymClass {
    /// Seats still available for booking.
    pub fn seats_left(&self) -> i32 {
        self.capacity - self.occupied_seats
    }
}

/// DTO for creating a class. `occupied_seats` always starts at 0.
#[derive(Debug)]
pub struct CreateGymClass {
    pub modality: String,
    pub instructor_id: DbId,
    pub weekday: i16,
    pub start_time: NaiveTime,
    pub duration_minutes: i32,
    pub capacity: i32,
    pub description: Option<String>,
}

/// DTO for updating a class. Only non-`None` fields are applied.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateGymClass {
    pub modality: Option<String>,
    pub instructor_id: Option<DbId>,
    pub weekday: Option<i16>,
    pub start_time: Option<NaiveTime>,
    pub duration_minutes: Option<i32>,
    pub capacity: Option<i32>,
    pub description: Option<String>,
}

/// Filters for listing classes. `None` fields match everything.
#[derive(Debug, Default)]
pub struct ClassFilter {
    pub modality: Option<String>,
    pub instructor_id: Option<DbId>,
    pub weekday: Option<i16>,
    pub is_active: Option<bool>,
}
