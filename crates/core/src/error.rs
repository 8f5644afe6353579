use crate::types::DbId;

/// Domain error taxonomy.
///
/// The four booking-specific variants are precondition failures from the
/// reservation adapter; they are always recoverable by the user choosing a
/// different action and map to specific HTTP codes in the API layer.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: DbId },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Class is full")]
    ClassFull,

    #[error("Active reservation limit of {max} reached")]
    ReservationLimitReached { max: u32 },

    #[error("A confirmed reservation already exists for this class occurrence")]
    DuplicateReservation,

    #[error("Reservations can only be cancelled at least {hours} hours before the class")]
    CancellationWindowClosed { hours: i64 },

    #[error("Internal error: {0}")]
    Internal(String),
}
