//! Business-rule constants shared by validation, the reservation adapter,
//! and the HTTP layer.

/// Maximum simultaneous `confirmed` reservations per student, system-wide.
pub const MAX_ACTIVE_RESERVATIONS: u32 = 3;

/// Minimum hours before a class occurrence at which cancellation is still
/// allowed. The boundary is inclusive: exactly this far ahead is cancellable.
pub const CANCEL_LEAD_TIME_HOURS: i64 = 2;

/// Class duration bounds in minutes.
pub const MIN_CLASS_DURATION_MINUTES: i32 = 30;
pub const MAX_CLASS_DURATION_MINUTES: i32 = 180;

/// Class capacity bounds in seats.
pub const MIN_CLASS_CAPACITY: i32 = 1;
pub const MAX_CLASS_CAPACITY: i32 = 50;

/// Gym business hours: a class may start at any hour in this inclusive range.
pub const OPENING_HOUR: u32 = 6;
pub const CLOSING_HOUR: u32 = 23;

/// Password length floors: the baseline rule and the strong variant.
pub const MIN_PASSWORD_LENGTH: usize = 6;
pub const STRONG_PASSWORD_LENGTH: usize = 8;

/// Minimum display-name length after trimming.
pub const MIN_NAME_LENGTH: usize = 3;

/// Default number of rows returned by reservation history listings.
pub const HISTORY_DEFAULT_LIMIT: i64 = 10;
