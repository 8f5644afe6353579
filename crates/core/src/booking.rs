//! Reservation lifecycle: status codes, the transition table, and
//! attendance-rate math.
//!
//! The state machine lives here (zero internal deps) so both the
//! repository layer and any future tooling share one transition table.

use serde::{Deserialize, Serialize};

/// Status of a reservation.
///
/// `Confirmed` is the only state with exits; the other three are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReservationStatus {
    Confirmed,
    Cancelled,
    Attended,
    Absent,
}

impl ReservationStatus {
    /// Terminal statuses that make up a student's history view.
    pub const HISTORY: [ReservationStatus; 3] = [
        ReservationStatus::Cancelled,
        ReservationStatus::Attended,
        ReservationStatus::Absent,
    ];

    /// Stored string code, matching the `reservations.status` CHECK
    /// constraint.
    pub fn as_str(self) -> &'static str {
        match self {
            ReservationStatus::Confirmed => "confirmed",
            ReservationStatus::Cancelled => "cancelled",
            ReservationStatus::Attended => "attended",
            ReservationStatus::Absent => "absent",
        }
    }

    /// Parse a stored string code.
    pub fn parse(code: &str) -> Option<ReservationStatus> {
        match code {
            "confirmed" => Some(ReservationStatus::Confirmed),
            "cancelled" => Some(ReservationStatus::Cancelled),
            "attended" => Some(ReservationStatus::Attended),
            "absent" => Some(ReservationStatus::Absent),
            _ => None,
        }
    }
}

impl std::fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Valid target statuses reachable from `from`.
///
/// Terminal states return an empty slice: there is no way back out of
/// `cancelled`, `attended`, or `absent`.
pub fn valid_transitions(from: ReservationStatus) -> &'static [ReservationStatus] {
    match from {
        ReservationStatus::Confirmed => &[
            ReservationStatus::Cancelled,
            ReservationStatus::Attended,
            ReservationStatus::Absent,
        ],
        _ => &[],
    }
}

/// Check whether a transition from `from` to `to` is valid.
pub fn can_transition(from: ReservationStatus, to: ReservationStatus) -> bool {
    valid_transitions(from).contains(&to)
}

/// Validate a status transition, returning an error message for invalid ones.
pub fn validate_transition(from: ReservationStatus, to: ReservationStatus) -> Result<(), String> {
    if can_transition(from, to) {
        Ok(())
    } else {
        Err(format!("Invalid reservation transition: {from} -> {to}"))
    }
}

/// Attended share of completed occurrences as a rounded percentage.
///
/// Defined as 0 when nothing has been attended or missed yet.
pub fn attendance_rate(attended: i64, absent: i64) -> u32 {
    let total = attended + absent;
    if total <= 0 {
        return 0;
    }
    ((attended as f64 / total as f64) * 100.0).round() as u32
}
