//! Calendar helpers for recurring weekly class slots.
//!
//! All functions take the evaluation instant explicitly instead of reading
//! the clock, so the cancellation window and next-occurrence rules stay
//! deterministic under test.

use chrono::{Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Utc};

use crate::rules;
use crate::types::Timestamp;
use crate::validation::fields;

/// Day of the week, Sunday = 0 .. Saturday = 6.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Weekday {
    Sunday = 0,
    Monday = 1,
    Tuesday = 2,
    Wednesday = 3,
    Thursday = 4,
    Friday = 5,
    Saturday = 6,
}

impl Weekday {
    /// All days in index order (Sunday first).
    pub const ALL: [Weekday; 7] = [
        Weekday::Sunday,
        Weekday::Monday,
        Weekday::Tuesday,
        Weekday::Wednesday,
        Weekday::Thursday,
        Weekday::Friday,
        Weekday::Saturday,
    ];

    /// Map a stored index (0-6, Sunday = 0) back to a day.
    pub fn from_index(index: i16) -> Option<Weekday> {
        match index {
            0 => Some(Weekday::Sunday),
            1 => Some(Weekday::Monday),
            2 => Some(Weekday::Tuesday),
            3 => Some(Weekday::Wednesday),
            4 => Some(Weekday::Thursday),
            5 => Some(Weekday::Friday),
            6 => Some(Weekday::Saturday),
            _ => None,
        }
    }

    /// Stored index, Sunday = 0 .. Saturday = 6.
    pub fn index(self) -> i16 {
        self as i16
    }

    /// Canonical display name.
    pub fn name(self) -> &'static str {
        match self {
            Weekday::Sunday => "Sunday",
            Weekday::Monday => "Monday",
            Weekday::Tuesday => "Tuesday",
            Weekday::Wednesday => "Wednesday",
            Weekday::Thursday => "Thursday",
            Weekday::Friday => "Friday",
            Weekday::Saturday => "Saturday",
        }
    }

    /// Calendar ordering rank: Monday = 0 .. Sunday = 6. Class listings
    /// sort by this rank, then by start time.
    pub fn monday_first_rank(self) -> u8 {
        (self.index() as u8 + 6) % 7
    }

    fn from_chrono(day: chrono::Weekday) -> Weekday {
        match day {
            chrono::Weekday::Sun => Weekday::Sunday,
            chrono::Weekday::Mon => Weekday::Monday,
            chrono::Weekday::Tue => Weekday::Tuesday,
            chrono::Weekday::Wed => Weekday::Wednesday,
            chrono::Weekday::Thu => Weekday::Thursday,
            chrono::Weekday::Fri => Weekday::Friday,
            chrono::Weekday::Sat => Weekday::Saturday,
        }
    }
}

impl std::fmt::Display for Weekday {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Parse a strict `HH:mm` string into a time of day.
pub fn parse_time(time: &str) -> Option<NaiveTime> {
    if !fields::is_valid_time_format(time) {
        return None;
    }
    NaiveTime::parse_from_str(time, "%H:%M").ok()
}

/// Merge a calendar date with a time of day into one UTC instant.
pub fn combine_date_and_time(date: NaiveDate, time: NaiveTime) -> Timestamp {
    Utc.from_utc_datetime(&date.and_time(time))
}

/// Whether a reservation for `occurrence` may still be cancelled at `now`.
///
/// The inequality is closed: exactly [`rules::CANCEL_LEAD_TIME_HOURS`]
/// ahead is still cancellable; one second less is not.
pub fn can_cancel(occurrence: Timestamp, now: Timestamp) -> bool {
    occurrence.signed_duration_since(now) >= Duration::hours(rules::CANCEL_LEAD_TIME_HOURS)
}

/// Whole hours from `now` until `occurrence` (negative once it has passed).
pub fn hours_until(occurrence: Timestamp, now: Timestamp) -> i64 {
    occurrence.signed_duration_since(now).num_hours()
}

/// Whole minutes from `now` until `occurrence` (negative once it has passed).
pub fn minutes_until(occurrence: Timestamp, now: Timestamp) -> i64 {
    occurrence.signed_duration_since(now).num_minutes()
}

/// The next occurrence of a weekly slot at or after `now`.
///
/// When `now` falls on the target weekday and the start time is still
/// ahead, the occurrence is today; otherwise it is the matching day of the
/// following week. An occurrence exactly at `now` counts as already started.
pub fn next_occurrence(weekday: Weekday, time: NaiveTime, now: Timestamp) -> Timestamp {
    let today = now.date_naive();
    let today_weekday = Weekday::from_chrono(today.weekday());
    let days_ahead = i64::from(weekday.index() - today_weekday.index()).rem_euclid(7);

    let candidate = combine_date_and_time(today + Duration::days(days_ahead), time);
    if candidate > now {
        candidate
    } else {
        candidate + Duration::days(7)
    }
}

/// Format a date as `dd/MM/yyyy`.
pub fn format_date(date: NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}

/// Collapse `today`/`tomorrow` to literal words, else `dd/MM/yyyy`.
pub fn format_relative_date(date: NaiveDate, today: NaiveDate) -> String {
    if date == today {
        "Today".to_string()
    } else if date == today + Duration::days(1) {
        "Tomorrow".to_string()
    } else {
        format_date(date)
    }
}

/// Human-readable duration: `45min`, `1h`, `1h 30min`.
pub fn format_duration(minutes: i32) -> String {
    if minutes < 60 {
        return format!("{minutes}min");
    }

    let hours = minutes / 60;
    let remaining = minutes % 60;

    if remaining == 0 {
        format!("{hours}h")
    } else {
        format!("{hours}h {remaining}min")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;

    fn instant(s: &str) -> Timestamp {
        let naive = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap();
        Utc.from_utc_datetime(&naive)
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn time(s: &str) -> NaiveTime {
        parse_time(s).unwrap()
    }

    #[test]
    fn weekday_round_trips_through_index() {
        for day in Weekday::ALL {
            assert_eq!(Weekday::from_index(day.index()), Some(day));
        }
        assert_eq!(Weekday::from_index(7), None);
        assert_eq!(Weekday::from_index(-1), None);
    }

    #[test]
    fn monday_first_rank_puts_sunday_last() {
        assert_eq!(Weekday::Monday.monday_first_rank(), 0);
        assert_eq!(Weekday::Saturday.monday_first_rank(), 5);
        assert_eq!(Weekday::Sunday.monday_first_rank(), 6);
    }

    #[test]
    fn parse_time_is_strict() {
        assert_eq!(time("06:30"), NaiveTime::from_hms_opt(6, 30, 0).unwrap());
        assert!(parse_time("6:30").is_none());
        assert!(parse_time("24:00").is_none());
    }

    #[test]
    fn cancel_window_boundary_is_closed() {
        let occurrence = instant("2026-03-02 18:00:00");

        // Exactly two hours ahead: still cancellable.
        assert!(can_cancel(occurrence, instant("2026-03-02 16:00:00")));
        // One second inside the window: not cancellable.
        assert!(!can_cancel(occurrence, instant("2026-03-02 16:00:01")));
        // After the class has started: not cancellable.
        assert!(!can_cancel(occurrence, instant("2026-03-02 19:00:00")));
    }

    #[test]
    fn hours_and_minutes_until() {
        let occurrence = instant("2026-03-02 18:00:00");
        let now = instant("2026-03-02 15:30:00");
        assert_eq!(hours_until(occurrence, now), 2);
        assert_eq!(minutes_until(occurrence, now), 150);
        assert_eq!(hours_until(now, occurrence), -2);
    }

    // 2026-03-02 is a Monday.

    #[test]
    fn next_occurrence_same_day_before_start_is_today() {
        let now = instant("2026-03-02 10:00:00");
        let next = next_occurrence(Weekday::Monday, time("18:00"), now);
        assert_eq!(next, instant("2026-03-02 18:00:00"));
    }

    #[test]
    fn next_occurrence_same_day_after_start_skips_a_week() {
        let now = instant("2026-03-02 19:00:00");
        let next = next_occurrence(Weekday::Monday, time("18:00"), now);
        assert_eq!(next, instant("2026-03-09 18:00:00"));
    }

    #[test]
    fn next_occurrence_exactly_at_start_skips_a_week() {
        let now = instant("2026-03-02 18:00:00");
        let next = next_occurrence(Weekday::Monday, time("18:00"), now);
        assert_eq!(next, instant("2026-03-09 18:00:00"));
    }

    #[test]
    fn next_occurrence_later_in_week() {
        let now = instant("2026-03-02 10:00:00");
        let next = next_occurrence(Weekday::Thursday, time("07:00"), now);
        assert_eq!(next, instant("2026-03-05 07:00:00"));
    }

    #[test]
    fn next_occurrence_wraps_to_next_week() {
        // Sunday is behind Monday in index order but ahead in the week.
        let now = instant("2026-03-02 10:00:00");
        let next = next_occurrence(Weekday::Sunday, time("09:00"), now);
        assert_eq!(next, instant("2026-03-08 09:00:00"));
    }

    #[test]
    fn relative_dates_collapse_today_and_tomorrow() {
        let today = date("2026-03-02");
        assert_eq!(format_relative_date(date("2026-03-02"), today), "Today");
        assert_eq!(format_relative_date(date("2026-03-03"), today), "Tomorrow");
        assert_eq!(
            format_relative_date(date("2026-03-10"), today),
            "10/03/2026"
        );
    }

    #[test]
    fn duration_formatting() {
        assert_eq!(format_duration(45), "45min");
        assert_eq!(format_duration(60), "1h");
        assert_eq!(format_duration(90), "1h 30min");
        assert_eq!(format_duration(180), "3h");
    }
}
