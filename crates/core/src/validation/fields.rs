//! Pure field-level predicates. No side effects, no I/O; bounds come from
//! [`crate::rules`].

use std::sync::LazyLock;

use regex::Regex;

use crate::rules;

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email regex compiles"));

static TIME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([01]\d|2[0-3]):[0-5]\d$").expect("time regex compiles"));

/// `local@domain.tld` shape with no whitespace. Intentionally permissive;
/// deliverability is not checked here.
pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

/// Baseline password rule: at least 6 characters.
pub fn is_valid_password(password: &str) -> bool {
    password.chars().count() >= rules::MIN_PASSWORD_LENGTH
}

/// Strong password rule: at least 8 characters with lower case, upper case,
/// and a digit.
pub fn is_strong_password(password: &str) -> bool {
    password.chars().count() >= rules::STRONG_PASSWORD_LENGTH
        && password.chars().any(|c| c.is_ascii_lowercase())
        && password.chars().any(|c| c.is_ascii_uppercase())
        && password.chars().any(|c| c.is_ascii_digit())
}

/// Password strength score from 0 (weakest) to 5.
pub fn password_strength(password: &str) -> u8 {
    let len = password.chars().count();
    let mut strength = 0;

    if len >= rules::MIN_PASSWORD_LENGTH {
        strength += 1;
    }
    if len >= rules::STRONG_PASSWORD_LENGTH {
        strength += 1;
    }
    if password.chars().any(|c| c.is_ascii_uppercase()) {
        strength += 1;
    }
    if password.chars().any(|c| c.is_ascii_digit()) {
        strength += 1;
    }
    if password.chars().any(|c| !c.is_alphanumeric()) {
        strength += 1;
    }

    strength
}

/// Display name: at least 3 characters after trimming, letters (accented
/// included) and spaces only.
pub fn is_valid_name(name: &str) -> bool {
    let trimmed = name.trim();
    trimmed.chars().count() >= rules::MIN_NAME_LENGTH
        && trimmed.chars().all(|c| c.is_alphabetic() || c.is_whitespace())
}

/// Strict `HH:mm`: two-digit hours 00-23, two-digit minutes 00-59.
pub fn is_valid_time_format(time: &str) -> bool {
    TIME_RE.is_match(time)
}

/// Valid `HH:mm` time whose hour falls inside gym business hours
/// (inclusive on both ends).
pub fn is_within_business_hours(time: &str) -> bool {
    if !is_valid_time_format(time) {
        return false;
    }
    // The regex guarantees two ASCII digits before the colon.
    let hour: u32 = time[..2].parse().unwrap_or(u32::MAX);
    (rules::OPENING_HOUR..=rules::CLOSING_HOUR).contains(&hour)
}

/// Class capacity in seats, inclusive bounds.
pub fn is_valid_class_capacity(capacity: i32) -> bool {
    (rules::MIN_CLASS_CAPACITY..=rules::MAX_CLASS_CAPACITY).contains(&capacity)
}

/// Class duration in minutes, inclusive bounds.
pub fn is_valid_class_duration(duration: i32) -> bool {
    (rules::MIN_CLASS_DURATION_MINUTES..=rules::MAX_CLASS_DURATION_MINUTES).contains(&duration)
}
