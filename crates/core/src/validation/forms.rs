//! Composite form validators.
//!
//! Each validator runs every applicable field check and collects the
//! failures into a [`ValidationReport`]; nothing short-circuits. Message
//! order follows field order on the form, so the report renders stably.

use serde::Serialize;

use super::fields;
use crate::rules;

/// A single field-level validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: &'static str,
}

/// Aggregated result of validating one form.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<FieldError>,
}

impl ValidationReport {
    fn from_errors(errors: Vec<FieldError>) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
        }
    }

    /// Collapse the report into one human-readable line.
    pub fn message(&self) -> String {
        self.errors
            .iter()
            .map(|e| e.message)
            .collect::<Vec<_>>()
            .join("; ")
    }
}

fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

/// Login form: email + password.
pub fn validate_login(email: &str, password: &str) -> ValidationReport {
    let mut errors = Vec::new();

    if is_blank(email) {
        errors.push(FieldError {
            field: "email",
            message: "Email is required",
        });
    } else if !fields::is_valid_email(email) {
        errors.push(FieldError {
            field: "email",
            message: "Invalid email",
        });
    }

    if is_blank(password) {
        errors.push(FieldError {
            field: "password",
            message: "Password is required",
        });
    } else if !fields::is_valid_password(password) {
        errors.push(FieldError {
            field: "password",
            message: "Password must be at least 6 characters",
        });
    }

    ValidationReport::from_errors(errors)
}

/// Registration form: name + email + password + confirmation.
pub fn validate_registration(
    name: &str,
    email: &str,
    password: &str,
    confirm_password: &str,
) -> ValidationReport {
    let mut errors = Vec::new();

    if is_blank(name) {
        errors.push(FieldError {
            field: "name",
            message: "Name is required",
        });
    } else if !fields::is_valid_name(name) {
        errors.push(FieldError {
            field: "name",
            message: "Name must be at least 3 characters and contain only letters",
        });
    }

    if is_blank(email) {
        errors.push(FieldError {
            field: "email",
            message: "Email is required",
        });
    } else if !fields::is_valid_email(email) {
        errors.push(FieldError {
            field: "email",
            message: "Invalid email",
        });
    }

    if is_blank(password) {
        errors.push(FieldError {
            field: "password",
            message: "Password is required",
        });
    } else if !fields::is_valid_password(password) {
        errors.push(FieldError {
            field: "password",
            message: "Password must be at least 6 characters",
        });
    }

    if password != confirm_password {
        errors.push(FieldError {
            field: "confirm_password",
            message: "Passwords do not match",
        });
    }

    ValidationReport::from_errors(errors)
}

/// Class creation/edit form: modality + start time + duration + capacity.
pub fn validate_class_form(
    modality: &str,
    start_time: &str,
    duration_minutes: i32,
    capacity: i32,
) -> ValidationReport {
    let mut errors = Vec::new();

    if is_blank(modality) {
        errors.push(FieldError {
            field: "modality",
            message: "Modality is required",
        });
    }

    if is_blank(start_time) {
        errors.push(FieldError {
            field: "start_time",
            message: "Start time is required",
        });
    } else if !fields::is_valid_time_format(start_time) {
        errors.push(FieldError {
            field: "start_time",
            message: "Start time must be in HH:mm format",
        });
    } else if !fields::is_within_business_hours(start_time) {
        errors.push(FieldError {
            field: "start_time",
            message: "Start time must be between 06:00 and 23:00",
        });
    }

    if !fields::is_valid_class_duration(duration_minutes) {
        errors.push(FieldError {
            field: "duration_minutes",
            message: "Duration must be between 30 and 180 minutes",
        });
    }

    if !fields::is_valid_class_capacity(capacity) {
        errors.push(FieldError {
            field: "capacity",
            message: "Capacity must be between 1 and 50 seats",
        });
    }

    ValidationReport::from_errors(errors)
}

/// Profile edit form: name + email.
pub fn validate_profile(name: &str, email: &str) -> ValidationReport {
    let mut errors = Vec::new();

    if is_blank(name) {
        errors.push(FieldError {
            field: "name",
            message: "Name is required",
        });
    } else if !fields::is_valid_name(name) {
        errors.push(FieldError {
            field: "name",
            message: "Name must be at least 3 characters and contain only letters",
        });
    }

    if is_blank(email) {
        errors.push(FieldError {
            field: "email",
            message: "Email is required",
        });
    } else if !fields::is_valid_email(email) {
        errors.push(FieldError {
            field: "email",
            message: "Invalid email",
        });
    }

    ValidationReport::from_errors(errors)
}

/// Password-change form: current + new + confirmation. The new password
/// must differ from the current one.
pub fn validate_password_change(
    current_password: &str,
    new_password: &str,
    confirm_password: &str,
) -> ValidationReport {
    let mut errors = Vec::new();

    if is_blank(current_password) {
        errors.push(FieldError {
            field: "current_password",
            message: "Current password is required",
        });
    }

    if is_blank(new_password) {
        errors.push(FieldError {
            field: "new_password",
            message: "New password is required",
        });
    } else if !fields::is_valid_password(new_password) {
        errors.push(FieldError {
            field: "new_password",
            message: "New password must be at least 6 characters",
        });
    }

    if new_password != confirm_password {
        errors.push(FieldError {
            field: "confirm_password",
            message: "Passwords do not match",
        });
    }

    if !is_blank(current_password) && current_password == new_password {
        errors.push(FieldError {
            field: "new_password",
            message: "New password must be different from the current password",
        });
    }

    ValidationReport::from_errors(errors)
}
