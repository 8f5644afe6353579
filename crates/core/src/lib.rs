//! Pure domain logic for the gymclass backend.
//!
//! This crate has zero internal deps and no I/O so the booking rules stay
//! independently testable: shared type aliases, the domain error taxonomy,
//! role and business-rule constants, field/form validation, calendar
//! helpers, and the reservation status state machine.

pub mod booking;
pub mod error;
pub mod roles;
pub mod rules;
pub mod schedule;
pub mod types;
pub mod validation;
