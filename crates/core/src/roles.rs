//! Well-known role name constants.
//!
//! These must match the seed data in `20260301000001_create_roles_table.sql`.

pub const ROLE_STUDENT: &str = "student";
pub const ROLE_INSTRUCTOR: &str = "instructor";
pub const ROLE_ADMIN: &str = "admin";
