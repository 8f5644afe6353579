pub mod admin;
pub mod auth;
pub mod classes;
pub mod me;
pub mod reservations;
