pub mod gym_class;
pub mod reservation;
pub mod role;
pub mod session;
pub mod user;
