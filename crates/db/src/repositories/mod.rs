//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that
//! accept `&PgPool` as the first argument.

pub mod class_repo;
pub mod reservation_repo;
pub mod role_repo;
pub mod session_repo;
pub mod user_repo;

pub use class_repo::ClassRepo;
pub use reservation_repo::ReservationRepo;
pub use role_repo::RoleRepo;
pub use session_repo::SessionRepo;
pub use user_repo::UserRepo;
