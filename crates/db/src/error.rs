use gymclass_core::error::CoreError;

/// Failure from a rule-enforcing repository operation: either a domain
/// precondition reported as [`CoreError`], or a database failure.
///
/// Plain CRUD methods return `sqlx::Error` directly; only the reservation
/// lifecycle operations need the combined type.
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}
