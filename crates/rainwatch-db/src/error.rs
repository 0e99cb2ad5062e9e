//! Error types for the storage layer.

use rainwatch_core::StoreError;

/// Errors that can occur in the storage layer.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// A `PostgreSQL` operation failed.
    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] sqlx::Error),

    /// A configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// An episode duration does not fit the `BIGINT` column.
    #[error("duration {0} exceeds column range")]
    DurationOutOfRange(u64),
}

impl From<DbError> for StoreError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::DurationOutOfRange(_) => Self::InvalidRecord(err.to_string()),
            DbError::Postgres(_) | DbError::Config(_) => Self::Backend(err.to_string()),
        }
    }
}
