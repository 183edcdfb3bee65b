use thiserror::Error;
use tracing::error;

/// Failure to obtain a usable database connection
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("Failed to open database: {0}")]
    Open(#[source] sqlx::Error),

    #[error("Failed to acquire a database connection: {0}")]
    Acquire(#[source] sqlx::Error),

    #[error("Failed to set up database schema: {0}")]
    Schema(#[source] sqlx::Error),
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    /// A multi-statement operation failed and none of its effects were kept
    #[error("{operation} was rolled back: {source}")]
    RolledBack {
        operation: &'static str,
        #[source]
        source: sqlx::Error,
    },

    #[error("Database error: {0}")]
    Sql(#[from] sqlx::Error),

    /// A stored value could not be mapped back onto a model
    #[error("Invalid value in column {column}: {value}")]
    Decode { column: &'static str, value: String },
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Collapse a statement-level fault into the operation's fallback result.
///
/// The fault is logged with the operation name; the caller sees the same
/// outcome as "not found" or "nothing changed".
pub(crate) fn degrade<T, E>(operation: &'static str, result: Result<T, E>, fallback: T) -> T
where
    E: std::fmt::Display,
{
    match result {
        Ok(value) => value,
        Err(e) => {
            error!(operation, error = %e, "Storage operation failed");
            fallback
        }
    }
}
