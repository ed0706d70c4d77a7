//! Error types shared across the service

use sqlx::Error as SqlxError;
use thiserror::Error;

/// Failures raised by the persistence layer
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Error occurred while establishing a database connection
    #[error("database connection error: {0}")]
    Connection(#[source] SqlxError),

    /// Error occurred while executing a query
    #[error("database query error: {0}")]
    Query(#[source] SqlxError),

    /// Bad or missing configuration
    #[error("database configuration error: {0}")]
    Configuration(String),
}

/// Type alias for Result with DatabaseError
pub type DatabaseResult<T> = Result<T, DatabaseError>;
