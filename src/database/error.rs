//! Typed errors for database operations.
//!
//! Every driver, the factory, and the registry report failures through
//! [`DriverError`]. Raw `sqlx` errors are classified on the way out so that
//! callers can distinguish connectivity problems from constraint violations
//! without inspecting backend-specific error codes.

use thiserror::Error;

/// Errors surfaced by drivers and the services built on top of them.
#[derive(Debug, Error)]
pub enum DriverError {
    /// The backend could not be reached or opened (bad host, bad credentials,
    /// missing or invalid database file).
    #[error("connection failed: {0}")]
    Connection(String),

    /// A table or column does not exist.
    #[error("schema error: {0}")]
    Schema(String),

    /// A uniqueness, foreign-key, not-null, or check violation on write.
    #[error("constraint violation: {0}")]
    Constraint(String),

    /// Malformed caller input: empty batch, inconsistent record keys,
    /// configuration that does not match the database kind.
    #[error("invalid input: {0}")]
    Validation(String),

    /// The statement failed to execute for any other reason.
    #[error("query failed: {0}")]
    Query(String),
}

impl DriverError {
    /// Error used by all drivers when a data operation is attempted before
    /// `connect()` or after `close()`.
    pub(crate) fn not_connected() -> Self {
        Self::Connection("database not connected".to_string())
    }
}

/// Crate-wide result alias.
pub type Result<T, E = DriverError> = std::result::Result<T, E>;

impl From<sqlx::Error> for DriverError {
    fn from(err: sqlx::Error) -> Self {
        use sqlx::error::ErrorKind;

        match &err {
            sqlx::Error::Database(db) => match db.kind() {
                ErrorKind::UniqueViolation
                | ErrorKind::ForeignKeyViolation
                | ErrorKind::NotNullViolation
                | ErrorKind::CheckViolation => Self::Constraint(db.message().to_string()),
                _ => Self::Query(db.message().to_string()),
            },
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::Configuration(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed => Self::Connection(err.to_string()),
            _ => Self::Query(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DriverError::Connection("refused".to_string());
        assert_eq!(err.to_string(), "connection failed: refused");

        let err = DriverError::Validation("rows must not be empty".to_string());
        assert_eq!(err.to_string(), "invalid input: rows must not be empty");
    }

    #[test]
    fn test_not_connected() {
        let err = DriverError::not_connected();
        assert!(matches!(err, DriverError::Connection(_)));
        assert!(err.to_string().contains("not connected"));
    }

    #[test]
    fn test_pool_errors_classify_as_connection() {
        let err: DriverError = sqlx::Error::PoolClosed.into();
        assert!(matches!(err, DriverError::Connection(_)));

        let err: DriverError = sqlx::Error::PoolTimedOut.into();
        assert!(matches!(err, DriverError::Connection(_)));
    }

    #[test]
    fn test_row_not_found_classifies_as_query() {
        let err: DriverError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, DriverError::Query(_)));
    }
}
