//! Error types for the data layer.
//!
//! This module defines all error types using `thiserror` for ergonomic error handling.
//! The messages of [`DataError::NotInitialized`], [`DataError::EmptyQuery`] and
//! [`DataError::EmptyPage`] are stable and safe to match on programmatically.

use thiserror::Error;

/// Boxed error produced by caller code inside a unit of work.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub const NOT_INITIALIZED: &str = "database not initialized";
pub const EMPTY_QUERY: &str = "query is empty";
pub const EMPTY_PAGE: &str = "page is empty";

#[derive(Error, Debug)]
pub enum DataError {
    #[error("database not initialized")]
    NotInitialized,

    #[error("query is empty")]
    EmptyQuery,

    #[error("page is empty")]
    EmptyPage,

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Column count mismatch: record expects {expected} columns, row has {found}")]
    ColumnCount { expected: usize, found: usize },

    /// Driver failure, including row decode (scan) errors, propagated as-is.
    #[error("Database error: {source}")]
    Database {
        #[source]
        source: sqlx::Error,
    },

    #[error("could not start transaction: {source}")]
    Begin {
        #[source]
        source: sqlx::Error,
    },

    #[error("could not commit transaction: {source}")]
    Commit {
        #[source]
        source: sqlx::Error,
    },

    /// The rollback that followed a failed unit of work failed as well.
    #[error("could not rollback transaction: {source} (rollback triggered by: {cause})")]
    Rollback {
        cause: Box<DataError>,
        #[source]
        source: sqlx::Error,
    },

    #[error("transaction is no longer active")]
    TransactionClosed,

    #[error("Unit of work aborted: {source}")]
    Aborted {
        #[source]
        source: BoxError,
    },

    #[error("Timeout: {operation} exceeded the context deadline")]
    Timeout { operation: String },

    #[error("Connection failed: {message}")]
    Connection { message: String, suggestion: String },

    #[error("Migration failed: {message}")]
    Migration { message: String },

    #[error("cache not initialized")]
    CacheNotInitialized,

    #[error("cache name is empty")]
    EmptyCacheName,

    #[error("cache miss: {key}")]
    CacheMiss { key: String },

    #[error("Cache error: {message}")]
    Cache { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl DataError {
    /// Create an invalid input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Create a connection error with a helpful suggestion.
    pub fn connection(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Create a timeout error.
    pub fn timeout(operation: impl Into<String>) -> Self {
        Self::Timeout {
            operation: operation.into(),
        }
    }

    /// Create a migration error.
    pub fn migration(message: impl Into<String>) -> Self {
        Self::Migration {
            message: message.into(),
        }
    }

    /// Create a cache store error.
    pub fn cache(message: impl Into<String>) -> Self {
        Self::Cache {
            message: message.into(),
        }
    }

    /// Create a cache miss error.
    pub fn cache_miss(key: impl Into<String>) -> Self {
        Self::CacheMiss { key: key.into() }
    }

    /// Abort a unit of work with a caller-defined error.
    pub fn aborted(source: impl Into<BoxError>) -> Self {
        Self::Aborted {
            source: source.into(),
        }
    }

    /// Get the suggestion for this error, if available.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::Connection { suggestion, .. } => Some(suggestion),
            Self::Database { source } => Some(sqlx_suggestion(source)),
            Self::NotInitialized => Some("Connect the data layer before issuing queries"),
            Self::ColumnCount { .. } => {
                Some("Make the SELECT column list match the record's field order")
            }
            _ => None,
        }
    }

    /// SQLSTATE code reported by the server, if any.
    pub fn sql_state(&self) -> Option<String> {
        match self {
            Self::Database { source } | Self::Begin { source } | Self::Commit { source } => {
                match source {
                    sqlx::Error::Database(db_err) => db_err.code().map(|c| c.to_string()),
                    _ => None,
                }
            }
            _ => None,
        }
    }

    /// Check if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Connection { .. } | Self::Timeout { .. } => true,
            Self::Database { source } => matches!(
                source,
                sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) | sqlx::Error::WorkerCrashed
            ),
            _ => false,
        }
    }

    /// True when a rollback failed after the unit of work failed.
    pub fn is_rollback_failure(&self) -> bool {
        matches!(self, Self::Rollback { .. })
    }

    /// The error that triggered a rollback, when this is a compound rollback failure.
    pub fn rollback_cause(&self) -> Option<&DataError> {
        match self {
            Self::Rollback { cause, .. } => Some(cause),
            _ => None,
        }
    }
}

fn sqlx_suggestion(err: &sqlx::Error) -> &'static str {
    match err {
        sqlx::Error::Configuration(_) => "Check the connection string format and credentials",
        sqlx::Error::Database(_) => "Check the SQL syntax and referenced objects",
        sqlx::Error::PoolTimedOut => "The pool is exhausted; raise max_connections or retry",
        sqlx::Error::PoolClosed => "The pool was released at shutdown",
        sqlx::Error::Io(_) => "Check network connectivity and database server status",
        sqlx::Error::Tls(_) => "Verify TLS configuration and certificates",
        sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
            "Check that the record field types match the selected column types"
        }
        sqlx::Error::ColumnIndexOutOfBounds { .. } => {
            "Make the SELECT column list match the record's field order"
        }
        _ => "Inspect the underlying driver error",
    }
}

impl From<sqlx::Error> for DataError {
    fn from(source: sqlx::Error) -> Self {
        Self::Database { source }
    }
}

impl From<redis::RedisError> for DataError {
    fn from(err: redis::RedisError) -> Self {
        Self::cache(err.to_string())
    }
}

/// Result type alias for data layer operations.
pub type DataResult<T> = Result<T, DataError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_sentinel_messages() {
        assert_eq!(DataError::NotInitialized.to_string(), NOT_INITIALIZED);
        assert_eq!(DataError::EmptyQuery.to_string(), EMPTY_QUERY);
        assert_eq!(DataError::EmptyPage.to_string(), EMPTY_PAGE);
    }

    #[test]
    fn test_error_retryable() {
        assert!(DataError::timeout("fetch").is_retryable());
        assert!(DataError::connection("err", "sugg").is_retryable());
        assert!(DataError::from(sqlx::Error::PoolTimedOut).is_retryable());
        assert!(!DataError::EmptyQuery.is_retryable());
        assert!(!DataError::from(sqlx::Error::RowNotFound).is_retryable());
    }

    #[test]
    fn test_error_suggestion() {
        let err = DataError::connection("Failed to connect", "Check credentials");
        assert_eq!(err.suggestion(), Some("Check credentials"));
        assert!(DataError::EmptyPage.suggestion().is_none());
    }

    #[test]
    fn test_begin_and_commit_keep_driver_source() {
        let err = DataError::Begin {
            source: sqlx::Error::PoolClosed,
        };
        assert!(err.to_string().starts_with("could not start transaction"));
        assert!(err.source().is_some());

        let err = DataError::Commit {
            source: sqlx::Error::PoolClosed,
        };
        assert!(err.to_string().starts_with("could not commit transaction"));
    }

    #[test]
    fn test_rollback_keeps_both_causes() {
        let err = DataError::Rollback {
            cause: Box::new(DataError::aborted("insufficient funds")),
            source: sqlx::Error::PoolClosed,
        };
        assert!(err.is_rollback_failure());
        let message = err.to_string();
        assert!(message.contains("could not rollback transaction"));
        assert!(message.contains("insufficient funds"));
        assert!(matches!(
            err.rollback_cause(),
            Some(DataError::Aborted { .. })
        ));
        assert!(matches!(
            err.source().and_then(|s| s.downcast_ref::<sqlx::Error>()),
            Some(sqlx::Error::PoolClosed)
        ));
    }

    #[test]
    fn test_clean_abort_is_not_rollback_failure() {
        let err = DataError::aborted("nope");
        assert!(!err.is_rollback_failure());
        assert!(err.rollback_cause().is_none());
    }

    #[test]
    fn test_serialization_error_converts() {
        let err: DataError = serde_json::from_str::<i64>("not json").unwrap_err().into();
        assert!(matches!(err, DataError::Serialization(_)));
    }
}
