//! Database Error Types
//!
//! This module defines error types for database operations, providing
//! clear error handling for connection, initialization, and query failures.

use std::path::PathBuf;
use thiserror::Error;

/// Database operation errors
///
/// Covers connection, initialization and statement failures. Constraint
/// violations are split out so callers can tell a rejected write (duplicate
/// edge, dangling reference) from a transport-level failure.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Failed to establish database connection
    #[error("Failed to connect to database at {path}: {source}")]
    ConnectionFailed {
        path: PathBuf,
        source: libsql::Error,
    },

    /// Failed to initialize database schema
    #[error("Failed to initialize database schema: {0}")]
    InitializationFailed(String),

    /// Permission denied when accessing database
    #[error("Permission denied for database path: {path}")]
    PermissionDenied { path: PathBuf },

    /// Failed to create parent directory
    #[error("Failed to create parent directory for database: {0}")]
    DirectoryCreationFailed(#[from] std::io::Error),

    /// libsql operation error
    #[error("Database operation failed: {0}")]
    LibsqlError(#[from] libsql::Error),

    /// SQL execution error with context
    #[error("SQL execution failed: {context}")]
    SqlExecutionError { context: String },

    /// A UNIQUE constraint rejected the write
    #[error("Uniqueness constraint violated: {context}")]
    UniqueViolation { context: String },

    /// A FOREIGN KEY constraint rejected the write
    #[error("Referential constraint violated: {context}")]
    ForeignKeyViolation { context: String },

    /// A stored row could not be converted into a model
    #[error("Failed to decode row: {0}")]
    RowConversion(String),

    /// A row expected inside a transaction was missing
    #[error("Row not found: {entity} {id}")]
    RowNotFound { entity: &'static str, id: String },
}

impl DatabaseError {
    /// Create a connection failed error
    pub fn connection_failed(path: PathBuf, source: libsql::Error) -> Self {
        Self::ConnectionFailed { path, source }
    }

    /// Create an initialization failed error
    pub fn initialization_failed(msg: impl Into<String>) -> Self {
        Self::InitializationFailed(msg.into())
    }

    /// Create a permission denied error
    pub fn permission_denied(path: PathBuf) -> Self {
        Self::PermissionDenied { path }
    }

    /// Create a SQL execution error with context
    pub fn sql_execution(context: impl Into<String>) -> Self {
        Self::SqlExecutionError {
            context: context.into(),
        }
    }

    /// Create a row conversion error
    pub fn row_conversion(msg: impl Into<String>) -> Self {
        Self::RowConversion(msg.into())
    }

    /// Classify a failed write, separating constraint violations from
    /// generic statement failures.
    pub fn from_write(action: &str, err: libsql::Error) -> Self {
        let message = err.to_string();
        let context = format!("{}: {}", action, message);
        if message.contains("UNIQUE constraint failed") {
            Self::UniqueViolation { context }
        } else if message.contains("FOREIGN KEY constraint failed") {
            Self::ForeignKeyViolation { context }
        } else {
            Self::SqlExecutionError { context }
        }
    }

    pub fn is_unique_violation(&self) -> bool {
        matches!(self, Self::UniqueViolation { .. })
    }
}
