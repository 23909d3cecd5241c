use thiserror::Error;

/// Unified error type for the whole crate
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),

    #[error("Referential violation: file {file_id} or tag {tag_id} does not exist")]
    ReferentialViolation { file_id: i64, tag_id: i64 },

    #[error("Constraint conflict: {0}")]
    ConstraintConflict(String),

    #[error("Validation error: {field} - {message}")]
    Validation { field: String, message: String },

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl AppError {
    /// Create a validation error
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }
}

/// Result type used across the crate
pub type AppResult<T> = Result<T, AppError>;

/// Error category classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Caused by the caller's input (fixable by the caller)
    UserError,
    /// Transient system error (safe to retry)
    SystemError,
    /// Configuration problem (needs a settings change)
    ConfigError,
}

impl AppError {
    /// Classify the error
    pub fn category(&self) -> ErrorCategory {
        match self {
            AppError::ReferentialViolation { .. } => ErrorCategory::UserError,
            AppError::Validation { .. } => ErrorCategory::UserError,
            AppError::Configuration(_) => ErrorCategory::ConfigError,
            AppError::ConstraintConflict(_) => ErrorCategory::SystemError,
            AppError::Database(_) => ErrorCategory::SystemError,
            AppError::Io(_) => ErrorCategory::SystemError,
            AppError::Internal(_) => ErrorCategory::SystemError,
        }
    }

    /// Whether the caller may safely retry the operation
    pub fn is_retryable(&self) -> bool {
        matches!(self.category(), ErrorCategory::SystemError)
    }
}

/// Map a SQLite failure on a file_tags write to the store's error taxonomy.
///
/// A foreign key violation means one of the referenced entities is missing.
/// Other constraint failures and busy/locked states are conflicts the caller
/// may retry.
pub(crate) fn map_association_error(err: rusqlite::Error, file_id: i64, tag_id: i64) -> AppError {
    match err {
        rusqlite::Error::SqliteFailure(e, msg) => {
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY {
                AppError::ReferentialViolation { file_id, tag_id }
            } else if e.code == rusqlite::ErrorCode::ConstraintViolation
                || e.code == rusqlite::ErrorCode::DatabaseBusy
                || e.code == rusqlite::ErrorCode::DatabaseLocked
            {
                AppError::ConstraintConflict(msg.unwrap_or_else(|| e.to_string()))
            } else {
                AppError::Database(rusqlite::Error::SqliteFailure(e, msg))
            }
        }
        other => AppError::Database(other),
    }
}
