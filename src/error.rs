//! Error types for the formvault storage engine
//!
//! All errors use thiserror for structured error handling.
//! Read misses are not errors — lookups return `Option`/empty lists.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The environment has no usable persistence backend. Fatal; the caller
    /// should surface a corrective suggestion to the user.
    #[error("Storage is unavailable: {0}")]
    StoreUnavailable(String),

    /// Storage space is exhausted. The operation was abandoned with no
    /// partial state.
    #[error("Storage quota exceeded: {0}")]
    QuotaExceeded(String),

    /// The on-disk schema was created by a newer build. Suggest reload.
    #[error("Schema version conflict: {0}")]
    VersionConflict(String),

    /// Duplicate explicit key or use of an undeclared index — a programmer
    /// error, not user-correctable.
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    /// Expected, user-correctable. Carries every violation, not just the
    /// first.
    #[error("Validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    /// Passcode mismatch. Leaks nothing about store state.
    #[error("Invalid passcode")]
    InvalidCredential,

    #[error("{0}")]
    Generic(String),
}

impl AppError {
    /// Map a sqlx error from a write path onto the store taxonomy.
    ///
    /// SQLITE_FULL (code 13) becomes `QuotaExceeded`, unique-key failures
    /// become `ConstraintViolation`, everything else passes through.
    pub(crate) fn from_write(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                return AppError::ConstraintViolation(db_err.to_string());
            }
            if db_err.code().as_deref() == Some("13") {
                return AppError::QuotaExceeded(db_err.to_string());
            }
        }
        AppError::Database(err)
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
