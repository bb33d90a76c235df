//! Storage error types.
//!
//! Used by repository implementations and callers of storage APIs. Unique-constraint violations
//! surface as [`StorageError::AlreadyExists`] so callers can tell a conflict from a failure.

use konsul_core::KonsulError;
use thiserror::Error;

/// Errors that can occur when using storage operations.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Already exists: {0}")]
    AlreadyExists(String),
}

impl From<sqlx::Error> for StorageError {
    fn from(e: sqlx::Error) -> Self {
        match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                StorageError::AlreadyExists(db.message().to_string())
            }
            sqlx::Error::RowNotFound => StorageError::NotFound(e.to_string()),
            _ => StorageError::Database(e.to_string()),
        }
    }
}

impl From<StorageError> for KonsulError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::Database(m) => KonsulError::Database(m),
            StorageError::NotFound(m) => KonsulError::NotFound(m),
            StorageError::AlreadyExists(m) => KonsulError::Conflict(m),
        }
    }
}

pub type StorageResult<T> = Result<T, StorageError>;
