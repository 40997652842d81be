//! Error handling for the Larder cost engine
//!
//! Provides a single error type shared by the ledger, cascade,
//! reconciliation and variance services.

use thiserror::Error;

/// Engine error types
#[derive(Error, Debug)]
pub enum EngineError {
    // Validation errors
    #[error("Validation error: {message}")]
    Validation { field: String, message: String },

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    // Storage integrity errors (e.g. a failed compensating write)
    #[error("Storage error: {0}")]
    StorageError(String),

    // Database errors
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    // Internal errors
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

impl EngineError {
    /// Build a validation error for a named input field.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        EngineError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Stable machine-readable code, used in batch logs and exports.
    pub fn error_code(&self) -> &'static str {
        match self {
            EngineError::Validation { .. } => "VALIDATION_ERROR",
            EngineError::NotFound(_) => "NOT_FOUND",
            EngineError::Conflict(_) => "CONFLICT",
            EngineError::Configuration(_) => "CONFIGURATION_ERROR",
            EngineError::StorageError(_) => "STORAGE_ERROR",
            EngineError::DatabaseError(_) => "DATABASE_ERROR",
            EngineError::InternalError(_) => "INTERNAL_ERROR",
        }
    }
}

/// Result type alias for engine operations
pub type EngineResult<T> = Result<T, EngineError>;
