//! # DomainError
//!
//! Centralized error handling for the forum core.
//! Store adapters speak `StoreError`; the engine converts it into the
//! caller-facing `DomainError` taxonomy with `?`.

use thiserror::Error;

/// The primary error type for all engine operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Blank required field, malformed role value or identifier
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Role Policy denied the action, or the caller could not be resolved
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Referenced category, topic or user does not exist
    #[error("{entity} not found with ID {id}")]
    NotFound { entity: &'static str, id: String },

    /// The request contradicts current state (e.g. altering an owner)
    #[error("conflict: {0}")]
    Conflict(String),

    /// Store timeout or transport failure
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),
}

impl DomainError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        DomainError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Only infrastructure failures are worth retrying, and only by the caller.
    pub fn is_retryable(&self) -> bool {
        matches!(self, DomainError::StoreUnavailable(_))
    }
}

/// Failure conditions every Content Store Adapter must distinguish.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("{entity} {id} does not exist")]
    NotFound { entity: &'static str, id: String },

    #[error("write conflict: {0}")]
    Conflict(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        StoreError::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

impl From<StoreError> for DomainError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { entity, id } => DomainError::NotFound { entity, id },
            StoreError::Conflict(msg) => DomainError::Conflict(msg),
            StoreError::Unavailable(msg) => DomainError::StoreUnavailable(msg),
        }
    }
}

/// A specialized Result type for engine logic.
pub type Result<T> = std::result::Result<T, DomainError>;
