//! Error types for custab operations

use crate::KindTag;
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Request keys that must be present before storage is touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequiredKey {
    ModuleId,
    UserId,
    Value,
}

impl RequiredKey {
    /// Wire name of the key.
    pub fn as_str(self) -> &'static str {
        match self {
            RequiredKey::ModuleId => "moduleId",
            RequiredKey::UserId => "userId",
            RequiredKey::Value => "value",
        }
    }
}

impl fmt::Display for RequiredKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validation errors. Always raised before any mutation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required key missing: {key}")]
    MissingRequiredKey { key: RequiredKey },

    #[error("Malformed payload: {reason}")]
    MalformedPayload { reason: String },
}

impl ValidationError {
    pub fn missing(key: RequiredKey) -> Self {
        ValidationError::MissingRequiredKey { key }
    }

    pub fn malformed(reason: impl Into<String>) -> Self {
        ValidationError::MalformedPayload {
            reason: reason.into(),
        }
    }
}

/// Storage layer errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("Baseline {kind} not found in module {module_id} with id {id}")]
    NotFound {
        kind: KindTag,
        module_id: String,
        id: Uuid,
    },

    #[error("Constraint violation on {constraint}: {reason}")]
    ConstraintViolation { constraint: String, reason: String },

    #[error("Transaction failed: {reason}")]
    TransactionFailed { reason: String },

    #[error("Connection failed: {reason}")]
    ConnectionFailed { reason: String },

    #[error("Storage lock poisoned")]
    LockPoisoned,
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required configuration field: {field}")]
    MissingRequired { field: String },

    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Master error type for all custab errors.
#[derive(Debug, Clone, Error)]
pub enum LayoutError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

impl LayoutError {
    /// Caller-side failure: the request was rejected before storage.
    pub fn is_validation(&self) -> bool {
        matches!(self, LayoutError::Validation(_))
    }

    /// Store-side failure: the active transaction was rolled back.
    pub fn is_storage(&self) -> bool {
        matches!(self, LayoutError::Storage(_))
    }
}

/// Result type alias for custab operations.
pub type LayoutResult<T> = Result<T, LayoutError>;

/// Reject an empty or blank key.
pub fn require_key(value: &str, key: RequiredKey) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::missing(key));
    }
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================
