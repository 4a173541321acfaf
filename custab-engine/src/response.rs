//! Response Envelope
//!
//! Boundary layers wrap engine results in the legacy `{code, des, result}`
//! shape: `code` is `"0"` on success, otherwise an [`ErrorCode`] name, with
//! `des` carrying the error text.

use custab_core::{LayoutError, LayoutResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Success code in the envelope.
pub const SUCCESS_CODE: &str = "0";

// ============================================================================
// ERROR CODE ENUM
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Missing key or undecodable payload; nothing was written
    ValidationFailed,

    /// Statement or transaction failure; the transaction was rolled back
    StorageFailed,

    /// Invalid engine or database configuration
    ConfigInvalid,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::ValidationFailed => "VALIDATION_FAILED",
            ErrorCode::StorageFailed => "STORAGE_FAILED",
            ErrorCode::ConfigInvalid => "CONFIG_INVALID",
        }
    }

    /// HTTP status a boundary layer should answer with.
    pub fn http_status(self) -> u16 {
        match self {
            ErrorCode::ValidationFailed => 400,
            ErrorCode::StorageFailed => 500,
            ErrorCode::ConfigInvalid => 500,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&LayoutError> for ErrorCode {
    fn from(err: &LayoutError) -> Self {
        match err {
            LayoutError::Validation(_) => ErrorCode::ValidationFailed,
            LayoutError::Storage(_) => ErrorCode::StorageFailed,
            LayoutError::Config(_) => ErrorCode::ConfigInvalid,
        }
    }
}

// ============================================================================
// ENVELOPE
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub code: String,
    pub des: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<T>,
}

impl<T> Envelope<T> {
    pub fn ok(result: T) -> Self {
        Self {
            code: SUCCESS_CODE.to_string(),
            des: String::new(),
            result: Some(result),
        }
    }

    pub fn error(err: &LayoutError) -> Self {
        Self {
            code: ErrorCode::from(err).as_str().to_string(),
            des: err.to_string(),
            result: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.code == SUCCESS_CODE
    }
}

impl Envelope<()> {
    /// Acknowledgement with no payload.
    pub fn ack() -> Self {
        Self {
            code: SUCCESS_CODE.to_string(),
            des: String::new(),
            result: None,
        }
    }
}

impl<T> From<LayoutResult<T>> for Envelope<T> {
    fn from(result: LayoutResult<T>) -> Self {
        match result {
            Ok(value) => Envelope::ok(value),
            Err(err) => Envelope::error(&err),
        }
    }
}
