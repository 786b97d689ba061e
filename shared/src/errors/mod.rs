//! Shared error codes and the failure body returned by every endpoint

use serde::{Deserialize, Serialize};

/// Failure body: `{ success: false, error, message, ... }`
///
/// Optional fields are omitted from the JSON when absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    /// Always `false`
    pub success: bool,

    /// Machine-readable error code, see [`error_codes`]
    pub error: String,

    /// Actionable, user-facing message
    pub message: String,

    /// Raw provider error code for dispatch failures
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_code: Option<u32>,

    /// Seconds until a new code may be requested
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_seconds: Option<u64>,

    /// Verification attempts left on the current code
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining_attempts: Option<u32>,
}

impl ErrorResponse {
    /// Create a new error response
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
            message: message.into(),
            provider_code: None,
            retry_after_seconds: None,
            remaining_attempts: None,
        }
    }

    pub fn with_provider_code(mut self, code: Option<u32>) -> Self {
        self.provider_code = code;
        self
    }

    pub fn with_retry_after(mut self, seconds: u64) -> Self {
        self.retry_after_seconds = Some(seconds);
        self
    }

    pub fn with_remaining_attempts(mut self, remaining: u32) -> Self {
        self.remaining_attempts = Some(remaining);
        self
    }
}

/// Error codes surfaced in the `error` field
pub mod error_codes {
    pub const VALIDATION_ERROR: &str = "VALIDATION_ERROR";
    pub const COOLDOWN_ACTIVE: &str = "COOLDOWN_ACTIVE";
    pub const NOT_FOUND_OR_EXPIRED: &str = "NOT_FOUND_OR_EXPIRED";
    pub const EXPIRED: &str = "EXPIRED";
    pub const LOCKED_OUT: &str = "LOCKED_OUT";
    pub const INVALID_CODE: &str = "INVALID_CODE";
    pub const UNSUPPORTED_REGION: &str = "UNSUPPORTED_REGION";
    pub const INVALID_NUMBER: &str = "INVALID_NUMBER";
    pub const NUMBER_NEEDS_VERIFICATION: &str = "NUMBER_NEEDS_VERIFICATION";
    pub const INTERNATIONAL_DISABLED: &str = "INTERNATIONAL_DISABLED";
    pub const SERVICE_UNAVAILABLE: &str = "SERVICE_UNAVAILABLE";
    pub const DISPATCH_FAILED: &str = "DISPATCH_FAILED";
    pub const CONFIGURATION_ERROR: &str = "CONFIGURATION_ERROR";
    pub const PERSISTENCE_ERROR: &str = "PERSISTENCE_ERROR";
    pub const NOT_FOUND: &str = "NOT_FOUND";
    pub const INTERNAL_ERROR: &str = "INTERNAL_ERROR";
}
