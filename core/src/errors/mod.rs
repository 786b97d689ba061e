//! Domain-specific error types and error handling.

mod types;

pub use types::{DispatchFailure, GatewayError, StoreError};

use bp_shared::error_codes;
use thiserror::Error;

/// Every way an issue or verify request can fail
///
/// Each variant maps to exactly one actionable user message.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum VerificationError {
    #[error("Validation error on {field}: {message}")]
    Validation { field: String, message: String },

    #[error("Resend cooldown active, retry after {retry_after_seconds}s")]
    CooldownActive { retry_after_seconds: u64 },

    #[error("No active verification code")]
    NotFoundOrExpired,

    #[error("Verification code expired")]
    Expired,

    #[error("Too many failed attempts")]
    LockedOut,

    #[error("Invalid verification code, {remaining_attempts} attempt(s) remaining")]
    InvalidCode { remaining_attempts: u32 },

    #[error("SMS dispatch failed: {failure}")]
    Dispatch {
        failure: DispatchFailure,
        provider_code: Option<u32>,
    },

    #[error("Verification service not configured: {message}")]
    Configuration { message: String },

    #[error("OTP persistence failed (after dispatch: {after_dispatch}): {message}")]
    Persistence { message: String, after_dispatch: bool },
}

impl VerificationError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        VerificationError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Translates a gateway failure at the service boundary
    pub fn from_gateway(err: &GatewayError) -> Self {
        match err {
            GatewayError::NotConfigured { missing } => VerificationError::Configuration {
                message: format!("missing {}", missing.join(", ")),
            },
            other => VerificationError::Dispatch {
                failure: other.failure(),
                provider_code: other.provider_code(),
            },
        }
    }

    pub fn from_store(err: &StoreError, after_dispatch: bool) -> Self {
        VerificationError::Persistence {
            message: err.to_string(),
            after_dispatch,
        }
    }

    /// Machine-readable code for the `error` field
    pub fn error_code(&self) -> &'static str {
        match self {
            VerificationError::Validation { .. } => error_codes::VALIDATION_ERROR,
            VerificationError::CooldownActive { .. } => error_codes::COOLDOWN_ACTIVE,
            VerificationError::NotFoundOrExpired => error_codes::NOT_FOUND_OR_EXPIRED,
            VerificationError::Expired => error_codes::EXPIRED,
            VerificationError::LockedOut => error_codes::LOCKED_OUT,
            VerificationError::InvalidCode { .. } => error_codes::INVALID_CODE,
            VerificationError::Dispatch { failure, .. } => failure.code(),
            VerificationError::Configuration { .. } => error_codes::CONFIGURATION_ERROR,
            VerificationError::Persistence { .. } => error_codes::PERSISTENCE_ERROR,
        }
    }

    /// User-facing message; never includes internal detail
    pub fn user_message(&self) -> String {
        match self {
            VerificationError::Validation { message, .. } => message.clone(),
            VerificationError::CooldownActive { retry_after_seconds } => format!(
                "Please wait {} second(s) before requesting a new code",
                retry_after_seconds
            ),
            VerificationError::NotFoundOrExpired => {
                "No active code for this number. Request a new code".to_string()
            }
            VerificationError::Expired => "Code expired. Request a new code".to_string(),
            VerificationError::LockedOut => {
                "Too many incorrect attempts. Request a new code".to_string()
            }
            VerificationError::InvalidCode { remaining_attempts } => format!(
                "Incorrect code. {} attempt(s) remaining",
                remaining_attempts
            ),
            VerificationError::Dispatch { failure, .. } => failure.user_message().to_string(),
            VerificationError::Configuration { .. } => {
                DispatchFailure::ServiceUnavailable.user_message().to_string()
            }
            VerificationError::Persistence { .. } => {
                "Something went wrong. Please try again".to_string()
            }
        }
    }
}

pub type VerificationResult<T> = Result<T, VerificationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_configured_becomes_configuration_error() {
        let err = VerificationError::from_gateway(&GatewayError::NotConfigured {
            missing: vec!["TWILIO_AUTH_TOKEN".to_string()],
        });
        assert_eq!(err.error_code(), "CONFIGURATION_ERROR");
        assert_eq!(err.user_message(), "Verification temporarily unavailable");
    }

    #[test]
    fn test_rejection_keeps_subtype_and_provider_code() {
        let err = VerificationError::from_gateway(&GatewayError::Rejected {
            failure: DispatchFailure::UnsupportedRegion,
            provider_code: Some(21408),
            detail: "Permission to send an SMS has not been enabled".to_string(),
        });
        assert_eq!(
            err,
            VerificationError::Dispatch {
                failure: DispatchFailure::UnsupportedRegion,
                provider_code: Some(21408),
            }
        );
        assert_eq!(err.user_message(), "SMS not available for your region");
        assert_eq!(err.error_code(), "UNSUPPORTED_REGION");
    }

    #[test]
    fn test_timeout_and_transport_classification() {
        assert_eq!(GatewayError::Timeout.failure(), DispatchFailure::ServiceUnavailable);
        let transport = GatewayError::Transport {
            message: "connection reset".to_string(),
        };
        assert_eq!(transport.failure(), DispatchFailure::GenericDispatchFailure);
        assert_eq!(
            VerificationError::from_gateway(&transport).user_message(),
            "Failed to send code, try again"
        );
    }

    #[test]
    fn test_persistence_message_hides_detail() {
        let err = VerificationError::from_store(&StoreError::unavailable("mysql gone away"), true);
        assert!(!err.user_message().contains("mysql"));
        assert!(err.to_string().contains("after dispatch: true"));
    }

    #[test]
    fn test_number_specific_failures() {
        assert!(DispatchFailure::InvalidNumber.is_number_specific());
        assert!(!DispatchFailure::ServiceUnavailable.is_number_specific());
        assert!(!DispatchFailure::GenericDispatchFailure.is_number_specific());
    }
}
