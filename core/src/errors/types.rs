//! Error types raised at the SMS gateway and record store boundaries
//!
//! Adapters translate provider and backend failures into these types so the
//! verification service never sees a transport-specific error.

use thiserror::Error;

/// Domain classification of a failed SMS dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DispatchFailure {
    /// The destination country or region is not enabled on the account
    UnsupportedRegion,
    /// The destination is not a deliverable number
    InvalidNumber,
    /// The destination must be verified on the provider account first
    NumberNeedsVerification,
    /// International messaging is disabled for the destination
    InternationalDisabled,
    /// Credentials or provider configuration missing, or provider unreachable in time
    ServiceUnavailable,
    /// Anything else
    GenericDispatchFailure,
}

impl DispatchFailure {
    /// Machine-readable code for API responses
    pub fn code(&self) -> &'static str {
        use bp_shared::error_codes;
        match self {
            DispatchFailure::UnsupportedRegion => error_codes::UNSUPPORTED_REGION,
            DispatchFailure::InvalidNumber => error_codes::INVALID_NUMBER,
            DispatchFailure::NumberNeedsVerification => error_codes::NUMBER_NEEDS_VERIFICATION,
            DispatchFailure::InternationalDisabled => error_codes::INTERNATIONAL_DISABLED,
            DispatchFailure::ServiceUnavailable => error_codes::SERVICE_UNAVAILABLE,
            DispatchFailure::GenericDispatchFailure => error_codes::DISPATCH_FAILED,
        }
    }

    /// The one user-facing message for each subtype
    pub fn user_message(&self) -> &'static str {
        match self {
            DispatchFailure::UnsupportedRegion => "SMS not available for your region",
            DispatchFailure::InvalidNumber => "Enter a valid international number",
            DispatchFailure::NumberNeedsVerification => "Contact support to verify this number",
            DispatchFailure::InternationalDisabled => "Contact support or try a different number",
            DispatchFailure::ServiceUnavailable => "Verification temporarily unavailable",
            DispatchFailure::GenericDispatchFailure => "Failed to send code, try again",
        }
    }

    /// Whether the failure is tied to the destination number rather than the service
    pub fn is_number_specific(&self) -> bool {
        matches!(
            self,
            DispatchFailure::UnsupportedRegion
                | DispatchFailure::InvalidNumber
                | DispatchFailure::NumberNeedsVerification
                | DispatchFailure::InternationalDisabled
        )
    }
}

impl std::fmt::Display for DispatchFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// Errors returned by an [`SmsGateway`](crate::services::verification::SmsGateway)
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GatewayError {
    #[error("SMS gateway not configured, missing: {}", missing.join(", "))]
    NotConfigured { missing: Vec<String> },

    #[error("SMS provider rejected message ({failure}): {detail}")]
    Rejected {
        failure: DispatchFailure,
        provider_code: Option<u32>,
        detail: String,
    },

    #[error("SMS provider request timed out")]
    Timeout,

    #[error("SMS transport error: {message}")]
    Transport { message: String },
}

impl GatewayError {
    /// Domain subtype this error falls into
    pub fn failure(&self) -> DispatchFailure {
        match self {
            GatewayError::NotConfigured { .. } | GatewayError::Timeout => {
                DispatchFailure::ServiceUnavailable
            }
            GatewayError::Rejected { failure, .. } => *failure,
            GatewayError::Transport { .. } => DispatchFailure::GenericDispatchFailure,
        }
    }

    pub fn provider_code(&self) -> Option<u32> {
        match self {
            GatewayError::Rejected { provider_code, .. } => *provider_code,
            _ => None,
        }
    }
}

/// Errors returned by an [`OtpRepository`](crate::repositories::OtpRepository)
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("OTP store unavailable: {message}")]
    Unavailable { message: String },

    #[error("OTP record could not be decoded: {message}")]
    Corrupt { message: String },
}

impl StoreError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        StoreError::Unavailable {
            message: message.into(),
        }
    }

    pub fn corrupt(message: impl Into<String>) -> Self {
        StoreError::Corrupt {
            message: message.into(),
        }
    }
}
