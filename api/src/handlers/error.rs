//! Mapping from verification errors to HTTP responses
//!
//! Every failure is rendered as [`ErrorResponse`]:
//! `{ success: false, error, message, providerCode?, retryAfterSeconds?, remainingAttempts? }`.

use actix_web::{
    error::{InternalError, JsonPayloadError},
    http::{header, StatusCode},
    HttpRequest, HttpResponse,
};
use validator::ValidationErrors;

use bp_core::errors::{DispatchFailure, VerificationError};
use bp_shared::{error_codes, ErrorResponse};

/// HTTP status for a verification error
pub fn status_for(error: &VerificationError) -> StatusCode {
    match error {
        VerificationError::Validation { .. }
        | VerificationError::InvalidCode { .. }
        | VerificationError::Expired
        | VerificationError::NotFoundOrExpired => StatusCode::BAD_REQUEST,
        VerificationError::CooldownActive { .. } | VerificationError::LockedOut => {
            StatusCode::TOO_MANY_REQUESTS
        }
        VerificationError::Dispatch { failure, .. } => match failure {
            f if f.is_number_specific() => StatusCode::UNPROCESSABLE_ENTITY,
            DispatchFailure::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::BAD_GATEWAY,
        },
        VerificationError::Configuration { .. } => StatusCode::SERVICE_UNAVAILABLE,
        VerificationError::Persistence { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Failure body for a verification error
pub fn error_body(error: &VerificationError) -> ErrorResponse {
    let body = ErrorResponse::new(error.error_code(), error.user_message());
    match error {
        VerificationError::CooldownActive { retry_after_seconds } => {
            body.with_retry_after(*retry_after_seconds)
        }
        VerificationError::InvalidCode { remaining_attempts } => {
            body.with_remaining_attempts(*remaining_attempts)
        }
        VerificationError::LockedOut => body.with_remaining_attempts(0),
        VerificationError::Dispatch { provider_code, .. } => {
            body.with_provider_code(*provider_code)
        }
        _ => body,
    }
}

/// Convert a verification error into an HTTP response
pub fn verification_error_response(error: &VerificationError) -> HttpResponse {
    let status = status_for(error);
    if status.is_server_error() {
        tracing::warn!(error = %error, status = status.as_u16(), "Verification request failed");
    } else {
        tracing::debug!(error = %error, status = status.as_u16(), "Verification request rejected");
    }

    let mut response = HttpResponse::build(status);
    if let VerificationError::CooldownActive { retry_after_seconds } = error {
        response.insert_header((header::RETRY_AFTER, retry_after_seconds.to_string()));
    }
    response.json(error_body(error))
}

/// 400 response for DTO validation failures, using the first field message
pub fn validation_errors_response(errors: &ValidationErrors) -> HttpResponse {
    let message = errors
        .field_errors()
        .into_iter()
        .flat_map(|(_, errs)| errs.iter())
        .find_map(|e| e.message.as_ref().map(|m| m.to_string()))
        .unwrap_or_else(|| "Invalid request data".to_string());

    HttpResponse::BadRequest().json(ErrorResponse::new(error_codes::VALIDATION_ERROR, message))
}

/// Render malformed or mistyped JSON bodies in the failure shape
pub fn json_error_handler(err: JsonPayloadError, req: &HttpRequest) -> actix_web::Error {
    tracing::debug!(path = %req.path(), error = %err, "Rejected request body");

    let (status, message) = match &err {
        JsonPayloadError::ContentType => (
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            "Request body must be JSON".to_string(),
        ),
        JsonPayloadError::Overflow { .. } | JsonPayloadError::OverflowKnownLength { .. } => (
            StatusCode::PAYLOAD_TOO_LARGE,
            "Request body is too large".to_string(),
        ),
        _ => (
            StatusCode::BAD_REQUEST,
            "Invalid request body. Check phoneNumber, userRole and otpCode".to_string(),
        ),
    };

    let response = HttpResponse::build(status)
        .json(ErrorResponse::new(error_codes::VALIDATION_ERROR, message));
    InternalError::from_response(err, response).into()
}

/// Fallback for unknown routes
pub async fn not_found() -> HttpResponse {
    HttpResponse::NotFound().json(ErrorResponse::new(
        error_codes::NOT_FOUND,
        "The requested resource was not found",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (VerificationError::validation("phoneNumber", "bad"), StatusCode::BAD_REQUEST),
            (VerificationError::Expired, StatusCode::BAD_REQUEST),
            (VerificationError::NotFoundOrExpired, StatusCode::BAD_REQUEST),
            (
                VerificationError::InvalidCode { remaining_attempts: 1 },
                StatusCode::BAD_REQUEST,
            ),
            (
                VerificationError::CooldownActive { retry_after_seconds: 5 },
                StatusCode::TOO_MANY_REQUESTS,
            ),
            (VerificationError::LockedOut, StatusCode::TOO_MANY_REQUESTS),
            (
                VerificationError::Dispatch {
                    failure: DispatchFailure::UnsupportedRegion,
                    provider_code: Some(21408),
                },
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                VerificationError::Dispatch {
                    failure: DispatchFailure::ServiceUnavailable,
                    provider_code: None,
                },
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                VerificationError::Dispatch {
                    failure: DispatchFailure::GenericDispatchFailure,
                    provider_code: None,
                },
                StatusCode::BAD_GATEWAY,
            ),
            (
                VerificationError::Configuration { message: "missing".into() },
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                VerificationError::Persistence {
                    message: "down".into(),
                    after_dispatch: true,
                },
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (error, expected) in cases {
            assert_eq!(status_for(&error), expected, "{:?}", error);
        }
    }

    #[test]
    fn test_body_carries_extra_fields() {
        let body = error_body(&VerificationError::CooldownActive { retry_after_seconds: 42 });
        assert_eq!(body.retry_after_seconds, Some(42));

        let body = error_body(&VerificationError::Dispatch {
            failure: DispatchFailure::UnsupportedRegion,
            provider_code: Some(21408),
        });
        assert_eq!(body.error, "UNSUPPORTED_REGION");
        assert_eq!(body.message, "SMS not available for your region");
        assert_eq!(body.provider_code, Some(21408));
    }

    #[test]
    fn test_persistence_detail_not_exposed() {
        let body = error_body(&VerificationError::Persistence {
            message: "connection refused to mysql://10.0.0.5".into(),
            after_dispatch: true,
        });
        assert!(!body.message.contains("mysql"));
    }
}
