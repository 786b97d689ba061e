use actix_web::{web, HttpResponse};
use validator::Validate;

use bp_core::domain::entities::UserRole;
use bp_core::errors::VerificationError;
use bp_shared::phone::mask_phone_number;

use super::AppState;
use crate::dto::{IssueOtpRequest, IssueOtpResponse};
use crate::handlers::error::{validation_errors_response, verification_error_response};

/// Handler for POST /api/v1/otp/issue
///
/// # Request Body
///
/// ```json
/// { "phoneNumber": "+639171234567", "userRole": "resident" }
/// ```
///
/// # Response
///
/// ## Success (200 OK)
/// ```json
/// {
///     "success": true,
///     "expiresAt": "2024-03-01T08:10:00Z",
///     "resendAvailableAt": "2024-03-01T08:01:00Z"
/// }
/// ```
///
/// ## Errors
/// - 400 `VALIDATION_ERROR`
/// - 429 `COOLDOWN_ACTIVE` with a `Retry-After` header
/// - 422 `UNSUPPORTED_REGION`, `INVALID_NUMBER`, `NUMBER_NEEDS_VERIFICATION`, `INTERNATIONAL_DISABLED`
/// - 502 `DISPATCH_FAILED`
/// - 503 `SERVICE_UNAVAILABLE`, `CONFIGURATION_ERROR`
/// - 500 `PERSISTENCE_ERROR`
pub async fn issue_otp(
    state: web::Data<AppState>,
    request: web::Json<IssueOtpRequest>,
) -> HttpResponse {
    let request = request.into_inner();

    if let Err(errors) = request.validate() {
        return validation_errors_response(&errors);
    }

    let role = match request.user_role.parse::<UserRole>() {
        Ok(role) => role,
        Err(_) => {
            return verification_error_response(&VerificationError::validation(
                "userRole",
                "Choose resident or official",
            ))
        }
    };

    tracing::info!(
        phone = %mask_phone_number(&request.phone_number),
        role = %role,
        "Processing OTP issue request"
    );

    match state
        .verification_service
        .issue(&request.phone_number, role)
        .await
    {
        Ok(receipt) => HttpResponse::Ok().json(IssueOtpResponse::from(receipt)),
        Err(e) => verification_error_response(&e),
    }
}
