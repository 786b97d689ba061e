use actix_web::{web, HttpResponse};
use validator::Validate;

use bp_shared::phone::mask_phone_number;

use super::AppState;
use crate::dto::{VerifyOtpRequest, VerifyOtpResponse};
use crate::handlers::error::{validation_errors_response, verification_error_response};

/// Handler for POST /api/v1/otp/verify
///
/// Success returns `{ "success": true, "userRole": "resident", "phoneNumber": "+63..." }`.
/// Only this response lets registration continue.
///
/// Failures: 400 `VALIDATION_ERROR`, `INVALID_CODE` (with `remainingAttempts`),
/// `EXPIRED`, `NOT_FOUND_OR_EXPIRED`; 429 `LOCKED_OUT`; 500 `PERSISTENCE_ERROR`.
pub async fn verify_otp(
    state: web::Data<AppState>,
    request: web::Json<VerifyOtpRequest>,
) -> HttpResponse {
    let request = request.into_inner();

    if let Err(errors) = request.validate() {
        return validation_errors_response(&errors);
    }

    tracing::info!(
        phone = %mask_phone_number(&request.phone_number),
        "Processing OTP verify request"
    );

    match state
        .verification_service
        .verify(&request.phone_number, &request.otp_code)
        .await
    {
        Ok(verified) => HttpResponse::Ok().json(VerifyOtpResponse::from(verified)),
        Err(e) => verification_error_response(&e),
    }
}
