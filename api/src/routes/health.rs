//! Health and API index endpoints

use actix_web::{web, HttpResponse};

use super::otp::AppState;

/// GET /health
///
/// 200 when the record store answers, 503 otherwise. An unconfigured SMS
/// gateway is reported but does not fail the check.
pub async fn health_check(state: web::Data<AppState>) -> HttpResponse {
    let service = &state.verification_service;
    let store_up = service.store_healthy().await;
    let gateway = service.sms_gateway();

    let body = serde_json::json!({
        "status": if store_up { "healthy" } else { "degraded" },
        "service": "barangay-portal-api",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "components": {
            "otpStore": if store_up { "up" } else { "down" },
            "smsGateway": {
                "provider": gateway.provider_name(),
                "available": gateway.is_available(),
            },
        },
    });

    if store_up {
        HttpResponse::Ok().json(body)
    } else {
        HttpResponse::ServiceUnavailable().json(body)
    }
}

/// GET /api/v1/
pub async fn api_documentation() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "message": "Barangay Portal API v1",
        "endpoints": {
            "health": "/health",
            "otp": {
                "issue": {
                    "path": "/api/v1/otp/issue",
                    "method": "POST",
                    "description": "Send a 6-digit verification code via SMS",
                    "request_body": {
                        "phoneNumber": "string, international format",
                        "userRole": "'resident' or 'official'"
                    },
                    "responses": {
                        "200": "Code sent; returns expiresAt and resendAvailableAt",
                        "400": "Invalid phone number or role",
                        "422": "Number cannot receive SMS",
                        "429": "Resend cooldown active",
                        "502": "SMS dispatch failed",
                        "503": "SMS service unavailable"
                    }
                },
                "verify": {
                    "path": "/api/v1/otp/verify",
                    "method": "POST",
                    "description": "Check a verification code",
                    "request_body": {
                        "phoneNumber": "string, international format",
                        "otpCode": "string, 6 digits"
                    },
                    "responses": {
                        "200": "Verified; returns userRole",
                        "400": "Invalid, expired or missing code",
                        "429": "Too many incorrect attempts"
                    }
                }
            }
        }
    }))
}
