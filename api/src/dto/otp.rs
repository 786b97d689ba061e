use bp_core::domain::entities::UserRole;
use bp_core::services::verification::{IssueReceipt, VerifiedPhone};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct IssueOtpRequest {
    /// International number, any common punctuation allowed, e.g. "+63 917 123 4567"
    #[validate(length(min = 1, max = 32, message = "Enter your mobile number"))]
    pub phone_number: String,

    /// "resident" or "official"
    #[validate(length(min = 1, max = 16, message = "Choose resident or official"))]
    pub user_role: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct VerifyOtpRequest {
    #[validate(length(min = 1, max = 32, message = "Enter your mobile number"))]
    pub phone_number: String,

    /// 6-digit code from the SMS
    #[validate(length(min = 1, max = 16, message = "Enter the 6-digit code sent to your phone"))]
    pub otp_code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueOtpResponse {
    pub success: bool,
    pub expires_at: DateTime<Utc>,
    /// Earliest time a new code may be requested
    pub resend_available_at: DateTime<Utc>,
}

impl From<IssueReceipt> for IssueOtpResponse {
    fn from(receipt: IssueReceipt) -> Self {
        Self {
            success: true,
            expires_at: receipt.expires_at,
            resend_available_at: receipt.resend_available_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyOtpResponse {
    pub success: bool,
    pub user_role: UserRole,
    /// Normalized number that was verified
    pub phone_number: String,
}

impl From<VerifiedPhone> for VerifyOtpResponse {
    fn from(verified: VerifiedPhone) -> Self {
        Self {
            success: true,
            user_role: verified.user_role,
            phone_number: verified.phone_number,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_request_uses_camel_case() {
        let request: IssueOtpRequest =
            serde_json::from_str(r#"{"phoneNumber": "+639171234567", "userRole": "resident"}"#).unwrap();
        assert_eq!(request.phone_number, "+639171234567");
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_empty_code_fails_validation() {
        let request = VerifyOtpRequest {
            phone_number: "+639171234567".to_string(),
            otp_code: String::new(),
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_issue_response_shape() {
        let expires_at = Utc.with_ymd_and_hms(2024, 3, 1, 8, 10, 0).unwrap();
        let response = IssueOtpResponse {
            success: true,
            expires_at,
            resend_available_at: Utc.with_ymd_and_hms(2024, 3, 1, 8, 1, 0).unwrap(),
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["success"], true);
        assert!(json.get("expiresAt").is_some());
        assert!(json.get("resendAvailableAt").is_some());
    }
}
