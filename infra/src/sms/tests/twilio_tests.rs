//! Tests for the Twilio gateway
//!
//! No request reaches Twilio: rejections are checked through the response
//! parser and transport failures against a closed local port.

use std::time::Duration;

use reqwest::StatusCode;

use crate::sms::twilio::{rejection_from_response, TwilioConfig, DEFAULT_API_BASE_URL};
use crate::sms::TwilioSmsGateway;
use bp_core::errors::{DispatchFailure, GatewayError};
use bp_core::services::verification::SmsGateway;
use bp_shared::{SmsConfig, TwilioSettings};

fn configured(base_url: Option<&str>) -> SmsConfig {
    SmsConfig {
        provider: "twilio".to_string(),
        twilio: TwilioSettings {
            account_sid: "AC0000000000".to_string(),
            auth_token: "token".to_string(),
            from_number: "+15005550006".to_string(),
            api_base_url: base_url.map(str::to_string),
        },
        request_timeout_secs: 2,
    }
}

#[test]
fn test_config_defaults_base_url() {
    let config = TwilioConfig::from_settings(&configured(None));
    assert_eq!(config.api_base_url, DEFAULT_API_BASE_URL);
    assert_eq!(config.request_timeout, Duration::from_secs(2));
    assert!(config.missing_fields().is_empty());
}

#[test]
fn test_config_trims_trailing_slash() {
    let config = TwilioConfig::from_settings(&configured(Some("http://localhost:4010/")));
    assert_eq!(config.api_base_url, "http://localhost:4010");
}

#[test]
fn test_config_debug_hides_token() {
    let mut settings = configured(None);
    settings.twilio.auth_token = "s3cr3t-value".to_string();
    let rendered = format!("{:?}", TwilioConfig::from_settings(&settings));
    assert!(!rendered.contains("s3cr3t-value"));
    assert!(rendered.contains("[REDACTED]"));
}

#[test]
fn test_rejection_with_known_code() {
    let body = r#"{"code": 21408, "message": "Permission to send an SMS has not been enabled for the region", "status": 400}"#;

    match rejection_from_response(StatusCode::BAD_REQUEST, body) {
        GatewayError::Rejected {
            failure,
            provider_code,
            detail,
        } => {
            assert_eq!(failure, DispatchFailure::UnsupportedRegion);
            assert_eq!(provider_code, Some(21408));
            assert!(detail.starts_with("Permission"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[test]
fn test_rejection_with_unknown_code_is_generic() {
    let body = r#"{"code": 30003, "message": "Unreachable destination handset"}"#;
    let err = rejection_from_response(StatusCode::BAD_REQUEST, body);

    assert_eq!(err.failure(), DispatchFailure::GenericDispatchFailure);
    assert_eq!(err.provider_code(), Some(30003));
}

#[test]
fn test_rejection_with_unparseable_body() {
    let err = rejection_from_response(StatusCode::UNAUTHORIZED, "<html>nope</html>");

    assert_eq!(err.failure(), DispatchFailure::ServiceUnavailable);
    assert_eq!(err.provider_code(), None);
    assert!(err.to_string().contains("HTTP 401"));
}

#[tokio::test]
async fn test_send_without_credentials_is_not_configured() {
    let config = SmsConfig {
        provider: "twilio".to_string(),
        ..Default::default()
    };
    let gateway = TwilioSmsGateway::new(TwilioConfig::from_settings(&config)).unwrap();

    match gateway.send("+639171234567", "123456").await {
        Err(GatewayError::NotConfigured { missing }) => {
            assert_eq!(
                missing,
                vec!["TWILIO_ACCOUNT_SID", "TWILIO_AUTH_TOKEN", "TWILIO_PHONE_NUMBER"]
            );
        }
        other => panic!("unexpected result: {:?}", other),
    }
}

#[tokio::test]
async fn test_unreachable_provider_is_transport_error() {
    let config = TwilioConfig::from_settings(&configured(Some("http://127.0.0.1:1")));
    let gateway = TwilioSmsGateway::new(config).unwrap();

    let err = gateway.send("+639171234567", "123456").await.unwrap_err();
    assert!(matches!(
        err,
        GatewayError::Transport { .. } | GatewayError::Timeout
    ));
    assert_ne!(err.failure(), DispatchFailure::UnsupportedRegion);
}
