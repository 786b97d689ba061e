//! Twilio SMS gateway
//!
//! Sends messages through the Twilio Messages REST resource. A single
//! attempt is made per send; the resend cooldown is the retry policy.
//!
//! Missing credentials do not prevent construction. The gateway reports
//! itself unavailable and every send fails with `NotConfigured`, which lets
//! the server start and surface the problem per request.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tracing::{error, info, warn};

use bp_core::errors::GatewayError;
use bp_core::services::verification::SmsGateway;
use bp_shared::phone::mask_phone_number;
use bp_shared::SmsConfig;

use super::error_mapping::classify_provider_error;
use crate::InfrastructureError;

pub const DEFAULT_API_BASE_URL: &str = "https://api.twilio.com";

/// Twilio gateway configuration
#[derive(Clone)]
pub struct TwilioConfig {
    pub account_sid: String,
    pub auth_token: String,
    /// Sender number in E.164
    pub from_number: String,
    pub api_base_url: String,
    pub request_timeout: Duration,
}

impl std::fmt::Debug for TwilioConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TwilioConfig")
            .field("account_sid", &self.account_sid)
            .field("auth_token", &"[REDACTED]")
            .field("from_number", &self.from_number)
            .field("api_base_url", &self.api_base_url)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

impl TwilioConfig {
    pub fn from_settings(config: &SmsConfig) -> Self {
        let settings = &config.twilio;
        Self {
            account_sid: settings.account_sid.trim().to_string(),
            auth_token: settings.auth_token.trim().to_string(),
            from_number: settings.from_number.trim().to_string(),
            api_base_url: settings
                .api_base_url
                .as_deref()
                .map(str::trim)
                .filter(|url| !url.is_empty())
                .unwrap_or(DEFAULT_API_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
            request_timeout: Duration::from_secs(config.request_timeout_secs.max(1)),
        }
    }

    /// Names of credential settings that are empty
    pub fn missing_fields(&self) -> Vec<String> {
        [
            ("TWILIO_ACCOUNT_SID", &self.account_sid),
            ("TWILIO_AUTH_TOKEN", &self.auth_token),
            ("TWILIO_PHONE_NUMBER", &self.from_number),
        ]
        .iter()
        .filter(|(_, value)| value.is_empty())
        .map(|(name, _)| name.to_string())
        .collect()
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.api_base_url, self.account_sid
        )
    }
}

/// Successful message creation response
#[derive(Debug, Deserialize)]
struct MessageResource {
    sid: String,
}

/// Twilio REST error body
#[derive(Debug, Deserialize, PartialEq)]
pub(crate) struct ProviderErrorBody {
    pub code: Option<u32>,
    pub message: Option<String>,
}

/// Turn a non-success response into a `Rejected` error
pub(crate) fn rejection_from_response(status: StatusCode, body: &str) -> GatewayError {
    let parsed: Option<ProviderErrorBody> = serde_json::from_str(body).ok();
    let provider_code = parsed.as_ref().and_then(|b| b.code);
    let detail = parsed
        .and_then(|b| b.message)
        .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));

    GatewayError::Rejected {
        failure: classify_provider_error(provider_code, status.as_u16()),
        provider_code,
        detail,
    }
}

fn transport_error(e: reqwest::Error) -> GatewayError {
    if e.is_timeout() {
        GatewayError::Timeout
    } else {
        GatewayError::Transport {
            message: e.to_string(),
        }
    }
}

/// Twilio REST gateway
pub struct TwilioSmsGateway {
    client: Client,
    config: TwilioConfig,
    missing: Vec<String>,
}

impl TwilioSmsGateway {
    pub fn new(config: TwilioConfig) -> Result<Self, InfrastructureError> {
        let client = Client::builder().timeout(config.request_timeout).build()?;
        let missing = config.missing_fields();

        if missing.is_empty() {
            info!(
                from = %mask_phone_number(&config.from_number),
                "Twilio SMS gateway initialized"
            );
        } else {
            warn!(
                missing = ?missing,
                "Twilio SMS gateway is missing credentials; sends will fail until configured"
            );
        }

        Ok(Self {
            client,
            config,
            missing,
        })
    }

    pub fn config(&self) -> &TwilioConfig {
        &self.config
    }
}

#[async_trait]
impl SmsGateway for TwilioSmsGateway {
    async fn send(&self, phone: &str, message: &str) -> Result<String, GatewayError> {
        if !self.missing.is_empty() {
            return Err(GatewayError::NotConfigured {
                missing: self.missing.clone(),
            });
        }

        let masked = mask_phone_number(phone);
        let params = [
            ("To", phone),
            ("From", self.config.from_number.as_str()),
            ("Body", message),
        ];

        let response = self
            .client
            .post(self.config.messages_url())
            .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
            .form(&params)
            .send()
            .await
            .map_err(|e| {
                let err = transport_error(e);
                error!(phone = %masked, error = %err, "Twilio request failed");
                err
            })?;

        let status = response.status();
        let body = response.text().await.map_err(transport_error)?;

        if !status.is_success() {
            let err = rejection_from_response(status, &body);
            warn!(
                phone = %masked,
                status = status.as_u16(),
                provider_code = ?err.provider_code(),
                failure = %err.failure(),
                "Twilio rejected message"
            );
            return Err(err);
        }

        let resource: MessageResource =
            serde_json::from_str(&body).map_err(|e| GatewayError::Transport {
                message: format!("unexpected Twilio response: {}", e),
            })?;

        info!(phone = %masked, message_sid = %resource.sid, "SMS sent via Twilio");
        Ok(resource.sid)
    }

    fn provider_name(&self) -> &str {
        "twilio"
    }

    fn is_available(&self) -> bool {
        self.missing.is_empty()
    }
}
