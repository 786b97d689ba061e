//! SMS gateway configuration module

use serde::{Deserialize, Serialize};

/// SMS gateway configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SmsConfig {
    /// SMS provider ("twilio", "mock")
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Twilio credentials; any empty field leaves the gateway unconfigured
    #[serde(default)]
    pub twilio: TwilioSettings,

    /// Provider request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

/// Twilio account settings
#[derive(Clone, Default, Deserialize, Serialize)]
pub struct TwilioSettings {
    #[serde(default)]
    pub account_sid: String,
    #[serde(default)]
    pub auth_token: String,
    #[serde(default)]
    pub from_number: String,
    /// Override for the REST API base URL
    #[serde(default)]
    pub api_base_url: Option<String>,
}

impl std::fmt::Debug for TwilioSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TwilioSettings")
            .field("account_sid", &self.account_sid)
            .field("auth_token", &"[REDACTED]")
            .field("from_number", &self.from_number)
            .field("api_base_url", &self.api_base_url)
            .finish()
    }
}

impl TwilioSettings {
    /// Names of the credential fields that are still empty
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.account_sid.trim().is_empty() {
            missing.push("TWILIO_ACCOUNT_SID");
        }
        if self.auth_token.trim().is_empty() {
            missing.push("TWILIO_AUTH_TOKEN");
        }
        if self.from_number.trim().is_empty() {
            missing.push("TWILIO_PHONE_NUMBER");
        }
        missing
    }
}

impl Default for SmsConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            twilio: TwilioSettings::default(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl SmsConfig {
    /// Create from SMS_PROVIDER and TWILIO_* variables
    pub fn from_env() -> Self {
        let twilio = TwilioSettings {
            account_sid: std::env::var("TWILIO_ACCOUNT_SID").unwrap_or_default(),
            auth_token: std::env::var("TWILIO_AUTH_TOKEN").unwrap_or_default(),
            from_number: std::env::var("TWILIO_PHONE_NUMBER").unwrap_or_default(),
            api_base_url: std::env::var("TWILIO_API_BASE_URL").ok(),
        };
        let request_timeout_secs = std::env::var("SMS_REQUEST_TIMEOUT_SECS")
            .ok()
            .and_then(|t| t.parse().ok())
            .unwrap_or_else(default_request_timeout);

        Self {
            provider: std::env::var("SMS_PROVIDER").unwrap_or_else(|_| default_provider()),
            twilio,
            request_timeout_secs,
        }
    }
}

fn default_provider() -> String {
    "mock".to_string()
}

fn default_request_timeout() -> u64 {
    10
}
