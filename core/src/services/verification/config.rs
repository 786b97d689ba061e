//! Configuration for the verification service

use bp_shared::OtpConfig;
use chrono::Duration;

use crate::domain::entities::{
    CODE_LENGTH, DEFAULT_EXPIRATION_SECONDS, DEFAULT_RESEND_COOLDOWN_SECONDS, MAX_ATTEMPTS,
};

/// Configuration for the verification service
#[derive(Debug, Clone)]
pub struct VerificationServiceConfig {
    /// Seconds before an issued code expires
    pub code_ttl_seconds: i64,
    /// Minimum age of the current record before a new code may be issued
    pub resend_cooldown_seconds: i64,
    /// Failed verifications allowed per code
    pub max_attempts: u32,
    /// How many times a verify re-reads after losing a conditional update
    pub max_conflict_retries: u32,
    /// Display name used in the SMS body
    pub sender_name: String,
}

impl Default for VerificationServiceConfig {
    fn default() -> Self {
        Self {
            code_ttl_seconds: DEFAULT_EXPIRATION_SECONDS,
            resend_cooldown_seconds: DEFAULT_RESEND_COOLDOWN_SECONDS,
            max_attempts: MAX_ATTEMPTS,
            max_conflict_retries: 3,
            sender_name: "Barangay Portal".to_string(),
        }
    }
}

impl VerificationServiceConfig {
    pub fn code_ttl(&self) -> Duration {
        Duration::seconds(self.code_ttl_seconds)
    }

    pub fn resend_cooldown(&self) -> Duration {
        Duration::seconds(self.resend_cooldown_seconds)
    }

    /// SMS body carrying the code
    pub fn render_message(&self, code: &str) -> String {
        format!(
            "Your {} verification code is {}. It expires in {} minutes. Do not share this code.",
            self.sender_name,
            code,
            self.code_ttl_seconds / 60
        )
    }
}

/// The passcode inside a body produced by [`VerificationServiceConfig::render_message`]
///
/// Used by SMS gateways that record instead of deliver.
pub fn code_from_message(body: &str) -> Option<String> {
    body.split(|c: char| !c.is_ascii_digit())
        .find(|token| token.len() == CODE_LENGTH)
        .map(str::to_string)
}

impl From<&OtpConfig> for VerificationServiceConfig {
    fn from(config: &OtpConfig) -> Self {
        Self {
            code_ttl_seconds: config.code_ttl_seconds,
            resend_cooldown_seconds: config.resend_cooldown_seconds,
            max_attempts: config.max_attempts,
            ..Default::default()
        }
    }
}
