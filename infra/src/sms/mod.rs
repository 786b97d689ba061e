//! SMS gateway adapters
//!
//! - **Twilio**: production delivery over the Twilio REST API
//! - **Mock**: records messages in memory for development and tests
//!
//! Provider failures are classified in [`error_mapping`] before they leave
//! this module.

use std::sync::Arc;

use bp_core::services::verification::SmsGateway;
use bp_shared::SmsConfig;

use crate::InfrastructureError;

pub mod error_mapping;
pub mod mock;
pub mod twilio;

pub use error_mapping::{classify_provider_error, PROVIDER_ERROR_TABLE};
pub use mock::{MockSmsGateway, SentMessage};
pub use twilio::{TwilioConfig, TwilioSmsGateway};

#[cfg(test)]
mod tests;

/// Build the SMS gateway named by `config.provider`
///
/// An unconfigured Twilio gateway is still returned; it fails each send with
/// `NotConfigured` instead of falling back to the mock.
pub fn create_sms_gateway(config: &SmsConfig) -> Result<Arc<dyn SmsGateway>, InfrastructureError> {
    match config.provider.trim().to_ascii_lowercase().as_str() {
        "mock" => {
            tracing::warn!("Using mock SMS gateway; messages are not delivered");
            Ok(Arc::new(MockSmsGateway::new()))
        }
        "twilio" => {
            let gateway = TwilioSmsGateway::new(TwilioConfig::from_settings(config))?;
            Ok(Arc::new(gateway))
        }
        other => Err(InfrastructureError::Config(format!(
            "Unknown SMS provider '{}'",
            other
        ))),
    }
}
