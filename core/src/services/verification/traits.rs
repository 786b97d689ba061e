//! Traits for SMS gateway and clock integration

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::errors::GatewayError;

/// Trait for SMS gateway integration
///
/// Implementations translate every provider failure into a [`GatewayError`]
/// before returning; raw provider payloads never cross this boundary.
#[async_trait]
pub trait SmsGateway: Send + Sync {
    /// Send `message` to `phone` (normalized E.164), returning the provider message id
    async fn send(&self, phone: &str, message: &str) -> Result<String, GatewayError>;

    /// Provider name for logs and health output
    fn provider_name(&self) -> &str;

    /// Whether the gateway has the configuration it needs to send
    fn is_available(&self) -> bool;
}

/// Source of the current time
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
