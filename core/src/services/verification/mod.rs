//! Verification service module for SMS-based phone verification
//!
//! This module provides the complete one-time passcode workflow:
//! - Code generation, dispatch and persistence (issue)
//! - Code verification with attempt tracking and lockout (verify)
//! - Server-side resend cooldown and expiry
//! - Integration with SMS gateways and OTP record stores

mod clock;
mod config;
mod service;
mod traits;
mod types;

#[cfg(test)]
mod tests;

pub use clock::ManualClock;
pub use config::{code_from_message, VerificationServiceConfig};
pub use service::VerificationService;
pub use traits::{Clock, SmsGateway, SystemClock};
pub use types::{IssueReceipt, VerifiedPhone};
