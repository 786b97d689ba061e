//! Shared utilities and common types for the barangay portal backend
//!
//! - Configuration types
//! - Error codes and the failure response body
//! - Phone normalization, validation and masking

pub mod config;
pub mod errors;
pub mod utils;

pub use config::{
    AppConfig, CacheConfig, CorsConfig, DatabaseConfig, Environment, LogFormat, LoggingConfig,
    OtpConfig, OtpStoreBackend, ServerConfig, SmsConfig, TwilioSettings,
};
pub use errors::{error_codes, ErrorResponse};
pub use utils::phone;
