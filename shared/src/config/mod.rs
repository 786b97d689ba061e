//! Configuration module with business-specific sub-modules
//!
//! - `cache` - Redis connection for the Redis OTP store
//! - `database` - MySQL pool configuration
//! - `environment` - Environment detection and logging configuration
//! - `otp` - Code lifetime, resend cooldown, attempt limits and store selection
//! - `server` - HTTP server and CORS configuration
//! - `sms` - SMS gateway provider and credentials

pub mod cache;
pub mod database;
pub mod environment;
pub mod otp;
pub mod server;
pub mod sms;

use serde::{Deserialize, Serialize};

pub use cache::CacheConfig;
pub use database::DatabaseConfig;
pub use environment::{Environment, LogFormat, LoggingConfig};
pub use otp::{OtpConfig, OtpStoreBackend};
pub use server::{CorsConfig, ServerConfig};
pub use sms::{SmsConfig, TwilioSettings};

/// Complete application configuration combining all sub-configurations
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    /// Environment configuration
    #[serde(default)]
    pub environment: Environment,

    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Redis configuration
    #[serde(default)]
    pub cache: CacheConfig,

    /// SMS gateway configuration
    #[serde(default)]
    pub sms: SmsConfig,

    /// OTP lifecycle configuration
    #[serde(default)]
    pub otp: OtpConfig,

    /// CORS configuration
    #[serde(default)]
    pub cors: CorsConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        let env = Environment::default();
        Self {
            environment: env,
            server: ServerConfig::default(),
            database: DatabaseConfig::default(),
            cache: CacheConfig::default(),
            sms: SmsConfig::default(),
            otp: OtpConfig::default(),
            cors: CorsConfig::default(),
            logging: LoggingConfig::for_environment(env),
        }
    }
}

impl AppConfig {
    /// Build the configuration from plain environment variables
    pub fn from_env() -> Self {
        let environment = Environment::from_env();
        Self {
            environment,
            server: ServerConfig::from_env(),
            database: DatabaseConfig::from_env(),
            cache: CacheConfig::from_env(),
            sms: SmsConfig::from_env(),
            otp: OtpConfig::from_env(),
            cors: CorsConfig::from_env(),
            logging: LoggingConfig::from_env(environment),
        }
    }

    /// Configuration used by tests: in-memory store and mock gateway
    pub fn test() -> Self {
        Self {
            otp: OtpConfig {
                store: OtpStoreBackend::Memory,
                ..Default::default()
            },
            ..Default::default()
        }
    }
}
