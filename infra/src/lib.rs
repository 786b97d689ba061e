//! # Infrastructure Layer
//!
//! Concrete implementations of the core crate's interfaces:
//! - **Database**: MySQL OTP record store using SQLx
//! - **Cache**: Redis OTP record store with Lua-scripted conditional updates
//! - **SMS**: Twilio REST gateway and a mock gateway for development
//!
//! ## Features
//!
//! - `mysql`: Enable the MySQL store (default)
//! - `redis-cache`: Enable the Redis store (default)

use std::sync::Arc;

use bp_core::repositories::{InMemoryOtpRepository, OtpRepository};
use bp_core::errors::StoreError;
use bp_shared::{AppConfig, OtpStoreBackend};

/// Database module - MySQL implementations using SQLx
#[cfg(feature = "mysql")]
pub mod database;

/// Cache module - Redis client and the Redis OTP store
#[cfg(feature = "redis-cache")]
pub mod cache;

/// SMS gateway module - external SMS providers
pub mod sms;

pub use sms::create_sms_gateway;

/// Build the OTP record store selected by `config.otp.store`
pub async fn create_otp_repository(
    config: &AppConfig,
) -> Result<Arc<dyn OtpRepository>, InfrastructureError> {
    match config.otp.store {
        OtpStoreBackend::Memory => {
            tracing::warn!(
                backend = "memory",
                "Using process-local OTP store; records are lost on restart"
            );
            Ok(Arc::new(InMemoryOtpRepository::new()))
        }
        #[cfg(feature = "mysql")]
        OtpStoreBackend::Mysql => {
            let pool = database::DatabasePool::new(&config.database).await?;
            Ok(Arc::new(database::MySqlOtpRepository::new(pool.get_pool().clone())))
        }
        #[cfg(feature = "redis-cache")]
        OtpStoreBackend::Redis => {
            let client = cache::RedisClient::new(config.cache.clone()).await?;
            Ok(Arc::new(cache::RedisOtpRepository::new(client)))
        }
        #[allow(unreachable_patterns)]
        other => Err(InfrastructureError::Config(format!(
            "OTP store backend {:?} is not compiled in",
            other
        ))),
    }
}

/// Infrastructure-specific error types
#[derive(Debug, thiserror::Error)]
pub enum InfrastructureError {
    /// Database connection error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Redis error
    #[error("Cache error: {0}")]
    Cache(#[from] redis::RedisError),

    /// HTTP client construction error
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<InfrastructureError> for StoreError {
    fn from(err: InfrastructureError) -> Self {
        StoreError::unavailable(err.to_string())
    }
}
