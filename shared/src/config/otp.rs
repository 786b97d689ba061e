//! OTP lifecycle configuration module

use serde::{Deserialize, Serialize};

/// Which backend holds OTP records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OtpStoreBackend {
    Mysql,
    Redis,
    /// Process-local store, development and tests only
    Memory,
}

impl std::str::FromStr for OtpStoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mysql" => Ok(OtpStoreBackend::Mysql),
            "redis" => Ok(OtpStoreBackend::Redis),
            "memory" => Ok(OtpStoreBackend::Memory),
            _ => Err(format!("Invalid OTP store backend: {}", s)),
        }
    }
}

/// OTP issuance and verification limits
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OtpConfig {
    /// Lifetime of an issued code in seconds
    #[serde(default = "default_code_ttl")]
    pub code_ttl_seconds: i64,

    /// Minimum age of the current record before a new code may be issued
    #[serde(default = "default_resend_cooldown")]
    pub resend_cooldown_seconds: i64,

    /// Failed verifications allowed per code
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Storage backend
    #[serde(default = "default_store")]
    pub store: OtpStoreBackend,
}

impl Default for OtpConfig {
    fn default() -> Self {
        Self {
            code_ttl_seconds: default_code_ttl(),
            resend_cooldown_seconds: default_resend_cooldown(),
            max_attempts: default_max_attempts(),
            store: default_store(),
        }
    }
}

impl OtpConfig {
    /// Create from OTP_STORE; lifecycle limits keep their defaults unless overridden
    pub fn from_env() -> Self {
        let store = std::env::var("OTP_STORE")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or_else(default_store);

        Self {
            store,
            ..Default::default()
        }
    }
}

fn default_code_ttl() -> i64 {
    600
}

fn default_resend_cooldown() -> i64 {
    60
}

fn default_max_attempts() -> u32 {
    3
}

fn default_store() -> OtpStoreBackend {
    OtpStoreBackend::Mysql
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = OtpConfig::default();
        assert_eq!(config.code_ttl_seconds, 600);
        assert_eq!(config.resend_cooldown_seconds, 60);
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.store, OtpStoreBackend::Mysql);
    }

    #[test]
    fn test_backend_parse() {
        assert_eq!("Redis".parse::<OtpStoreBackend>().unwrap(), OtpStoreBackend::Redis);
        assert_eq!("memory".parse::<OtpStoreBackend>().unwrap(), OtpStoreBackend::Memory);
        assert!("postgres".parse::<OtpStoreBackend>().is_err());
    }
}
