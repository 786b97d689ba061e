//! Configuration loading
//!
//! Values are layered, later sources winning:
//! 1. Plain environment variables (`SERVER_PORT`, `TWILIO_AUTH_TOKEN`, ...)
//!    read by `AppConfig::from_env`
//! 2. An optional `config/{environment}.toml` file
//! 3. `BP__`-prefixed variables, e.g. `BP__OTP__CODE_TTL_SECONDS=300`

use bp_shared::AppConfig;
use config::{Config, ConfigError, Environment as EnvSource, File};

/// Load the application configuration
pub fn load_config() -> Result<AppConfig, ConfigError> {
    let base = AppConfig::from_env();
    let config_file = base.environment.config_file().to_string();
    layer(base, &config_file)
}

fn layer(base: AppConfig, config_file: &str) -> Result<AppConfig, ConfigError> {
    Config::builder()
        .add_source(Config::try_from(&base)?)
        .add_source(File::with_name(config_file).required(false))
        .add_source(EnvSource::with_prefix("BP").separator("__"))
        .build()?
        .try_deserialize()
}
