use std::sync::Arc;
use std::time::Duration;

use actix_web::{web, HttpServer};
use tracing::info;
use tracing_subscriber::EnvFilter;

use bp_api::app::create_app;
use bp_api::config::load_config;
use bp_api::routes::otp::{AppState, OtpService};
use bp_core::services::verification::VerificationServiceConfig;
use bp_infra::{create_otp_repository, create_sms_gateway};
use bp_shared::{LogFormat, LoggingConfig};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let config = load_config()?;
    init_tracing(&config.logging);

    info!(
        environment = %config.environment,
        store = ?config.otp.store,
        sms_provider = %config.sms.provider,
        "Starting Barangay Portal API server"
    );

    let sms_gateway = create_sms_gateway(&config.sms)?;
    let repository = create_otp_repository(&config).await?;
    let service: Arc<OtpService> = Arc::new(OtpService::new(
        sms_gateway,
        repository,
        VerificationServiceConfig::from(&config.otp),
    ));
    let app_state = web::Data::new(AppState::new(service));

    let bind_address = config.server.bind_address();
    let cors = config.cors.clone();
    let environment = config.environment;
    let max_payload_size = config.server.max_payload_size;

    info!(address = %bind_address, "Server will bind");

    let mut server = HttpServer::new(move || {
        create_app(app_state.clone(), &cors, environment, max_payload_size)
    })
    .keep_alive(Duration::from_secs(config.server.keep_alive));

    if config.server.workers > 0 {
        server = server.workers(config.server.workers);
    }

    server.bind(&bind_address)?.run().await?;
    Ok(())
}

/// Install the global subscriber; `RUST_LOG` overrides the configured level
fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(logging.colored);

    match logging.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.pretty().init(),
        LogFormat::Compact => builder.compact().init(),
    }
}
