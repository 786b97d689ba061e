//! Application factory
//!
//! Builds the Actix-web application around an already wired [`AppState`].

use actix_web::{
    body::MessageBody,
    dev::{ServiceFactory, ServiceRequest, ServiceResponse},
    web, App,
};
use tracing_actix_web::TracingLogger;

use bp_shared::{CorsConfig, Environment};

use crate::handlers::error::{json_error_handler, not_found};
use crate::middleware::cors::create_cors;
use crate::routes::{
    health::{api_documentation, health_check},
    otp::{self, AppState},
};

/// Default JSON body limit when none is configured
pub const DEFAULT_MAX_PAYLOAD_SIZE: usize = 16 * 1024;

/// Create and configure the application
pub fn create_app(
    app_state: web::Data<AppState>,
    cors: &CorsConfig,
    environment: Environment,
    max_payload_size: usize,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse<impl MessageBody>,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    let json_config = web::JsonConfig::default()
        .limit(max_payload_size)
        .error_handler(json_error_handler);

    App::new()
        .app_data(app_state)
        .app_data(json_config)
        .wrap(create_cors(cors, environment))
        // Registered last so the request span also covers CORS rejections
        .wrap(TracingLogger::default())
        .route("/health", web::get().to(health_check))
        .service(
            web::scope("/api/v1")
                .configure(otp::configure)
                .route("/", web::get().to(api_documentation)),
        )
        .default_service(web::route().to(not_found))
}
