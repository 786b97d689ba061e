//! Phone verification route handlers
//!
//! - `POST /api/v1/otp/issue` sends a new code
//! - `POST /api/v1/otp/verify` checks a submitted code

use std::sync::Arc;

use actix_web::web;

use bp_core::repositories::OtpRepository;
use bp_core::services::verification::{SmsGateway, VerificationService};

pub mod issue;
pub mod verify;

pub use issue::issue_otp;
pub use verify::verify_otp;

/// Verification service over whichever gateway and store were configured
pub type OtpService = VerificationService<dyn SmsGateway, dyn OtpRepository>;

/// Application state shared by all workers
pub struct AppState {
    pub verification_service: Arc<OtpService>,
}

impl AppState {
    pub fn new(verification_service: Arc<OtpService>) -> Self {
        Self {
            verification_service,
        }
    }
}

/// Register the `/otp` scope
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/otp")
            .route("/issue", web::post().to(issue_otp))
            .route("/verify", web::post().to(verify_otp)),
    );
}
