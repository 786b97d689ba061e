//! # Barangay Portal Core
//!
//! Core domain layer for phone verification: the OTP record entity, the
//! error taxonomy, the record store and SMS gateway interfaces, and the
//! verification service that issues and verifies codes.

pub mod domain;
pub mod errors;
pub mod repositories;
pub mod services;

pub use domain::*;
pub use errors::*;
pub use repositories::*;
pub use services::*;
