//! Database module - MySQL implementations using SQLx
//!
//! - Connection pool management
//! - The `phone_otps` OTP record store
//!
//! The schema lives in `infra/migrations/`.

pub mod connection;
pub mod otp_repository;

pub use connection::DatabasePool;
pub use otp_repository::MySqlOtpRepository;
