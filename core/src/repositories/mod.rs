pub mod otp;

pub use otp::{InMemoryOtpRepository, IssueReservation, OtpRepository};
