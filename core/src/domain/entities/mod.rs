//! Domain entities representing core business objects.

pub mod otp_record;
pub mod user_role;

pub use otp_record::{
    OtpRecord, CODE_LENGTH, DEFAULT_EXPIRATION_SECONDS, DEFAULT_RESEND_COOLDOWN_SECONDS,
    MAX_ATTEMPTS,
};
pub use user_role::UserRole;
