//! One-time passcode record, the single persisted entity of phone verification.

use chrono::{DateTime, Duration, Utc};
use constant_time_eq::constant_time_eq;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::user_role::UserRole;

/// Maximum number of failed verifications per code
pub const MAX_ATTEMPTS: u32 = 3;

/// Length of the passcode
pub const CODE_LENGTH: usize = 6;

/// Default lifetime of a passcode (10 minutes)
pub const DEFAULT_EXPIRATION_SECONDS: i64 = 600;

/// Default minimum spacing between two issuances for the same phone
pub const DEFAULT_RESEND_COOLDOWN_SECONDS: i64 = 60;

/// Replaced codes remembered by a reissued record
pub const MAX_SUPERSEDED_CODES: usize = 4;

/// The active passcode for one phone number
///
/// At most one record exists per phone; issuing again replaces it.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtpRecord {
    /// Normalized E.164 phone number (store key)
    pub phone_number: String,

    /// The 6-digit passcode
    pub code: String,

    /// Role the caller asked to register as
    pub user_role: UserRole,

    /// Issuance timestamp
    pub created_at: DateTime<Utc>,

    /// `created_at` + code lifetime
    pub expires_at: DateTime<Utc>,

    /// Failed verifications so far
    pub attempt_count: u32,

    /// Codes this record replaced, newest first
    ///
    /// Submitting one of them is answered as "no active code" and does not
    /// count as a failed attempt against the current code.
    #[serde(default)]
    pub superseded_codes: Vec<String>,
}

impl std::fmt::Debug for OtpRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OtpRecord")
            .field("phone_number", &bp_shared::phone::mask_phone_number(&self.phone_number))
            .field("code", &"******")
            .field("user_role", &self.user_role)
            .field("created_at", &self.created_at)
            .field("expires_at", &self.expires_at)
            .field("attempt_count", &self.attempt_count)
            .field("superseded_codes", &self.superseded_codes.len())
            .finish()
    }
}

impl OtpRecord {
    /// Issues a fresh record with a random code
    ///
    /// # Arguments
    ///
    /// * `phone_number` - Normalized phone number
    /// * `user_role` - Role being registered
    /// * `now` - Issuance time
    /// * `ttl` - Code lifetime
    pub fn issue(phone_number: String, user_role: UserRole, now: DateTime<Utc>, ttl: Duration) -> Self {
        Self {
            phone_number,
            code: Self::generate_code(),
            user_role,
            created_at: now,
            expires_at: now + ttl,
            attempt_count: 0,
            superseded_codes: Vec::new(),
        }
    }

    /// Records that this issuance replaces `previous`
    ///
    /// Keeps the previous code and the codes it had replaced, bounded by
    /// [`MAX_SUPERSEDED_CODES`]. A previous record that already expired is
    /// not carried over.
    pub fn supersede(&mut self, previous: &OtpRecord) {
        if previous.is_expired_at(self.created_at) {
            return;
        }
        let mut codes = Vec::with_capacity(MAX_SUPERSEDED_CODES);
        codes.push(previous.code.clone());
        codes.extend(previous.superseded_codes.iter().cloned());
        codes.retain(|code| *code != self.code);
        codes.truncate(MAX_SUPERSEDED_CODES);
        self.superseded_codes = codes;
    }

    /// Uniform random code in `[100000, 999999]`, so it never starts with zero
    pub fn generate_code() -> String {
        let mut rng = rand::thread_rng();
        let code: u32 = rng.gen_range(100_000..=999_999);
        code.to_string()
    }

    /// Whether `code` has the shape of a passcode (six ASCII digits)
    pub fn is_well_formed_code(code: &str) -> bool {
        code.len() == CODE_LENGTH && code.bytes().all(|b| b.is_ascii_digit())
    }

    /// Strictly after `expires_at`
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    pub fn is_locked_out(&self, max_attempts: u32) -> bool {
        self.attempt_count >= max_attempts
    }

    pub fn remaining_attempts(&self, max_attempts: u32) -> u32 {
        max_attempts.saturating_sub(self.attempt_count)
    }

    /// Time left before another code may be issued, `None` once the cooldown has passed
    pub fn cooldown_remaining(&self, now: DateTime<Utc>, cooldown: Duration) -> Option<Duration> {
        let available_at = self.created_at + cooldown;
        if now < available_at {
            Some(available_at - now)
        } else {
            None
        }
    }

    /// Constant-time comparison against the stored code
    pub fn matches(&self, candidate: &str) -> bool {
        constant_time_eq(self.code.as_bytes(), candidate.as_bytes())
    }

    /// Whether `candidate` is a code this record replaced
    ///
    /// Compares against every remembered code so timing does not reveal which one matched.
    pub fn is_superseded_code(&self, candidate: &str) -> bool {
        self.superseded_codes
            .iter()
            .fold(false, |found, code| {
                found | constant_time_eq(code.as_bytes(), candidate.as_bytes())
            })
    }
}
