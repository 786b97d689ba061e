//! OTP repository trait defining the interface for passcode record persistence.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use crate::domain::entities::OtpRecord;
use crate::errors::StoreError;

/// Outcome of [`OtpRepository::reserve_issue`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueReservation {
    /// The caller owns the issuance slot until it stores a record or releases it
    Reserved,
    /// Another issuance for this phone started within the cooldown
    Held {
        /// Time until the slot frees up
        retry_after: Duration,
    },
}

/// Durable keyed storage of OTP records, at most one per phone number
///
/// Every mutating operation that depends on a previously read record takes
/// that record as `observed` and only applies if the stored record is still
/// the same issuance (`created_at` and code) and, where noted, the same
/// `attempt_count`. A `false` / `None` result means another request changed
/// the record in between; the caller re-reads and decides again.
#[async_trait]
pub trait OtpRepository: Send + Sync {
    /// Load the record for a normalized phone number
    ///
    /// # Returns
    /// * `Ok(Some(OtpRecord))` - Record found
    /// * `Ok(None)` - No record for this phone
    /// * `Err(StoreError)` - Backend failure
    async fn find(&self, phone_number: &str) -> Result<Option<OtpRecord>, StoreError>;

    /// Atomically insert or overwrite the record for `record.phone_number`
    async fn replace(&self, record: &OtpRecord) -> Result<(), StoreError>;

    /// Delete the record if it is still `observed` (same issuance and attempt count)
    ///
    /// Exactly one of several concurrent callers holding the same observation gets `true`.
    async fn consume(&self, observed: &OtpRecord) -> Result<bool, StoreError>;

    /// Increment `attempt_count` if the stored record is still `observed`
    ///
    /// # Returns
    /// * `Ok(Some(n))` - The new attempt count
    /// * `Ok(None)` - The record changed or disappeared since it was read
    async fn record_failed_attempt(&self, observed: &OtpRecord) -> Result<Option<u32>, StoreError>;

    /// Delete the record if it is still the same issuance as `observed`
    ///
    /// Used for expiry and lockout cleanup; never removes a newer reissued record.
    async fn discard(&self, observed: &OtpRecord) -> Result<bool, StoreError>;

    /// Atomically claim the right to issue a code for `phone_number`
    ///
    /// Succeeds only if no other issuance for this phone was reserved within
    /// `cooldown` before `now`. Of several concurrent callers at most one gets
    /// [`IssueReservation::Reserved`]. The reservation is identified by `now`.
    async fn reserve_issue(
        &self,
        phone_number: &str,
        now: DateTime<Utc>,
        cooldown: Duration,
    ) -> Result<IssueReservation, StoreError>;

    /// Give back a reservation made at `reserved_at` so the phone can be issued again immediately
    ///
    /// A newer reservation for the same phone is left alone.
    async fn release_issue(&self, phone_number: &str, reserved_at: DateTime<Utc>) -> Result<(), StoreError>;

    /// Lightweight liveness check
    async fn health_check(&self) -> Result<(), StoreError>;
}
