//! Main verification service implementation

use std::sync::Arc;

use crate::domain::entities::{OtpRecord, UserRole};
use crate::domain::value_objects::PhoneNumber;
use crate::errors::{VerificationError, VerificationResult};
use crate::repositories::{IssueReservation, OtpRepository};

use super::config::VerificationServiceConfig;
use super::traits::{Clock, SmsGateway, SystemClock};
use super::types::{IssueReceipt, VerifiedPhone};

/// Issues and verifies one-time passcodes for phone numbers
///
/// Holds no per-phone state of its own; the repository is the source of truth.
pub struct VerificationService<S: SmsGateway + ?Sized, R: OtpRepository + ?Sized> {
    /// SMS gateway for dispatching codes
    sms_gateway: Arc<S>,
    /// Record store
    repository: Arc<R>,
    /// Time source for expiry and cooldown
    clock: Arc<dyn Clock>,
    /// Service configuration
    config: VerificationServiceConfig,
}

impl<S: SmsGateway + ?Sized, R: OtpRepository + ?Sized> VerificationService<S, R> {
    /// Create a new verification service using the system clock
    ///
    /// # Arguments
    ///
    /// * `sms_gateway` - SMS gateway implementation
    /// * `repository` - OTP record store
    /// * `config` - Service configuration
    pub fn new(sms_gateway: Arc<S>, repository: Arc<R>, config: VerificationServiceConfig) -> Self {
        Self::with_clock(sms_gateway, repository, config, Arc::new(SystemClock))
    }

    /// Create a new verification service with an explicit clock
    pub fn with_clock(
        sms_gateway: Arc<S>,
        repository: Arc<R>,
        config: VerificationServiceConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            sms_gateway,
            repository,
            clock,
            config,
        }
    }

    pub fn config(&self) -> &VerificationServiceConfig {
        &self.config
    }

    pub fn sms_gateway(&self) -> &Arc<S> {
        &self.sms_gateway
    }

    pub fn repository(&self) -> &Arc<R> {
        &self.repository
    }

    /// Issue a code to a phone number
    ///
    /// This method:
    /// 1. Validates and normalizes the phone number
    /// 2. Rejects the request while the previous code is inside its resend cooldown
    /// 3. Reserves the issuance slot so concurrent requests send at most one SMS
    /// 4. Generates a new code
    /// 5. Sends the code via SMS
    /// 6. Replaces any previous record with the new one
    ///
    /// Nothing is persisted and the reservation is released when dispatch
    /// fails. A store failure after a successful dispatch is reported as a
    /// post-dispatch persistence error.
    ///
    /// # Returns
    ///
    /// * `Ok(IssueReceipt)` - Expiry and resend times for the new code
    /// * `Err(VerificationError)` - Validation, cooldown, dispatch, configuration or persistence failure
    pub async fn issue(&self, phone: &str, role: UserRole) -> VerificationResult<IssueReceipt> {
        let phone = PhoneNumber::parse(phone).map_err(|err| {
            tracing::debug!(event = "otp_issue_invalid_phone", "Rejected malformed phone number");
            err
        })?;
        let masked = phone.masked();
        let now = self.clock.now();

        let existing = self.repository.find(phone.as_str()).await.map_err(|e| {
            tracing::error!(
                phone = %masked,
                error = %e,
                event = "otp_store_read_failed",
                "Failed to read existing verification code"
            );
            VerificationError::from_store(&e, false)
        })?;

        if let Some(existing) = existing.as_ref() {
            if let Some(remaining) = existing.cooldown_remaining(now, self.config.resend_cooldown()) {
                let retry_after_seconds = ceil_seconds(remaining);
                tracing::warn!(
                    phone = %masked,
                    retry_after_seconds,
                    event = "otp_cooldown_active",
                    "Verification code requested during resend cooldown"
                );
                return Err(VerificationError::CooldownActive { retry_after_seconds });
            }
        }

        match self
            .repository
            .reserve_issue(phone.as_str(), now, self.config.resend_cooldown())
            .await
        {
            Ok(IssueReservation::Reserved) => {}
            Ok(IssueReservation::Held { retry_after }) => {
                let retry_after_seconds = ceil_seconds(retry_after);
                tracing::warn!(
                    phone = %masked,
                    retry_after_seconds,
                    event = "otp_cooldown_active",
                    "Verification code already being issued for this phone"
                );
                return Err(VerificationError::CooldownActive { retry_after_seconds });
            }
            Err(e) => {
                tracing::error!(
                    phone = %masked,
                    error = %e,
                    event = "otp_reservation_failed",
                    "Failed to reserve verification code issuance"
                );
                return Err(VerificationError::from_store(&e, false));
            }
        }

        let mut record = OtpRecord::issue(
            phone.as_str().to_string(),
            role,
            now,
            self.config.code_ttl(),
        );
        if let Some(previous) = existing.as_ref() {
            record.supersede(previous);
        }

        let message = self.config.render_message(&record.code);
        let message_id = match self.sms_gateway.send(phone.as_str(), &message).await {
            Ok(message_id) => message_id,
            Err(e) => {
                tracing::warn!(
                    phone = %masked,
                    provider = self.sms_gateway.provider_name(),
                    failure = %e.failure(),
                    provider_code = ?e.provider_code(),
                    error = %e,
                    event = "otp_dispatch_failed",
                    "Failed to send verification code"
                );
                self.release_quietly(phone.as_str(), now, &masked).await;
                return Err(VerificationError::from_gateway(&e));
            }
        };

        if let Err(e) = self.repository.replace(&record).await {
            tracing::error!(
                phone = %masked,
                message_id = %message_id,
                error = %e,
                event = "otp_persist_after_dispatch_failed",
                "Verification code was sent but could not be stored; the delivered code is unusable"
            );
            self.release_quietly(phone.as_str(), now, &masked).await;
            return Err(VerificationError::from_store(&e, true));
        }

        tracing::info!(
            phone = %masked,
            role = %role,
            message_id = %message_id,
            expires_at = %record.expires_at,
            event = "otp_issued",
            "Issued verification code"
        );

        Ok(IssueReceipt {
            phone_number: phone.into_inner(),
            expires_at: record.expires_at,
            resend_available_at: record.created_at + self.config.resend_cooldown(),
            message_id,
        })
    }

    /// Verify a code for a phone number
    ///
    /// This method:
    /// 1. Validates the phone number and the code format (no attempt is consumed on bad input)
    /// 2. Looks up the active record
    /// 3. Deletes expired or locked-out records
    /// 4. Compares the code in constant time
    /// 5. Consumes the record on a match, or increments the attempt count on a mismatch
    ///
    /// Conditional store updates that lose a race are retried from the lookup
    /// a bounded number of times.
    ///
    /// # Returns
    ///
    /// * `Ok(VerifiedPhone)` - The code matched; carries the role given at issuance
    /// * `Err(VerificationError)` - Why verification was denied
    pub async fn verify(&self, phone: &str, code: &str) -> VerificationResult<VerifiedPhone> {
        let phone = PhoneNumber::parse(phone)?;
        let masked = phone.masked();

        let code = code.trim();
        if !OtpRecord::is_well_formed_code(code) {
            tracing::debug!(
                phone = %masked,
                event = "otp_invalid_code_format",
                "Rejected malformed verification code"
            );
            return Err(VerificationError::validation(
                "otpCode",
                "Enter the 6-digit code sent to your phone",
            ));
        }

        let max_attempts = self.config.max_attempts;

        for _ in 0..=self.config.max_conflict_retries {
            let record = match self.repository.find(phone.as_str()).await.map_err(|e| {
                tracing::error!(
                    phone = %masked,
                    error = %e,
                    event = "otp_store_read_failed",
                    "Failed to read verification code"
                );
                VerificationError::from_store(&e, false)
            })? {
                Some(record) => record,
                None => {
                    tracing::info!(
                        phone = %masked,
                        event = "otp_not_found",
                        "No active verification code"
                    );
                    return Err(VerificationError::NotFoundOrExpired);
                }
            };

            if record.is_expired_at(self.clock.now()) {
                self.discard_quietly(&record, &masked, "expired").await;
                tracing::info!(phone = %masked, event = "otp_expired", "Verification code expired");
                return Err(VerificationError::Expired);
            }

            if record.is_locked_out(max_attempts) {
                self.discard_quietly(&record, &masked, "locked_out").await;
                tracing::warn!(
                    phone = %masked,
                    event = "otp_locked_out",
                    "Verification attempted on a locked-out code"
                );
                return Err(VerificationError::LockedOut);
            }

            if record.matches(code) {
                if self.consume(&record, &masked).await? {
                    tracing::info!(
                        phone = %masked,
                        role = %record.user_role,
                        event = "otp_verified",
                        "Verification code successfully verified"
                    );
                    return Ok(VerifiedPhone {
                        phone_number: record.phone_number,
                        user_role: record.user_role,
                    });
                }
                tracing::debug!(phone = %masked, event = "otp_consume_conflict", "Retrying after concurrent update");
                continue;
            }

            if record.is_superseded_code(code) {
                tracing::info!(
                    phone = %masked,
                    event = "otp_superseded_code",
                    "Verification attempted with a replaced code"
                );
                return Err(VerificationError::NotFoundOrExpired);
            }

            match self.record_failed_attempt(&record, &masked).await? {
                Some(attempts) if attempts >= max_attempts => {
                    tracing::warn!(
                        phone = %masked,
                        attempts,
                        event = "otp_max_attempts_reached",
                        "Maximum verification attempts reached"
                    );
                    return Err(VerificationError::LockedOut);
                }
                Some(attempts) => {
                    let remaining_attempts = max_attempts - attempts;
                    tracing::warn!(
                        phone = %masked,
                        remaining_attempts,
                        event = "otp_verification_failed",
                        "Incorrect verification code"
                    );
                    return Err(VerificationError::InvalidCode { remaining_attempts });
                }
                None => {
                    tracing::debug!(phone = %masked, event = "otp_attempt_conflict", "Retrying after concurrent update");
                }
            }
        }

        tracing::error!(
            phone = %masked,
            event = "otp_verify_conflict_exhausted",
            "Verification record kept changing during verification"
        );
        Err(VerificationError::Persistence {
            message: "verification record changed concurrently".to_string(),
            after_dispatch: false,
        })
    }

    /// Whether the record store answers its health check
    pub async fn store_healthy(&self) -> bool {
        self.repository.health_check().await.is_ok()
    }

    async fn consume(&self, record: &OtpRecord, masked: &str) -> VerificationResult<bool> {
        self.repository.consume(record).await.map_err(|e| {
            tracing::error!(
                phone = %masked,
                error = %e,
                event = "otp_consume_failed",
                "Failed to consume verification code"
            );
            VerificationError::from_store(&e, false)
        })
    }

    async fn record_failed_attempt(
        &self,
        record: &OtpRecord,
        masked: &str,
    ) -> VerificationResult<Option<u32>> {
        self.repository.record_failed_attempt(record).await.map_err(|e| {
            tracing::error!(
                phone = %masked,
                error = %e,
                event = "otp_attempt_update_failed",
                "Failed to record verification attempt"
            );
            VerificationError::from_store(&e, false)
        })
    }

    async fn release_quietly(&self, phone_number: &str, reserved_at: chrono::DateTime<chrono::Utc>, masked: &str) {
        if let Err(e) = self.repository.release_issue(phone_number, reserved_at).await {
            tracing::warn!(
                phone = %masked,
                error = %e,
                event = "otp_release_failed",
                "Failed to release verification code reservation"
            );
        }
    }

    /// Lazy cleanup; the caller's answer does not depend on the delete succeeding
    async fn discard_quietly(&self, record: &OtpRecord, masked: &str, reason: &'static str) {
        if let Err(e) = self.repository.discard(record).await {
            tracing::warn!(
                phone = %masked,
                reason,
                error = %e,
                event = "otp_discard_failed",
                "Failed to delete stale verification code"
            );
        }
    }
}

/// Whole seconds, rounded up, never below one
fn ceil_seconds(duration: chrono::Duration) -> u64 {
    let millis = duration.num_milliseconds().max(0) as u64;
    millis.div_ceil(1000).max(1)
}
