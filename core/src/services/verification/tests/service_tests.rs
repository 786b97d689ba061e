//! Unit tests for verification service

use chrono::{Duration, TimeZone, Utc};
use std::sync::Arc;

use crate::domain::entities::{OtpRecord, UserRole, CODE_LENGTH};
use crate::errors::{DispatchFailure, GatewayError, VerificationError};
use crate::repositories::{InMemoryOtpRepository, OtpRepository};
use crate::services::verification::{
    Clock, ManualClock, VerificationService, VerificationServiceConfig,
};

use super::mocks::MockSmsGateway;

const PHONE: &str = "+639171234567";

struct Harness {
    gateway: Arc<MockSmsGateway>,
    repo: Arc<InMemoryOtpRepository>,
    clock: Arc<ManualClock>,
    service: Arc<VerificationService<MockSmsGateway, InMemoryOtpRepository>>,
}

fn harness() -> Harness {
    let gateway = Arc::new(MockSmsGateway::new());
    let repo = Arc::new(InMemoryOtpRepository::new());
    let clock = Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap()));
    let service = Arc::new(VerificationService::with_clock(
        gateway.clone(),
        repo.clone(),
        VerificationServiceConfig::default(),
        clock.clone(),
    ));
    Harness {
        gateway,
        repo,
        clock,
        service,
    }
}

async fn stored(h: &Harness, phone: &str) -> Option<OtpRecord> {
    h.repo.find(phone).await.unwrap()
}

/// Any six-digit code that differs from `code`
fn wrong_code(code: &str) -> String {
    if code == "111111" { "222222" } else { "111111" }.to_string()
}

#[tokio::test]
async fn test_issue_success() {
    let h = harness();
    let now = h.clock.now();

    let receipt = h.service.issue(PHONE, UserRole::Resident).await.unwrap();

    assert_eq!(receipt.phone_number, PHONE);
    assert_eq!(receipt.expires_at, now + Duration::seconds(600));
    assert_eq!(receipt.resend_available_at, now + Duration::seconds(60));
    assert_eq!(receipt.message_id, "mock-msg-1");

    let record = stored(&h, PHONE).await.unwrap();
    assert_eq!(record.code.len(), CODE_LENGTH);
    assert_eq!(record.attempt_count, 0);
    assert_eq!(record.user_role, UserRole::Resident);
    assert_eq!(h.gateway.last_code_for(PHONE), Some(record.code));
}

#[tokio::test]
async fn test_issue_normalizes_phone() {
    let h = harness();

    let receipt = h.service.issue("+63 917-123-4567", UserRole::Official).await.unwrap();

    assert_eq!(receipt.phone_number, PHONE);
    let code = h.gateway.last_code_for(PHONE).unwrap();
    let verified = h.service.verify("+63 (917) 123 4567", &code).await.unwrap();
    assert_eq!(verified.user_role, UserRole::Official);
}

#[tokio::test]
async fn test_issue_invalid_phone_touches_nothing() {
    let h = harness();

    let err = h.service.issue("12345", UserRole::Resident).await.unwrap_err();

    assert!(matches!(err, VerificationError::Validation { .. }));
    assert_eq!(h.repo.call_count(), 0);
    assert_eq!(h.gateway.sent_count(), 0);
}

#[tokio::test]
async fn test_issue_cooldown_active() {
    let h = harness();
    h.service.issue(PHONE, UserRole::Resident).await.unwrap();

    h.clock.advance(Duration::seconds(20));
    let err = h.service.issue(PHONE, UserRole::Resident).await.unwrap_err();

    assert_eq!(err, VerificationError::CooldownActive { retry_after_seconds: 40 });
    assert_eq!(h.gateway.sent_count(), 1);
}

#[tokio::test]
async fn test_reissue_after_cooldown_invalidates_old_code() {
    let h = harness();
    h.service.issue(PHONE, UserRole::Resident).await.unwrap();
    let first_code = h.gateway.last_code_for(PHONE).unwrap();

    let mut second_code = first_code.clone();
    // Retry until the new code differs so the assertion below is meaningful
    while second_code == first_code {
        h.clock.advance(Duration::seconds(61));
        h.service.issue(PHONE, UserRole::Resident).await.unwrap();
        second_code = h.gateway.last_code_for(PHONE).unwrap();
    }

    let err = h.service.verify(PHONE, &first_code).await.unwrap_err();
    assert_eq!(err, VerificationError::NotFoundOrExpired);
    // The replaced code does not count against the new one
    assert_eq!(stored(&h, PHONE).await.unwrap().attempt_count, 0);

    let verified = h.service.verify(PHONE, &second_code).await.unwrap();
    assert_eq!(verified.phone_number, PHONE);
}

#[tokio::test]
async fn test_codes_replaced_twice_are_still_refused() {
    let h = harness();
    let mut codes: Vec<String> = Vec::new();
    while codes.len() < 3 {
        h.service.issue(PHONE, UserRole::Resident).await.unwrap();
        let code = h.gateway.last_code_for(PHONE).unwrap();
        if !codes.contains(&code) {
            codes.push(code);
        }
        h.clock.advance(Duration::seconds(61));
    }
    let current = stored(&h, PHONE).await.unwrap().code;

    for old in codes.iter().filter(|code| **code != current) {
        assert_eq!(
            h.service.verify(PHONE, old).await.unwrap_err(),
            VerificationError::NotFoundOrExpired
        );
    }
    assert_eq!(stored(&h, PHONE).await.unwrap().attempt_count, 0);
    assert!(h.service.verify(PHONE, &current).await.is_ok());
}

#[tokio::test]
async fn test_verify_success_is_single_use() {
    let h = harness();
    h.service.issue(PHONE, UserRole::Resident).await.unwrap();
    let code = h.gateway.last_code_for(PHONE).unwrap();

    let verified = h.service.verify(PHONE, &code).await.unwrap();
    assert_eq!(verified.user_role, UserRole::Resident);
    assert!(h.repo.is_empty().await);

    let err = h.service.verify(PHONE, &code).await.unwrap_err();
    assert_eq!(err, VerificationError::NotFoundOrExpired);
}

#[tokio::test]
async fn test_three_wrong_codes_lock_out() {
    let h = harness();
    h.service.issue("+15551234567", UserRole::Official).await.unwrap();
    let code = h.gateway.last_code_for("+15551234567").unwrap();
    let wrong = wrong_code(&code);

    assert_eq!(
        h.service.verify("+15551234567", &wrong).await.unwrap_err(),
        VerificationError::InvalidCode { remaining_attempts: 2 }
    );
    assert_eq!(
        h.service.verify("+15551234567", &wrong).await.unwrap_err(),
        VerificationError::InvalidCode { remaining_attempts: 1 }
    );
    assert_eq!(
        h.service.verify("+15551234567", &wrong).await.unwrap_err(),
        VerificationError::LockedOut
    );

    // Even the correct code is refused, and the record is then removed
    assert_eq!(
        h.service.verify("+15551234567", &code).await.unwrap_err(),
        VerificationError::LockedOut
    );
    assert!(stored(&h, "+15551234567").await.is_none());
}

#[tokio::test]
async fn test_expired_code_is_deleted() {
    let h = harness();
    h.service.issue(PHONE, UserRole::Resident).await.unwrap();
    let code = h.gateway.last_code_for(PHONE).unwrap();

    h.clock.advance(Duration::seconds(601));
    let err = h.service.verify(PHONE, &code).await.unwrap_err();

    assert_eq!(err, VerificationError::Expired);
    assert!(stored(&h, PHONE).await.is_none());
}

#[tokio::test]
async fn test_code_valid_until_exact_expiry() {
    let h = harness();
    h.service.issue(PHONE, UserRole::Resident).await.unwrap();
    let code = h.gateway.last_code_for(PHONE).unwrap();

    h.clock.advance(Duration::seconds(600));
    assert!(h.service.verify(PHONE, &code).await.is_ok());
}

#[tokio::test]
async fn test_verify_without_record() {
    let h = harness();
    let err = h.service.verify(PHONE, "123456").await.unwrap_err();
    assert_eq!(err, VerificationError::NotFoundOrExpired);
}

#[tokio::test]
async fn test_malformed_code_does_not_consume_attempt() {
    let h = harness();
    h.service.issue(PHONE, UserRole::Resident).await.unwrap();

    for bad in ["12345", "abcdef", "1234567", ""] {
        let err = h.service.verify(PHONE, bad).await.unwrap_err();
        assert!(matches!(err, VerificationError::Validation { .. }), "{bad}");
    }
    assert_eq!(stored(&h, PHONE).await.unwrap().attempt_count, 0);
}

#[tokio::test]
async fn test_dispatch_region_failure_persists_nothing() {
    let h = harness();
    h.gateway.fail_next(GatewayError::Rejected {
        failure: DispatchFailure::UnsupportedRegion,
        provider_code: Some(21408),
        detail: "Permission to send an SMS has not been enabled for the region".to_string(),
    });

    let err = h.service.issue(PHONE, UserRole::Resident).await.unwrap_err();

    assert_eq!(err.user_message(), "SMS not available for your region");
    assert!(matches!(
        err,
        VerificationError::Dispatch {
            failure: DispatchFailure::UnsupportedRegion,
            provider_code: Some(21408)
        }
    ));
    assert!(h.repo.is_empty().await);
}

#[tokio::test]
async fn test_dispatch_failure_allows_immediate_retry() {
    let h = harness();
    h.gateway.fail_next(GatewayError::Timeout);

    assert!(h.service.issue(PHONE, UserRole::Resident).await.is_err());
    assert!(h.service.issue(PHONE, UserRole::Resident).await.is_ok());
}

#[tokio::test]
async fn test_missing_credentials_is_configuration_error() {
    let h = harness();
    h.gateway.fail_next(GatewayError::NotConfigured {
        missing: vec!["TWILIO_ACCOUNT_SID".to_string()],
    });

    let err = h.service.issue(PHONE, UserRole::Resident).await.unwrap_err();

    assert!(matches!(err, VerificationError::Configuration { .. }));
    assert_eq!(err.user_message(), "Verification temporarily unavailable");
}

#[tokio::test]
async fn test_persistence_failure_after_dispatch() {
    let h = harness();
    h.repo.set_fail_writes(true);

    let err = h.service.issue(PHONE, UserRole::Resident).await.unwrap_err();

    assert!(matches!(
        err,
        VerificationError::Persistence { after_dispatch: true, .. }
    ));
    assert_eq!(h.gateway.sent_count(), 1);

    // The undeliverable code does not hold the phone in cooldown
    h.repo.set_fail_writes(false);
    assert!(h.service.issue(PHONE, UserRole::Resident).await.is_ok());
    assert_eq!(h.gateway.sent_count(), 2);
}

#[tokio::test]
async fn test_reservation_failure_before_dispatch() {
    let h = harness();
    h.repo.set_fail_reservations(true);

    let err = h.service.issue(PHONE, UserRole::Resident).await.unwrap_err();

    assert!(matches!(
        err,
        VerificationError::Persistence { after_dispatch: false, .. }
    ));
    assert_eq!(h.gateway.sent_count(), 0);
    assert!(h.repo.is_empty().await);
}

#[tokio::test]
async fn test_store_read_failure_before_dispatch() {
    let h = harness();
    h.repo.set_fail_reads(true);

    let err = h.service.issue(PHONE, UserRole::Resident).await.unwrap_err();

    assert!(matches!(
        err,
        VerificationError::Persistence { after_dispatch: false, .. }
    ));
    assert_eq!(h.gateway.sent_count(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_correct_submissions_single_winner() {
    let h = harness();
    h.service.issue(PHONE, UserRole::Resident).await.unwrap();
    let code = h.gateway.last_code_for(PHONE).unwrap();

    let mut handles = Vec::new();
    for _ in 0..10 {
        let service = h.service.clone();
        let code = code.clone();
        handles.push(tokio::spawn(async move { service.verify(PHONE, &code).await }));
    }

    let mut successes = 0;
    for handle in handles {
        if handle.await.unwrap().is_ok() {
            successes += 1;
        }
    }
    assert_eq!(successes, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_wrong_submissions_cannot_bypass_lockout() {
    let h = harness();
    h.service.issue(PHONE, UserRole::Resident).await.unwrap();
    let code = h.gateway.last_code_for(PHONE).unwrap();
    let wrong = wrong_code(&code);

    let mut handles = Vec::new();
    for _ in 0..10 {
        let service = h.service.clone();
        let wrong = wrong.clone();
        handles.push(tokio::spawn(async move { service.verify(PHONE, &wrong).await }));
    }

    let mut invalid_code_responses = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => panic!("wrong code accepted"),
            Err(VerificationError::InvalidCode { .. }) => invalid_code_responses += 1,
            Err(_) => {}
        }
    }
    assert!(invalid_code_responses <= 2);
    assert!(h.service.verify(PHONE, &code).await.is_err());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_issues_send_one_code() {
    let h = harness();
    h.gateway.delay_sends(std::time::Duration::from_millis(50));

    let mut handles = Vec::new();
    for _ in 0..5 {
        let service = h.service.clone();
        handles.push(tokio::spawn(async move {
            service.issue(PHONE, UserRole::Resident).await
        }));
    }

    let mut issued = 0;
    let mut cooldowns = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => issued += 1,
            Err(VerificationError::CooldownActive { retry_after_seconds }) => {
                assert_eq!(retry_after_seconds, 60);
                cooldowns += 1;
            }
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }

    assert_eq!(issued, 1);
    assert_eq!(cooldowns, 4);
    assert_eq!(h.gateway.sent_count(), 1);
    let code = h.gateway.last_code_for(PHONE).unwrap();
    assert!(h.service.verify(PHONE, &code).await.is_ok());
}
