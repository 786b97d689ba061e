//! Process-local OTP repository for development and tests

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::entities::OtpRecord;
use crate::errors::StoreError;

use super::r#trait::{IssueReservation, OtpRepository};

/// In-memory OTP repository
///
/// A single write lock per map makes every conditional operation atomic. Reads and
/// writes can be made to fail on demand to exercise persistence error paths.
pub struct InMemoryOtpRepository {
    records: Arc<RwLock<HashMap<String, OtpRecord>>>,
    reservations: Arc<RwLock<HashMap<String, DateTime<Utc>>>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    fail_reservations: AtomicBool,
    calls: AtomicUsize,
}

impl InMemoryOtpRepository {
    /// Create a new, empty repository
    pub fn new() -> Self {
        Self {
            records: Arc::new(RwLock::new(HashMap::new())),
            reservations: Arc::new(RwLock::new(HashMap::new())),
            fail_reads: AtomicBool::new(false),
            fail_writes: AtomicBool::new(false),
            fail_reservations: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
        }
    }

    /// Make subsequent `find` calls fail
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make subsequent record writes fail
    ///
    /// Issuance reservations are unaffected; see [`Self::set_fail_reservations`].
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Make subsequent `reserve_issue` / `release_issue` calls fail
    pub fn set_fail_reservations(&self, fail: bool) {
        self.fail_reservations.store(fail, Ordering::SeqCst);
    }

    /// Number of repository operations performed so far
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Number of stored records
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    fn check_read(&self) -> Result<(), StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::unavailable("in-memory store read failure"));
        }
        Ok(())
    }

    fn check_write(&self) -> Result<(), StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::unavailable("in-memory store write failure"));
        }
        Ok(())
    }

    fn check_reservation(&self) -> Result<(), StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_reservations.load(Ordering::SeqCst) {
            return Err(StoreError::unavailable("in-memory store reservation failure"));
        }
        Ok(())
    }
}

impl Default for InMemoryOtpRepository {
    fn default() -> Self {
        Self::new()
    }
}

fn same_issuance(stored: &OtpRecord, observed: &OtpRecord) -> bool {
    stored.created_at == observed.created_at && stored.code == observed.code
}

#[async_trait]
impl OtpRepository for InMemoryOtpRepository {
    async fn find(&self, phone_number: &str) -> Result<Option<OtpRecord>, StoreError> {
        self.check_read()?;
        let records = self.records.read().await;
        Ok(records.get(phone_number).cloned())
    }

    async fn replace(&self, record: &OtpRecord) -> Result<(), StoreError> {
        self.check_write()?;
        let mut records = self.records.write().await;
        records.insert(record.phone_number.clone(), record.clone());
        Ok(())
    }

    async fn consume(&self, observed: &OtpRecord) -> Result<bool, StoreError> {
        self.check_write()?;
        let mut records = self.records.write().await;
        let still_current = records.get(&observed.phone_number).is_some_and(|stored| {
            same_issuance(stored, observed) && stored.attempt_count == observed.attempt_count
        });
        if still_current {
            records.remove(&observed.phone_number);
        }
        Ok(still_current)
    }

    async fn record_failed_attempt(&self, observed: &OtpRecord) -> Result<Option<u32>, StoreError> {
        self.check_write()?;
        let mut records = self.records.write().await;
        match records.get_mut(&observed.phone_number) {
            Some(stored)
                if same_issuance(stored, observed)
                    && stored.attempt_count == observed.attempt_count =>
            {
                stored.attempt_count += 1;
                Ok(Some(stored.attempt_count))
            }
            _ => Ok(None),
        }
    }

    async fn discard(&self, observed: &OtpRecord) -> Result<bool, StoreError> {
        self.check_write()?;
        let mut records = self.records.write().await;
        let same = records
            .get(&observed.phone_number)
            .is_some_and(|stored| same_issuance(stored, observed));
        if same {
            records.remove(&observed.phone_number);
        }
        Ok(same)
    }

    async fn reserve_issue(
        &self,
        phone_number: &str,
        now: DateTime<Utc>,
        cooldown: Duration,
    ) -> Result<IssueReservation, StoreError> {
        self.check_reservation()?;
        let mut reservations = self.reservations.write().await;
        if let Some(reserved_at) = reservations.get(phone_number) {
            let available_at = *reserved_at + cooldown;
            if now < available_at {
                return Ok(IssueReservation::Held {
                    retry_after: available_at - now,
                });
            }
        }
        reservations.insert(phone_number.to_string(), now);
        Ok(IssueReservation::Reserved)
    }

    async fn release_issue(&self, phone_number: &str, reserved_at: DateTime<Utc>) -> Result<(), StoreError> {
        self.check_reservation()?;
        let mut reservations = self.reservations.write().await;
        if reservations.get(phone_number) == Some(&reserved_at) {
            reservations.remove(phone_number);
        }
        Ok(())
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::unavailable("in-memory store read failure"));
        }
        Ok(())
    }
}
