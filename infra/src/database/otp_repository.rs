//! MySQL OTP record store
//!
//! One row per phone number in `phone_otps`. Replacement is an upsert;
//! attempt increments and deletions are conditional on the observed row so
//! concurrent verifications cannot bypass the attempt limit or consume a
//! code twice. Issuance reservations live in `phone_otp_issue_locks`.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sqlx::mysql::MySqlRow;
use sqlx::{MySql, Pool, Row};
use tracing::{debug, error};

use bp_core::domain::entities::{OtpRecord, UserRole};
use bp_core::errors::StoreError;
use bp_core::repositories::{IssueReservation, OtpRepository};
use bp_shared::phone::mask_phone_number;

/// MySQL-backed OTP repository
pub struct MySqlOtpRepository {
    /// Database connection pool
    pool: Pool<MySql>,
}

impl MySqlOtpRepository {
    /// Create a new OTP repository
    pub fn new(pool: Pool<MySql>) -> Self {
        Self { pool }
    }

    fn map_row(row: &MySqlRow) -> Result<OtpRecord, StoreError> {
        let column = |name: &str, e: sqlx::Error| {
            StoreError::corrupt(format!("Failed to read column {}: {}", name, e))
        };

        let role: String = row.try_get("user_role").map_err(|e| column("user_role", e))?;
        let user_role: UserRole = role.parse().map_err(StoreError::corrupt)?;

        Ok(OtpRecord {
            phone_number: row
                .try_get("phone_number")
                .map_err(|e| column("phone_number", e))?,
            code: row.try_get("otp_code").map_err(|e| column("otp_code", e))?,
            user_role,
            created_at: row
                .try_get::<DateTime<Utc>, _>("created_at")
                .map_err(|e| column("created_at", e))?,
            expires_at: row
                .try_get::<DateTime<Utc>, _>("expires_at")
                .map_err(|e| column("expires_at", e))?,
            attempt_count: row
                .try_get("attempt_count")
                .map_err(|e| column("attempt_count", e))?,
            superseded_codes: split_codes(
                &row.try_get::<String, _>("superseded_codes")
                    .map_err(|e| column("superseded_codes", e))?,
            ),
        })
    }

    fn db_error(operation: &'static str, phone: &str, e: sqlx::Error) -> StoreError {
        error!(
            phone = %mask_phone_number(phone),
            operation,
            error = %e,
            "OTP database operation failed"
        );
        StoreError::unavailable(format!("{} failed: {}", operation, e))
    }
}

fn split_codes(joined: &str) -> Vec<String> {
    joined
        .split(',')
        .filter(|code| !code.is_empty())
        .map(str::to_string)
        .collect()
}

#[async_trait]
impl OtpRepository for MySqlOtpRepository {
    async fn find(&self, phone_number: &str) -> Result<Option<OtpRecord>, StoreError> {
        let query = r#"
            SELECT phone_number, otp_code, user_role, created_at, expires_at, attempt_count,
                   superseded_codes
            FROM phone_otps
            WHERE phone_number = ?
        "#;

        let row = sqlx::query(query)
            .bind(phone_number)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| Self::db_error("find", phone_number, e))?;

        row.as_ref().map(Self::map_row).transpose()
    }

    async fn replace(&self, record: &OtpRecord) -> Result<(), StoreError> {
        let query = r#"
            INSERT INTO phone_otps (
                phone_number, otp_code, user_role, created_at, expires_at, attempt_count,
                superseded_codes
            ) VALUES (?, ?, ?, ?, ?, ?, ?)
            ON DUPLICATE KEY UPDATE
                otp_code = VALUES(otp_code),
                user_role = VALUES(user_role),
                created_at = VALUES(created_at),
                expires_at = VALUES(expires_at),
                attempt_count = VALUES(attempt_count),
                superseded_codes = VALUES(superseded_codes)
        "#;

        sqlx::query(query)
            .bind(&record.phone_number)
            .bind(&record.code)
            .bind(record.user_role.as_str())
            .bind(record.created_at)
            .bind(record.expires_at)
            .bind(record.attempt_count)
            .bind(record.superseded_codes.join(","))
            .execute(&self.pool)
            .await
            .map_err(|e| Self::db_error("replace", &record.phone_number, e))?;

        debug!(
            phone = %mask_phone_number(&record.phone_number),
            "Stored OTP record"
        );
        Ok(())
    }

    async fn consume(&self, observed: &OtpRecord) -> Result<bool, StoreError> {
        let query = r#"
            DELETE FROM phone_otps
            WHERE phone_number = ? AND created_at = ? AND otp_code = ? AND attempt_count = ?
        "#;

        let result = sqlx::query(query)
            .bind(&observed.phone_number)
            .bind(observed.created_at)
            .bind(&observed.code)
            .bind(observed.attempt_count)
            .execute(&self.pool)
            .await
            .map_err(|e| Self::db_error("consume", &observed.phone_number, e))?;

        Ok(result.rows_affected() == 1)
    }

    async fn record_failed_attempt(&self, observed: &OtpRecord) -> Result<Option<u32>, StoreError> {
        let query = r#"
            UPDATE phone_otps
            SET attempt_count = attempt_count + 1
            WHERE phone_number = ? AND created_at = ? AND otp_code = ? AND attempt_count = ?
        "#;

        let result = sqlx::query(query)
            .bind(&observed.phone_number)
            .bind(observed.created_at)
            .bind(&observed.code)
            .bind(observed.attempt_count)
            .execute(&self.pool)
            .await
            .map_err(|e| Self::db_error("record_failed_attempt", &observed.phone_number, e))?;

        if result.rows_affected() == 1 {
            Ok(Some(observed.attempt_count + 1))
        } else {
            Ok(None)
        }
    }

    async fn discard(&self, observed: &OtpRecord) -> Result<bool, StoreError> {
        let query = r#"
            DELETE FROM phone_otps
            WHERE phone_number = ? AND created_at = ? AND otp_code = ?
        "#;

        let result = sqlx::query(query)
            .bind(&observed.phone_number)
            .bind(observed.created_at)
            .bind(&observed.code)
            .execute(&self.pool)
            .await
            .map_err(|e| Self::db_error("discard", &observed.phone_number, e))?;

        Ok(result.rows_affected() == 1)
    }

    async fn reserve_issue(
        &self,
        phone_number: &str,
        now: DateTime<Utc>,
        cooldown: Duration,
    ) -> Result<IssueReservation, StoreError> {
        let inserted = sqlx::query(
            "INSERT IGNORE INTO phone_otp_issue_locks (phone_number, reserved_at) VALUES (?, ?)",
        )
        .bind(phone_number)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| Self::db_error("reserve_issue", phone_number, e))?;
        if inserted.rows_affected() == 1 {
            return Ok(IssueReservation::Reserved);
        }

        let taken_over = sqlx::query(
            r#"
            UPDATE phone_otp_issue_locks
            SET reserved_at = ?
            WHERE phone_number = ? AND reserved_at <= ?
            "#,
        )
        .bind(now)
        .bind(phone_number)
        .bind(now - cooldown)
        .execute(&self.pool)
        .await
        .map_err(|e| Self::db_error("reserve_issue", phone_number, e))?;
        if taken_over.rows_affected() == 1 {
            return Ok(IssueReservation::Reserved);
        }

        let reserved_at: Option<DateTime<Utc>> = sqlx::query_scalar(
            "SELECT reserved_at FROM phone_otp_issue_locks WHERE phone_number = ?",
        )
        .bind(phone_number)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| Self::db_error("reserve_issue", phone_number, e))?;

        // A row released in between still counts as held for this attempt
        let retry_after = reserved_at
            .map(|at| at + cooldown - now)
            .filter(|remaining| *remaining > Duration::zero())
            .unwrap_or_else(Duration::zero);
        Ok(IssueReservation::Held { retry_after })
    }

    async fn release_issue(&self, phone_number: &str, reserved_at: DateTime<Utc>) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM phone_otp_issue_locks WHERE phone_number = ? AND reserved_at = ?")
            .bind(phone_number)
            .bind(reserved_at)
            .execute(&self.pool)
            .await
            .map_err(|e| Self::db_error("release_issue", phone_number, e))?;
        Ok(())
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map(|_| ())
            .map_err(|e| StoreError::unavailable(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_codes() {
        assert!(split_codes("").is_empty());
        assert_eq!(split_codes("123456"), vec!["123456".to_string()]);
        assert_eq!(
            split_codes("123456,654321"),
            vec!["123456".to_string(), "654321".to_string()]
        );
    }
}
