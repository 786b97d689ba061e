//! Redis OTP record store
//!
//! Each record is a hash at `otp:{phone}` with the same fields as the
//! `phone_otps` table. Timestamps are stored as microseconds since the epoch.
//! Conditional operations run as Lua scripts so the compare and the write
//! happen atomically on the server. Issuance reservations are plain string
//! keys at `otp_issue:{phone}` holding the reservation time, expiring with
//! the cooldown.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use redis::{AsyncCommands, Script};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::error;

use bp_core::domain::entities::OtpRecord;
use bp_core::errors::StoreError;
use bp_core::repositories::{IssueReservation, OtpRepository};
use bp_shared::phone::mask_phone_number;

use super::redis_client::RedisClient;

/// Seconds a record outlives `expires_at`, so a late verify still reports `Expired`
const EXPIRY_GRACE_SECONDS: i64 = 300;

const REPLACE_SCRIPT: &str = r"
redis.call('DEL', KEYS[1])
redis.call('HSET', KEYS[1],
    'phone_number', ARGV[1],
    'otp_code', ARGV[2],
    'user_role', ARGV[3],
    'created_at', ARGV[4],
    'expires_at', ARGV[5],
    'attempt_count', ARGV[6],
    'superseded_codes', ARGV[7])
redis.call('EXPIREAT', KEYS[1], ARGV[8])
return 1
";

const CONSUME_SCRIPT: &str = r"
local v = redis.call('HMGET', KEYS[1], 'created_at', 'otp_code', 'attempt_count')
if v[1] == ARGV[1] and v[2] == ARGV[2] and v[3] == ARGV[3] then
    redis.call('DEL', KEYS[1])
    return 1
end
return 0
";

const INCREMENT_SCRIPT: &str = r"
local v = redis.call('HMGET', KEYS[1], 'created_at', 'otp_code', 'attempt_count')
if v[1] == ARGV[1] and v[2] == ARGV[2] and v[3] == ARGV[3] then
    return redis.call('HINCRBY', KEYS[1], 'attempt_count', 1)
end
return -1
";

const DISCARD_SCRIPT: &str = r"
local v = redis.call('HMGET', KEYS[1], 'created_at', 'otp_code')
if v[1] == ARGV[1] and v[2] == ARGV[2] then
    redis.call('DEL', KEYS[1])
    return 1
end
return 0
";

// Returns -1 when reserved, otherwise the holder's reservation time
const RESERVE_SCRIPT: &str = r"
local held = redis.call('GET', KEYS[1])
if held and tonumber(held) > tonumber(ARGV[2]) then
    return tonumber(held)
end
redis.call('SET', KEYS[1], ARGV[1], 'PX', ARGV[3])
return -1
";

const RELEASE_SCRIPT: &str = r"
if redis.call('GET', KEYS[1]) == ARGV[1] then
    return redis.call('DEL', KEYS[1])
end
return 0
";

/// Redis-backed OTP repository
pub struct RedisOtpRepository {
    client: RedisClient,
    replace_script: Arc<Script>,
    consume_script: Arc<Script>,
    increment_script: Arc<Script>,
    discard_script: Arc<Script>,
    reserve_script: Arc<Script>,
    release_script: Arc<Script>,
}

impl RedisOtpRepository {
    /// Create a new repository on top of a connected client
    pub fn new(client: RedisClient) -> Self {
        Self {
            client,
            replace_script: Arc::new(Script::new(REPLACE_SCRIPT)),
            consume_script: Arc::new(Script::new(CONSUME_SCRIPT)),
            increment_script: Arc::new(Script::new(INCREMENT_SCRIPT)),
            discard_script: Arc::new(Script::new(DISCARD_SCRIPT)),
            reserve_script: Arc::new(Script::new(RESERVE_SCRIPT)),
            release_script: Arc::new(Script::new(RELEASE_SCRIPT)),
        }
    }

    fn record_key(&self, phone_number: &str) -> String {
        self.client.key(&format!("otp:{}", phone_number))
    }

    fn reservation_key(&self, phone_number: &str) -> String {
        self.client.key(&format!("otp_issue:{}", phone_number))
    }

    fn redis_error(operation: &'static str, phone: &str, e: redis::RedisError) -> StoreError {
        error!(
            phone = %mask_phone_number(phone),
            operation,
            error = %e,
            "OTP Redis operation failed"
        );
        StoreError::unavailable(format!("{} failed: {}", operation, e))
    }
}

/// Hash fields for a record
pub(crate) fn encode_record(record: &OtpRecord) -> [(&'static str, String); 7] {
    [
        ("phone_number", record.phone_number.clone()),
        ("otp_code", record.code.clone()),
        ("user_role", record.user_role.as_str().to_string()),
        ("created_at", record.created_at.timestamp_micros().to_string()),
        ("expires_at", record.expires_at.timestamp_micros().to_string()),
        ("attempt_count", record.attempt_count.to_string()),
        ("superseded_codes", record.superseded_codes.join(",")),
    ]
}

fn from_micros(micros: i64) -> Option<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp(
        micros.div_euclid(1_000_000),
        (micros.rem_euclid(1_000_000) * 1_000) as u32,
    )
}

/// Rebuild a record from `HGETALL` output; `None` when the hash is empty
pub(crate) fn decode_record(fields: HashMap<String, String>) -> Result<Option<OtpRecord>, StoreError> {
    if fields.is_empty() {
        return Ok(None);
    }

    let field = |name: &str| -> Result<&String, StoreError> {
        fields
            .get(name)
            .ok_or_else(|| StoreError::corrupt(format!("missing field {}", name)))
    };
    let timestamp = |name: &str| -> Result<DateTime<Utc>, StoreError> {
        let micros: i64 = field(name)?
            .parse()
            .map_err(|e| StoreError::corrupt(format!("bad {}: {}", name, e)))?;
        from_micros(micros).ok_or_else(|| StoreError::corrupt(format!("{} out of range", name)))
    };

    Ok(Some(OtpRecord {
        phone_number: field("phone_number")?.clone(),
        code: field("otp_code")?.clone(),
        user_role: field("user_role")?.parse().map_err(StoreError::corrupt)?,
        created_at: timestamp("created_at")?,
        expires_at: timestamp("expires_at")?,
        attempt_count: field("attempt_count")?
            .parse()
            .map_err(|e| StoreError::corrupt(format!("bad attempt_count: {}", e)))?,
        // Absent on hashes written before the field existed
        superseded_codes: fields
            .get("superseded_codes")
            .map(|joined| {
                joined
                    .split(',')
                    .filter(|code| !code.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default(),
    }))
}

#[async_trait]
impl OtpRepository for RedisOtpRepository {
    async fn find(&self, phone_number: &str) -> Result<Option<OtpRecord>, StoreError> {
        let mut conn = self.client.connection();
        let fields: HashMap<String, String> = conn
            .hgetall(self.record_key(phone_number))
            .await
            .map_err(|e| Self::redis_error("find", phone_number, e))?;
        decode_record(fields)
    }

    async fn replace(&self, record: &OtpRecord) -> Result<(), StoreError> {
        let mut conn = self.client.connection();
        let expire_at = record.expires_at.timestamp() + EXPIRY_GRACE_SECONDS;
        let mut invocation = self.replace_script.key(self.record_key(&record.phone_number));
        for (_, value) in encode_record(record) {
            invocation.arg(value);
        }
        invocation
            .arg(expire_at)
            .invoke_async::<_, i64>(&mut conn)
            .await
            .map(|_| ())
            .map_err(|e| Self::redis_error("replace", &record.phone_number, e))
    }

    async fn consume(&self, observed: &OtpRecord) -> Result<bool, StoreError> {
        let mut conn = self.client.connection();
        let deleted: i64 = self
            .consume_script
            .key(self.record_key(&observed.phone_number))
            .arg(observed.created_at.timestamp_micros().to_string())
            .arg(&observed.code)
            .arg(observed.attempt_count.to_string())
            .invoke_async(&mut conn)
            .await
            .map_err(|e| Self::redis_error("consume", &observed.phone_number, e))?;
        Ok(deleted == 1)
    }

    async fn record_failed_attempt(&self, observed: &OtpRecord) -> Result<Option<u32>, StoreError> {
        let mut conn = self.client.connection();
        let attempts: i64 = self
            .increment_script
            .key(self.record_key(&observed.phone_number))
            .arg(observed.created_at.timestamp_micros().to_string())
            .arg(&observed.code)
            .arg(observed.attempt_count.to_string())
            .invoke_async(&mut conn)
            .await
            .map_err(|e| Self::redis_error("record_failed_attempt", &observed.phone_number, e))?;
        Ok(u32::try_from(attempts).ok())
    }

    async fn discard(&self, observed: &OtpRecord) -> Result<bool, StoreError> {
        let mut conn = self.client.connection();
        let deleted: i64 = self
            .discard_script
            .key(self.record_key(&observed.phone_number))
            .arg(observed.created_at.timestamp_micros().to_string())
            .arg(&observed.code)
            .invoke_async(&mut conn)
            .await
            .map_err(|e| Self::redis_error("discard", &observed.phone_number, e))?;
        Ok(deleted == 1)
    }

    async fn reserve_issue(
        &self,
        phone_number: &str,
        now: DateTime<Utc>,
        cooldown: Duration,
    ) -> Result<IssueReservation, StoreError> {
        let mut conn = self.client.connection();
        let holder: i64 = self
            .reserve_script
            .key(self.reservation_key(phone_number))
            .arg(now.timestamp_micros().to_string())
            .arg((now - cooldown).timestamp_micros().to_string())
            .arg(cooldown.num_milliseconds().max(1))
            .invoke_async(&mut conn)
            .await
            .map_err(|e| Self::redis_error("reserve_issue", phone_number, e))?;

        if holder < 0 {
            return Ok(IssueReservation::Reserved);
        }
        let reserved_at = from_micros(holder)
            .ok_or_else(|| StoreError::corrupt("reservation time out of range"))?;
        Ok(IssueReservation::Held {
            retry_after: reserved_at + cooldown - now,
        })
    }

    async fn release_issue(&self, phone_number: &str, reserved_at: DateTime<Utc>) -> Result<(), StoreError> {
        let mut conn = self.client.connection();
        self.release_script
            .key(self.reservation_key(phone_number))
            .arg(reserved_at.timestamp_micros().to_string())
            .invoke_async::<_, i64>(&mut conn)
            .await
            .map(|_| ())
            .map_err(|e| Self::redis_error("release_issue", phone_number, e))
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        self.client.health_check().await.map_err(StoreError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bp_core::domain::entities::UserRole;
    use chrono::{Duration, TimeZone};

    fn record() -> OtpRecord {
        let created_at = Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap()
            + Duration::microseconds(123_456);
        OtpRecord {
            phone_number: "+639171234567".to_string(),
            code: "482913".to_string(),
            user_role: UserRole::Official,
            created_at,
            expires_at: created_at + Duration::seconds(600),
            attempt_count: 2,
            superseded_codes: vec!["111111".to_string(), "222222".to_string()],
        }
    }

    #[test]
    fn test_encode_decode_preserves_record() {
        let record = record();
        let fields: HashMap<String, String> = encode_record(&record)
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();

        assert_eq!(fields["created_at"], record.created_at.timestamp_micros().to_string());
        assert_eq!(fields["superseded_codes"], "111111,222222");
        assert_eq!(decode_record(fields).unwrap(), Some(record));
    }

    #[test]
    fn test_decode_without_superseded_codes() {
        let mut fields: HashMap<String, String> = encode_record(&record())
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();
        fields.remove("superseded_codes");

        let decoded = decode_record(fields).unwrap().unwrap();
        assert!(decoded.superseded_codes.is_empty());
    }

    #[test]
    fn test_decode_empty_hash_is_none() {
        assert_eq!(decode_record(HashMap::new()).unwrap(), None);
    }

    #[test]
    fn test_decode_rejects_unknown_role() {
        let mut fields: HashMap<String, String> = encode_record(&record())
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();
        fields.insert("user_role".to_string(), "mayor".to_string());

        assert!(matches!(decode_record(fields), Err(StoreError::Corrupt { .. })));
    }
}
