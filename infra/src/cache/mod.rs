//! Cache module for Redis-based OTP storage
//!
//! Connection handling plus the Redis implementation of the OTP record store.

pub mod otp_repository;
pub mod redis_client;

pub use otp_repository::RedisOtpRepository;
pub use redis_client::RedisClient;
