//! Business services containing domain logic and use cases.

pub mod verification;

pub use verification::{
    Clock, IssueReceipt, ManualClock, SmsGateway, SystemClock, VerificationService,
    VerificationServiceConfig, VerifiedPhone,
};
