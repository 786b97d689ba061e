//! Types for verification service results

use chrono::{DateTime, Utc};

use crate::domain::entities::UserRole;

/// Result of issuing a code
///
/// The code itself is never part of the result; it only leaves the server inside the SMS.
#[derive(Debug, Clone, PartialEq)]
pub struct IssueReceipt {
    /// Normalized phone number the code was sent to
    pub phone_number: String,
    /// When the code stops being accepted
    pub expires_at: DateTime<Utc>,
    /// When the caller may request another code
    pub resend_available_at: DateTime<Utc>,
    /// Provider message id, for log correlation
    pub message_id: String,
}

/// Result of a successful verification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedPhone {
    pub phone_number: String,
    pub user_role: UserRole,
}
