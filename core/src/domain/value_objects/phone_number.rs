//! Validated phone number.

use bp_shared::phone::{mask_phone_number, normalize_and_validate};
use serde::Serialize;

use crate::errors::VerificationError;

/// A phone number that passed normalization and the E.164-like format check
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct PhoneNumber(String);

impl PhoneNumber {
    /// Strips formatting characters and validates the result against `^\+\d{7,15}$`
    ///
    /// Pure and deterministic; performs no I/O.
    pub fn parse(raw: &str) -> Result<Self, VerificationError> {
        normalize_and_validate(raw).map(PhoneNumber).ok_or_else(|| {
            VerificationError::validation(
                "phoneNumber",
                "Enter a valid international number, e.g. +639171234567",
            )
        })
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Masked form for logs
    pub fn masked(&self) -> String {
        mask_phone_number(&self.0)
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl std::fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for PhoneNumber {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_strips_formatting() {
        let phone = PhoneNumber::parse("+63 917-123-4567").unwrap();
        assert_eq!(phone.as_str(), "+639171234567");
        assert_eq!(phone.masked(), "+63****4567");
    }

    #[test]
    fn test_parse_rejects_invalid() {
        for raw in ["12345", "09171234567", "+123", "", "+1234567890123456"] {
            let err = PhoneNumber::parse(raw).unwrap_err();
            assert!(matches!(err, VerificationError::Validation { .. }), "{raw}");
        }
    }
}
