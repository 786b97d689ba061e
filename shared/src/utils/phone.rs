//! Phone number utilities

use once_cell::sync::Lazy;
use regex::Regex;

// E.164-like: leading plus, 7 to 15 digits
static E164_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\+\d{7,15}$").unwrap());

/// Normalize a phone number by removing every character that is not a digit or `+`
pub fn normalize_phone_number(phone: &str) -> String {
    phone
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '+')
        .collect()
}

/// Check whether an already normalized number matches the accepted format
pub fn is_valid_e164(normalized: &str) -> bool {
    E164_REGEX.is_match(normalized)
}

/// Normalize and validate in one step
///
/// Returns the normalized number, or `None` when it does not match
/// `^\+\d{7,15}$` after normalization.
pub fn normalize_and_validate(phone: &str) -> Option<String> {
    let normalized = normalize_phone_number(phone);
    if is_valid_e164(&normalized) {
        Some(normalized)
    } else {
        None
    }
}

/// Mask a phone number for logs (e.g., +63****4567)
pub fn mask_phone_number(phone: &str) -> String {
    let normalized = normalize_phone_number(phone);
    if normalized.len() >= 7 {
        format!(
            "{}****{}",
            &normalized[0..3],
            &normalized[normalized.len() - 4..]
        )
    } else {
        "****".to_string()
    }
}
