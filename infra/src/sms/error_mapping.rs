//! Provider error classification
//!
//! The single table that turns Twilio error codes into domain dispatch
//! subtypes. Anything not listed is a generic dispatch failure.

use bp_core::errors::DispatchFailure;

/// Twilio error code to domain subtype
pub const PROVIDER_ERROR_TABLE: &[(u32, DispatchFailure)] = &[
    // Permission to send an SMS has not been enabled for the region
    (21408, DispatchFailure::UnsupportedRegion),
    // Invalid 'To' phone number
    (21211, DispatchFailure::InvalidNumber),
    // 'To' number is not a valid mobile number
    (21614, DispatchFailure::InvalidNumber),
    // Unverified destination on a trial account
    (21608, DispatchFailure::NumberNeedsVerification),
    // Geo permission blocks the destination
    (21215, DispatchFailure::InternationalDisabled),
    // Cannot route between the 'From' and 'To' numbers
    (21612, DispatchFailure::InternationalDisabled),
    // Authentication failed
    (20003, DispatchFailure::ServiceUnavailable),
];

/// Classify a provider error
///
/// `provider_code` wins when present and listed; otherwise authentication
/// status codes map to `ServiceUnavailable` and everything else is generic.
pub fn classify_provider_error(provider_code: Option<u32>, http_status: u16) -> DispatchFailure {
    if let Some(failure) = provider_code.and_then(lookup) {
        return failure;
    }
    match http_status {
        401 | 403 => DispatchFailure::ServiceUnavailable,
        _ => DispatchFailure::GenericDispatchFailure,
    }
}

fn lookup(code: u32) -> Option<DispatchFailure> {
    PROVIDER_ERROR_TABLE
        .iter()
        .find(|(known, _)| *known == code)
        .map(|(_, failure)| *failure)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_entries() {
        assert_eq!(classify_provider_error(Some(21408), 400), DispatchFailure::UnsupportedRegion);
        assert_eq!(classify_provider_error(Some(21211), 400), DispatchFailure::InvalidNumber);
        assert_eq!(classify_provider_error(Some(21614), 400), DispatchFailure::InvalidNumber);
        assert_eq!(
            classify_provider_error(Some(21608), 400),
            DispatchFailure::NumberNeedsVerification
        );
        assert_eq!(
            classify_provider_error(Some(21215), 400),
            DispatchFailure::InternationalDisabled
        );
        assert_eq!(
            classify_provider_error(Some(21612), 400),
            DispatchFailure::InternationalDisabled
        );
        assert_eq!(classify_provider_error(Some(20003), 401), DispatchFailure::ServiceUnavailable);
    }

    #[test]
    fn test_unknown_codes_are_generic() {
        assert_eq!(
            classify_provider_error(Some(30007), 400),
            DispatchFailure::GenericDispatchFailure
        );
        assert_eq!(classify_provider_error(None, 500), DispatchFailure::GenericDispatchFailure);
    }

    #[test]
    fn test_auth_status_without_code() {
        assert_eq!(classify_provider_error(None, 401), DispatchFailure::ServiceUnavailable);
    }

    #[test]
    fn test_table_has_no_duplicate_codes() {
        let mut codes: Vec<u32> = PROVIDER_ERROR_TABLE.iter().map(|(c, _)| *c).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), PROVIDER_ERROR_TABLE.len());
    }
}
