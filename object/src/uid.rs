//! Validation and generation of DICOM unique identifiers.
use std::collections::hash_map::RandomState;
use std::hash::{BuildHasher, Hasher};
use std::time::{SystemTime, UNIX_EPOCH};

/// The maximum length of a UID, in characters.
pub const MAX_UID_LENGTH: usize = 64;

/// Check whether the text is a well-formed UID:
/// dot-separated numeric components,
/// without leading zeros in multi-digit components,
/// at most 64 characters long.
///
/// Trailing padding (`\0` or space) must be removed beforehand.
pub fn is_valid_uid(uid: &str) -> bool {
    if uid.is_empty() || uid.len() > MAX_UID_LENGTH {
        return false;
    }
    uid.split('.').all(|component| {
        !component.is_empty()
            && component.bytes().all(|b| b.is_ascii_digit())
            && (component.len() == 1 || !component.starts_with('0'))
    })
}

/// Generate a new UID under the `2.25` root,
/// derived from the current time, the process ID and random state.
pub fn generate_uid() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();

    let mut high = RandomState::new().build_hasher();
    high.write_u128(nanos);
    high.write_u32(std::process::id());
    let high = high.finish();

    let mut low = RandomState::new().build_hasher();
    low.write_u64(high);
    low.write_u128(nanos);
    let low = low.finish();

    let value = (u128::from(high) << 64) | u128::from(low);
    format!("2.25.{}", value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uid_validation() {
        assert!(is_valid_uid("1.2.840.10008.1.2.1"));
        assert!(is_valid_uid("2.25.0"));
        assert!(!is_valid_uid(""));
        assert!(!is_valid_uid("1..2"));
        assert!(!is_valid_uid("1.2."));
        assert!(!is_valid_uid("1.02.3"));
        assert!(!is_valid_uid("1.2.a"));
        assert!(!is_valid_uid(&"1.".repeat(40)));
    }

    #[test]
    fn generated_uids_are_valid_and_distinct() {
        let a = generate_uid();
        let b = generate_uid();
        assert!(is_valid_uid(&a), "{}", a);
        assert!(a.starts_with("2.25."));
        assert_ne!(a, b);
    }
}
