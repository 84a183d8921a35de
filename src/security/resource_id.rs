//! Resource identifier validation.
//!
//! Identifiers are checked before any token work so that malformed input never
//! reaches the signature check or the origin.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Longest identifier accepted in `opaque` mode.
pub const MAX_OPAQUE_LEN: usize = 128;

/// Accepted shape of a content identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceIdFormat {
    /// Hyphenated or simple (32 hex digit) UUID text.
    #[default]
    Uuid,
    /// 1..=128 characters of `[A-Za-z0-9_-]`.
    Opaque,
}

impl ResourceIdFormat {
    /// Returns true if `id` is well-formed under this format.
    pub fn is_valid(self, id: &str) -> bool {
        match self {
            // Braced and urn forms parse as UUIDs but are not path-safe.
            ResourceIdFormat::Uuid => {
                id.bytes().all(|b| b.is_ascii_hexdigit() || b == b'-') && Uuid::parse_str(id).is_ok()
            }
            ResourceIdFormat::Opaque => {
                !id.is_empty()
                    && id.len() <= MAX_OPAQUE_LEN
                    && id
                        .bytes()
                        .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uuid_format() {
        let format = ResourceIdFormat::Uuid;
        assert!(format.is_valid("e7bea589-e339-490c-8738-596e42b9042e"));
        assert!(format.is_valid("e7bea589e339490c8738596e42b9042e"));
        assert!(!format.is_valid("abc-123"));
        assert!(!format.is_valid("{e7bea589-e339-490c-8738-596e42b9042e}"));
        assert!(!format.is_valid("urn:uuid:e7bea589-e339-490c-8738-596e42b9042e"));
        assert!(!format.is_valid(""));
        assert!(!format.is_valid("e7bea589-e339-490c-8738-596e42b9042e/../x"));
    }

    #[test]
    fn test_opaque_format() {
        let format = ResourceIdFormat::Opaque;
        assert!(format.is_valid("abc-123"));
        assert!(format.is_valid("Movie_42"));
        assert!(!format.is_valid(""));
        assert!(!format.is_valid("a/b"));
        assert!(!format.is_valid("a?b=c"));
        assert!(!format.is_valid("%2e%2e"));
        assert!(!format.is_valid(&"x".repeat(MAX_OPAQUE_LEN + 1)));
        assert!(format.is_valid(&"x".repeat(MAX_OPAQUE_LEN)));
    }
}
