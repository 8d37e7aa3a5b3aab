//! Security helpers (meeting API checksums, constant-time compare)

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// Checksum for a signed meeting API call, computed over
/// `call_name + query_string + secret` and hex-encoded.
pub fn api_checksum(call_name: &str, query: &str, secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(call_name.as_bytes());
    hasher.update(query.as_bytes());
    hasher.update(secret.as_bytes());
    hex::encode(hasher.finalize())
}

/// Constant-time equality for secrets such as room access codes.
/// Differing lengths compare unequal without leaking a prefix match.
pub fn ct_eq(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_checksum_is_stable() {
        let a = api_checksum("join", "meetingID=abc&fullName=Alice", "secret");
        let b = api_checksum("join", "meetingID=abc&fullName=Alice", "secret");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_api_checksum_depends_on_secret() {
        let a = api_checksum("join", "meetingID=abc", "secret-one");
        let b = api_checksum("join", "meetingID=abc", "secret-two");
        assert_ne!(a, b);
    }

    #[test]
    fn test_ct_eq() {
        assert!(ct_eq("314159", "314159"));
        assert!(!ct_eq("314159", "314158"));
        assert!(!ct_eq("314159", "31415"));
        assert!(!ct_eq("", "314159"));
    }
}
