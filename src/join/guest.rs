use rand::Rng;

/// Durable pseudo-identity for an unauthenticated participant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuestId {
    pub value: String,
    /// Set when this request minted the id; the caller must then write
    /// the guest cookie.
    pub fresh: bool,
}

/// Cookie lifetime for a freshly issued guest id.
pub const GUEST_ID_TTL_DAYS: i64 = 1;

/// Reuse a previously issued guest id, or mint a new one. Ids come from
/// the thread-local CSPRNG; predictable guest tokens would allow
/// session fixation.
pub fn issue_or_reuse(existing: Option<&str>) -> GuestId {
    if let Some(value) = existing.filter(|v| !v.is_empty()) {
        return GuestId {
            value: value.to_string(),
            fresh: false,
        };
    }

    let mut rng = rand::rng();
    let mut bytes = [0u8; 12];
    rng.fill(&mut bytes);

    GuestId {
        value: format!("gl-guest-{}", hex::encode(bytes)),
        fresh: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issued_id_matches_expected_format() {
        let guest = issue_or_reuse(None);

        assert!(guest.fresh);
        let hex_part = guest
            .value
            .strip_prefix("gl-guest-")
            .expect("Should carry the gl-guest prefix");
        assert_eq!(hex_part.len(), 24);
        assert!(hex_part
            .chars()
            .all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_existing_id_is_reused_unchanged() {
        let first = issue_or_reuse(None);
        let second = issue_or_reuse(Some(&first.value));

        assert_eq!(second.value, first.value);
        assert!(!second.fresh);
    }

    #[test]
    fn test_empty_cookie_value_gets_a_new_id() {
        let guest = issue_or_reuse(Some(""));

        assert!(guest.fresh);
        assert!(guest.value.starts_with("gl-guest-"));
    }

    #[test]
    fn test_ids_are_distinct() {
        let a = issue_or_reuse(None);
        let b = issue_or_reuse(None);

        assert_ne!(a.value, b.value);
    }
}
