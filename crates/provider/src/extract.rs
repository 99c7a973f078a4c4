//! Pattern-based credential extraction
//!
//! Adapters hold a `LazyLock<Regex>` for their format and delegate the scan to
//! one of these helpers. All helpers are pure and preserve match order.

use regex::Regex;

use crate::Credential;

/// Every non-overlapping match of `pattern`, as simple credentials.
pub fn find_all(pattern: &Regex, text: &str) -> Vec<Credential> {
    pattern
        .find_iter(text)
        .map(|m| Credential::Simple(m.as_str().to_string()))
        .collect()
}

/// Matches that are not glued to other ASCII alphanumerics on either side.
///
/// Stands in for look-around assertions, which `regex` does not support. A
/// match is dropped when the byte before it or after it is `[A-Za-z0-9]`.
pub fn find_isolated(pattern: &Regex, text: &str) -> Vec<Credential> {
    let bytes = text.as_bytes();
    pattern
        .find_iter(text)
        .filter(|m| {
            let before = m.start().checked_sub(1).map(|i| bytes[i]);
            let after = bytes.get(m.end()).copied();
            !before.is_some_and(|b| b.is_ascii_alphanumeric())
                && !after.is_some_and(|b| b.is_ascii_alphanumeric())
        })
        .map(|m| Credential::Simple(m.as_str().to_string()))
        .collect()
}

/// Two-capture matches as composite credentials (`id` = group 1, `secret` = group 2).
///
/// Matches whose halves cannot form a valid composite are skipped.
pub fn find_pairs(pattern: &Regex, text: &str) -> Vec<Credential> {
    pattern
        .captures_iter(text)
        .filter_map(|caps| {
            let id = caps.get(1)?.as_str();
            let secret = caps.get(2)?.as_str();
            Credential::composite(id, secret).ok()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn find_all_returns_every_match_in_order() {
        let re = Regex::new(r"tok-[0-9]{3}").unwrap();
        let found = find_all(&re, "tok-001 x tok-002, tok-001");
        let keys: Vec<_> = found.iter().map(Credential::key).collect();
        assert_eq!(keys, vec!["tok-001", "tok-002", "tok-001"]);
    }

    #[test]
    fn find_all_is_stable_across_calls() {
        let re = Regex::new(r"tok-[0-9]{3}").unwrap();
        let text = "tok-123 tok-456";
        assert_eq!(find_all(&re, text), find_all(&re, text));
    }

    #[test]
    fn find_isolated_rejects_embedded_matches() {
        let re = Regex::new(r"[a-f0-9]{8}").unwrap();
        let found = find_isolated(&re, "id=deadbeef; xdeadbeef deadbeef0 (cafebabe)");
        let keys: Vec<_> = found.iter().map(Credential::key).collect();
        assert_eq!(keys, vec!["deadbeef", "cafebabe"]);
    }

    #[test]
    fn find_isolated_accepts_text_edges() {
        let re = Regex::new(r"[a-f0-9]{8}").unwrap();
        assert_eq!(find_isolated(&re, "deadbeef").len(), 1);
    }

    #[test]
    fn find_pairs_builds_composites() {
        let re = Regex::new(r"(ID[0-9]{2})\s+([a-z]{4})").unwrap();
        let found = find_pairs(&re, "ID01 abcd and ID02 wxyz");
        assert_eq!(found.len(), 2);
        assert_eq!(found[1].key(), "ID02:wxyz");
    }
}
