//! Tier classification from success-response metadata
//!
//! Providers publish rate limits that step with account tier. Each adapter
//! keeps a static table of exact limit tuples and looks up the tuple it read
//! from the response. Missing or unparseable signals read as `0`, so a
//! response without limit headers falls through to the table's fallback.

use reqwest::header::HeaderMap;

/// Ordered `(signal, label)` pairs with a fallback label.
#[derive(Debug)]
pub struct TierTable<K: 'static> {
    entries: &'static [(K, &'static str)],
    fallback: &'static str,
}

impl<K: PartialEq> TierTable<K> {
    pub const fn new(entries: &'static [(K, &'static str)], fallback: &'static str) -> Self {
        Self { entries, fallback }
    }

    /// Label of the first entry whose signal equals `signal`, else the fallback.
    pub fn classify(&self, signal: &K) -> &'static str {
        self.entries
            .iter()
            .find(|(key, _)| key == signal)
            .map(|(_, label)| *label)
            .unwrap_or(self.fallback)
    }
}

/// Read a numeric header such as `x-ratelimit-limit-requests`.
///
/// Tolerates thousands separators and surrounding whitespace. Absent,
/// non-UTF-8 or non-numeric values read as `0`.
pub fn header_number(headers: &HeaderMap, name: &str) -> u64 {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.trim().replace(',', ""))
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(0)
}
