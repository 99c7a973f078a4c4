//! Log-safe rendering of credential strings

/// Number of leading characters kept visible.
const VISIBLE_PREFIX: usize = 10;

/// Render a credential for logs: a short prefix plus the total length.
///
/// Prefixes identify the provider family (`sk-ant-api03`, `AKIA...`) without
/// leaking enough material to reuse the secret. Values at or below the prefix
/// length are fully masked.
pub fn redact(secret: &str) -> String {
    let len = secret.chars().count();
    if len <= VISIBLE_PREFIX {
        return format!("[REDACTED len={len}]");
    }
    let prefix: String = secret.chars().take(VISIBLE_PREFIX).collect();
    format!("{prefix}…[len={len}]")
}
