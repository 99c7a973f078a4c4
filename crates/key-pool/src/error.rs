//! Error types for pool queries

/// Errors surfaced by the registry.
///
/// Verification never produces these; they come from queries and from the
/// store, whose failures the checker logs and swallows.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("unknown provider: {0}")]
    UnknownProvider(String),

    #[error("no {provider} keys available for tier {}", .tier.as_deref().unwrap_or("any"))]
    NotFound {
        provider: String,
        tier: Option<String>,
    },

    #[error("store error: {0}")]
    Store(String),
}

/// Result alias for pool operations.
pub type Result<T> = std::result::Result<T, Error>;
