//! Provider adapter contract for credential verification
//!
//! Defines the `ProviderAdapter` trait that decouples the lifecycle engine from
//! provider-specific HTTP details. Each adapter knows how to find its credentials
//! in free text, how to exercise the provider's real authorization path with the
//! cheapest possible request, and how to fold the response into an `Outcome`.
//!
//! Verification never fails from the caller's point of view: network errors,
//! timeouts and unreadable bodies all become `Outcome::Transient`.

pub mod credential;
pub mod extract;
pub mod http;
pub mod signals;
pub mod tier;

pub use credential::Credential;
pub use signals::{ErrorDetail, Signal, Signals};
pub use tier::TierTable;

use std::future::Future;
use std::pin::Pin;

/// Normalized result of one verification attempt.
///
/// The lifecycle state machine switches on this instead of inspecting HTTP
/// responses. Only `Valid` carries data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The credential works. `capable` marks the optional extended feature the
    /// adapter checks for; `discovered` holds related credentials found while
    /// verifying (e.g. child keys listed by a management key).
    Valid {
        tier: String,
        capable: bool,
        discovered: Vec<Credential>,
    },
    /// Throttled; retry after the fixed cool-down.
    RateLimited,
    /// Over its usage cap but otherwise working.
    QuotaExhausted,
    /// Authentication/authorization explicitly denied.
    Invalid,
    /// Definitive rejection without a more specific signal.
    Dead,
    /// Network failure, timeout, or no authoritative answer.
    Transient,
}

impl Outcome {
    /// A plain success with no capability or discoveries.
    pub fn valid(tier: impl Into<String>) -> Self {
        Outcome::Valid {
            tier: tier.into(),
            capable: false,
            discovered: Vec::new(),
        }
    }

    /// Label for logging and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Valid { .. } => "valid",
            Outcome::RateLimited => "rate_limited",
            Outcome::QuotaExhausted => "quota_exhausted",
            Outcome::Invalid => "invalid",
            Outcome::Dead => "dead",
            Outcome::Transient => "transient",
        }
    }
}

/// Errors from provider-side credential handling.
///
/// Raised before any network call is made; verification itself reports
/// through `Outcome`.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ProviderError {
    #[error("malformed credential: {0}")]
    Configuration(String),
}

/// Result alias for provider operations.
pub type Result<T> = std::result::Result<T, ProviderError>;

/// Boxed verification future, dyn-compatible for `Arc<dyn ProviderAdapter>`.
pub type VerifyFuture<'a> = Pin<Box<dyn Future<Output = Outcome> + Send + 'a>>;

/// One supported provider: extraction, verification and tier classification.
///
/// Uses `Pin<Box<dyn Future>>` return types for dyn-compatibility so the
/// registry can hold a static list of `Arc<dyn ProviderAdapter>`.
pub trait ProviderAdapter: Send + Sync {
    /// Identifier used in routes, store file names and logs (e.g. "openai").
    fn name(&self) -> &str;

    /// Every substring of `text` matching this provider's credential format.
    ///
    /// Must not mutate state. Duplicates are allowed; callers filter against
    /// the classification map.
    fn extract(&self, text: &str) -> Vec<Credential>;

    /// Rebuild a credential from its serialized store key.
    fn parse_key(&self, key: &str) -> Result<Credential> {
        Ok(Credential::Simple(key.to_string()))
    }

    /// Perform the live check and classify the response.
    fn verify<'a>(&'a self, credential: &'a Credential) -> VerifyFuture<'a>;
}
