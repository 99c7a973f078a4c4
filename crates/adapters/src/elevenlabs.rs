//! ElevenLabs adapter
//!
//! Keys come in two shapes: current `sk_`-prefixed keys and legacy bare 32-hex
//! tokens. The check lists models; the tier is the subscription tier from the
//! user profile, fetched only after the check succeeds.

use std::sync::LazyLock;

use provider::http;
use provider::{Credential, Outcome, ProviderAdapter, Signals, VerifyFuture};
use regex::Regex;
use tracing::{debug, info};

use crate::constants::ELEVENLABS_BASE_URL;

pub const NAME: &str = "elevenlabs";

const UNKNOWN_TIER: &str = "unknown";

static PREFIXED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"sk_[a-f0-9]{48}").expect("valid elevenlabs pattern"));

/// Legacy keys. Only accepted when not embedded in a longer token.
static LEGACY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[a-f0-9]{32}").expect("valid elevenlabs legacy pattern"));

const SIGNALS: Signals = Signals {
    rate_codes: &["too_many_concurrent_requests", "system_busy"],
    quota_codes: &["quota_exceeded"],
    quota_keywords: &["quota"],
    ..Signals::NONE
};

pub struct ElevenLabsAdapter {
    client: reqwest::Client,
    base_url: String,
}

impl ElevenLabsAdapter {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            base_url: ELEVENLABS_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn get(&self, path: &str, token: &str) -> reqwest::RequestBuilder {
        self.client
            .get(format!("{}{path}", self.base_url))
            .header("xi-api-key", token)
            .header("accept", "application/json")
    }

    /// `subscription.tier` from the profile, or `unknown` on any failure.
    async fn subscription_tier(&self, credential: &Credential) -> String {
        let reply = match http::send(self.get("/v1/user", &credential.key())).await {
            Ok(reply) if reply.status.is_success() => reply,
            Ok(reply) => {
                debug!(credential = %credential.redacted(), status = reply.status.as_u16(), "profile lookup rejected");
                return UNKNOWN_TIER.to_string();
            }
            Err(e) => {
                debug!(credential = %credential.redacted(), error = %e, "profile lookup failed");
                return UNKNOWN_TIER.to_string();
            }
        };
        reply.json()["subscription"]["tier"]
            .as_str()
            .map(str::to_string)
            .unwrap_or_else(|| UNKNOWN_TIER.to_string())
    }

    async fn check(&self, credential: &Credential) -> Outcome {
        let reply = match http::send(self.get("/v1/models", &credential.key())).await {
            Ok(reply) => reply,
            Err(e) => return http::transport_failure(NAME, credential, &e),
        };
        if !reply.status.is_success() {
            return http::classify_failure(&reply, &SIGNALS, Outcome::RateLimited);
        }

        let tier = self.subscription_tier(credential).await;
        info!(provider = NAME, credential = %credential.redacted(), tier = %tier, "key verified");
        Outcome::valid(tier)
    }
}

impl ProviderAdapter for ElevenLabsAdapter {
    fn name(&self) -> &str {
        NAME
    }

    fn extract(&self, text: &str) -> Vec<Credential> {
        let mut found = provider::extract::find_all(&PREFIXED, text);
        found.extend(provider::extract::find_isolated(&LEGACY, text));
        found
    }

    fn verify<'a>(&'a self, credential: &'a Credential) -> VerifyFuture<'a> {
        Box::pin(self.check(credential))
    }
}
