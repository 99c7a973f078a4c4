//! Anthropic adapter
//!
//! One-token Messages API call. Tier is read from the request rate limit the
//! API advertises for the key; anything outside the table is the top tier.

use std::sync::LazyLock;

use provider::http;
use provider::tier::header_number;
use provider::{Credential, Outcome, ProviderAdapter, Signals, TierTable, VerifyFuture};
use regex::Regex;
use serde_json::json;
use tracing::info;

use crate::constants::{ANTHROPIC_BASE_URL, ANTHROPIC_MODEL, ANTHROPIC_VERSION, CHECK_PROMPT};

pub const NAME: &str = "anthropic";

static PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"sk-ant-(?:admin01|api03)-[A-Za-z0-9_-]{93}AA").expect("valid anthropic pattern")
});

/// Requests/min per tier. Custom limits only exist above Tier 4.
static TIERS: TierTable<u64> = TierTable::new(
    &[
        (50, "Tier_1"),
        (1_000, "Tier_2"),
        (2_000, "Tier_3"),
        (4_000, "Tier_4"),
    ],
    "Tier_5",
);

const SIGNALS: Signals = Signals {
    rate_codes: &["rate_limit_error"],
    rate_keywords: &["rate limit"],
    quota_keywords: &["quota", "credit balance"],
    invalid_codes: &["authentication_error", "permission_error"],
    ..Signals::NONE
};

pub struct AnthropicAdapter {
    client: reqwest::Client,
    base_url: String,
}

impl AnthropicAdapter {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            base_url: ANTHROPIC_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn check(&self, credential: &Credential) -> Outcome {
        let request = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", credential.key())
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&json!({
                "model": ANTHROPIC_MODEL,
                "max_tokens": 16,
                "messages": [{ "role": "user", "content": CHECK_PROMPT }],
            }));

        let reply = match http::send(request).await {
            Ok(reply) => reply,
            Err(e) => return http::transport_failure(NAME, credential, &e),
        };
        if !reply.status.is_success() {
            return http::classify_failure(&reply, &SIGNALS, Outcome::Dead);
        }

        let rpm = header_number(&reply.headers, "anthropic-ratelimit-requests-limit");
        let tier = TIERS.classify(&rpm);
        info!(provider = NAME, credential = %credential.redacted(), tier, rpm, "key verified");
        Outcome::valid(tier)
    }
}

impl ProviderAdapter for AnthropicAdapter {
    fn name(&self) -> &str {
        NAME
    }

    fn extract(&self, text: &str) -> Vec<Credential> {
        provider::extract::find_all(&PATTERN, text)
    }

    fn verify<'a>(&'a self, credential: &'a Credential) -> VerifyFuture<'a> {
        Box::pin(self.check(credential))
    }
}
