//! Google Gemini adapter
//!
//! The Gemini API does not publish rate-limit headers, so every working key is
//! tier `unknown`. A 429 without a quota message is plain throttling.

use std::sync::LazyLock;

use provider::http;
use provider::{Credential, Outcome, ProviderAdapter, Signals, VerifyFuture};
use regex::Regex;
use serde_json::json;
use tracing::info;

use crate::constants::{GOOGLE_BASE_URL, GOOGLE_MODEL, CHECK_PROMPT};

pub const NAME: &str = "google";

const TIER: &str = "unknown";

static PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"AIza[0-9A-Za-z_-]{35}").expect("valid google pattern"));

const SIGNALS: Signals = Signals {
    rate_keywords: &["rate limit"],
    quota_keywords: &["quota"],
    invalid_codes: &["API_KEY_INVALID"],
    invalid_keywords: &["api key not valid", "api key expired"],
    ..Signals::NONE
};

pub struct GoogleAdapter {
    client: reqwest::Client,
    base_url: String,
}

impl GoogleAdapter {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            base_url: GOOGLE_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn check(&self, credential: &Credential) -> Outcome {
        let request = self
            .client
            .post(format!(
                "{}/v1beta/models/{GOOGLE_MODEL}:generateContent",
                self.base_url
            ))
            .header("x-goog-api-key", credential.key())
            .json(&json!({ "contents": [{ "parts": [{ "text": CHECK_PROMPT }] }] }));

        let reply = match http::send(request).await {
            Ok(reply) => reply,
            Err(e) => return http::transport_failure(NAME, credential, &e),
        };
        if !reply.status.is_success() {
            return http::classify_failure(&reply, &SIGNALS, Outcome::RateLimited);
        }

        info!(provider = NAME, credential = %credential.redacted(), tier = TIER, "key verified");
        Outcome::valid(TIER)
    }
}

impl ProviderAdapter for GoogleAdapter {
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
