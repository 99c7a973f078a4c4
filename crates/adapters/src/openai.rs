//! OpenAI adapter
//!
//! Calls `POST /v1/responses` with the cheapest reasoning model. Tier comes
//! from the request/token rate-limit headers of the success response; a second
//! identical request asking for a reasoning summary marks the key capable.

use std::sync::LazyLock;

use provider::http::{self, Reply};
use provider::tier::header_number;
use provider::{Credential, Outcome, ProviderAdapter, Signals, TierTable, VerifyFuture};
use regex::Regex;
use serde_json::json;
use tracing::{debug, info};

use crate::constants::{OPENAI_BASE_URL, OPENAI_MODEL, CHECK_PROMPT};

pub const NAME: &str = "openai";

static PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"sk-[A-Za-z0-9_-]+T3BlbkFJ[A-Za-z0-9_-]+").expect("valid openai pattern")
});

/// `(requests/min, tokens/min)` for the verification model, per usage tier.
static TIERS: TierTable<(u64, u64)> = TierTable::new(
    &[
        ((500, 200_000), "Tier_1"),
        ((5_000, 2_000_000), "Tier_2"),
        ((5_000, 4_000_000), "Tier_3"),
        ((10_000, 10_000_000), "Tier_4"),
        ((30_000, 180_000_000), "Tier_5"),
    ],
    "unknown",
);

const SIGNALS: Signals = Signals {
    rate_codes: &["rate_limit_exceeded"],
    rate_keywords: &["rate limit"],
    quota_codes: &["insufficient_quota"],
    quota_keywords: &["quota"],
    invalid_codes: &["invalid_api_key"],
    ..Signals::NONE
};

pub struct OpenAiAdapter {
    client: reqwest::Client,
    base_url: String,
}

impl OpenAiAdapter {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            base_url: OPENAI_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn request(&self, token: &str, summary: bool) -> reqwest::RequestBuilder {
        let mut reasoning = json!({ "effort": "low" });
        if summary {
            reasoning["summary"] = json!("auto");
        }
        self.client
            .post(format!("{}/v1/responses", self.base_url))
            .bearer_auth(token)
            .json(&json!({
                "model": OPENAI_MODEL,
                "input": CHECK_PROMPT,
                "reasoning": reasoning,
            }))
    }

    fn tier(reply: &Reply) -> &'static str {
        let requests = header_number(&reply.headers, "x-ratelimit-limit-requests");
        let tokens = header_number(&reply.headers, "x-ratelimit-limit-tokens");
        TIERS.classify(&(requests, tokens))
    }

    async fn check(&self, credential: &Credential) -> Outcome {
        let token = credential.key();
        let reply = match http::send(self.request(&token, false)).await {
            Ok(reply) => reply,
            Err(e) => return http::transport_failure(NAME, credential, &e),
        };
        if !reply.status.is_success() {
            return http::classify_failure(&reply, &SIGNALS, Outcome::Dead);
        }

        let tier = Self::tier(&reply);

        // A failed capability request only means the feature is absent.
        let capable = match http::send(self.request(&token, true)).await {
            Ok(reply) => reply.status.is_success(),
            Err(e) => {
                debug!(credential = %credential.redacted(), error = %e, "capability check failed");
                false
            }
        };

        info!(provider = NAME, credential = %credential.redacted(), tier, capable, "key verified");
        Outcome::Valid {
            tier: tier.to_string(),
            capable,
            discovered: Vec::new(),
        }
    }
}

impl ProviderAdapter for OpenAiAdapter {
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock;
    use axum::Json;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use axum::routing::post;
    use serde_json::Value;

    const KEY: &str = "sk-proj-abcDEF123_-T3BlbkFJxyz789";

    async fn verify_against(app: axum::Router) -> Outcome {
        let base = mock::serve(app).await;
        let adapter = OpenAiAdapter::new(mock::client()).with_base_url(base);
        adapter.verify(&Credential::Simple(KEY.into())).await
    }

    fn rejecting(status: StatusCode, body: &'static str) -> axum::Router {
        axum::Router::new().route("/v1/responses", post(move || async move { (status, body) }))
    }

    #[test]
    fn extracts_project_keys_from_text() {
        let adapter = OpenAiAdapter::new(reqwest::Client::new());
        let text = format!("OPENAI_API_KEY={KEY}\nother sk-nope");
        let found = adapter.extract(&text);
        assert_eq!(found, vec![Credential::Simple(KEY.into())]);
    }

    #[test]
    fn extraction_is_repeatable() {
        let adapter = OpenAiAdapter::new(reqwest::Client::new());
        let text = format!("{KEY} {KEY}");
        assert_eq!(adapter.extract(&text), adapter.extract(&text));
        assert_eq!(adapter.extract(&text).len(), 2);
    }

    #[test]
    fn tier_table_matches_exact_limits() {
        assert_eq!(TIERS.classify(&(500, 200_000)), "Tier_1");
        assert_eq!(TIERS.classify(&(5_000, 4_000_000)), "Tier_3");
        assert_eq!(TIERS.classify(&(30_000, 180_000_000)), "Tier_5");
        assert_eq!(TIERS.classify(&(0, 0)), "unknown");
    }

    #[tokio::test]
    async fn success_reads_tier_and_capability() {
        let app = axum::Router::new().route(
            "/v1/responses",
            post(|Json(body): Json<Value>| async move {
                assert_eq!(body["model"], OPENAI_MODEL);
                assert_eq!(body["reasoning"]["effort"], "low");
                (
                    [
                        ("x-ratelimit-limit-requests", "5,000"),
                        ("x-ratelimit-limit-tokens", "2000000"),
                    ],
                    "{}",
                )
            }),
        );
        assert_eq!(
            verify_against(app).await,
            Outcome::Valid {
                tier: "Tier_2".into(),
                capable: true,
                discovered: vec![],
            }
        );
    }

    #[tokio::test]
    async fn rejected_capability_check_is_not_an_error() {
        let app = axum::Router::new().route(
            "/v1/responses",
            post(|Json(body): Json<Value>| async move {
                if body["reasoning"]["summary"] == "auto" {
                    (StatusCode::BAD_REQUEST, "organization must be verified").into_response()
                } else {
                    "{}".into_response()
                }
            }),
        );
        assert_eq!(verify_against(app).await, Outcome::valid("unknown"));
    }

    #[tokio::test]
    async fn quota_429_is_quota_exhausted() {
        let body = r#"{"error":{"message":"You exceeded your current quota, please check your plan and billing details.","type":"insufficient_quota","code":"insufficient_quota"}}"#;
        let outcome = verify_against(rejecting(StatusCode::TOO_MANY_REQUESTS, body)).await;
        assert_eq!(outcome, Outcome::QuotaExhausted);
    }

    #[tokio::test]
    async fn rate_429_is_rate_limited() {
        let body = r#"{"error":{"message":"Rate limit reached for gpt-5-nano on requests per min (RPM)","type":"requests","code":"rate_limit_exceeded"}}"#;
        let outcome = verify_against(rejecting(StatusCode::TOO_MANY_REQUESTS, body)).await;
        assert_eq!(outcome, Outcome::RateLimited);
    }

    #[tokio::test]
    async fn unmatched_429_is_dead() {
        let outcome = verify_against(rejecting(StatusCode::TOO_MANY_REQUESTS, "{}")).await;
        assert_eq!(outcome, Outcome::Dead);
    }

    #[tokio::test]
    async fn bad_key_is_invalid() {
        let body = r#"{"error":{"message":"Incorrect API key provided","type":"invalid_request_error","code":"invalid_api_key"}}"#;
        let outcome = verify_against(rejecting(StatusCode::UNAUTHORIZED, body)).await;
        assert_eq!(outcome, Outcome::Invalid);
    }

    #[tokio::test]
    async fn overloaded_is_transient() {
        let outcome = verify_against(rejecting(StatusCode::SERVICE_UNAVAILABLE, "busy")).await;
        assert_eq!(outcome, Outcome::Transient);
    }

    #[tokio::test]
    async fn unreachable_is_transient() {
        let adapter = OpenAiAdapter::new(mock::client()).with_base_url("http://127.0.0.1:1");
        let outcome = adapter.verify(&Credential::Simple(KEY.into())).await;
        assert_eq!(outcome, Outcome::Transient);
    }
}
