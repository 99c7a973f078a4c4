//! OpenRouter adapter
//!
//! `GET /api/v1/key` both authenticates and reports whether the key is on the
//! free tier. Paid-tier keys with no remaining credits are reported as `Free`.
//! Provisioning keys can list their child keys; those are returned as
//! discoveries for the caller to verify.

use std::sync::LazyLock;

use provider::http;
use provider::{Credential, Outcome, ProviderAdapter, Signals, VerifyFuture};
use regex::Regex;
use reqwest::StatusCode;
use serde_json::Value;
use tracing::{debug, info};

use crate::constants::OPENROUTER_BASE_URL;

pub const NAME: &str = "openrouter";

const FREE: &str = "Free";
const PAID: &str = "Paid";

static PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"sk-or-v1-[a-z0-9]{64}").expect("valid openrouter pattern"));

const SIGNALS: Signals = Signals {
    rate_keywords: &["rate limit"],
    quota_keywords: &["quota"],
    ..Signals::NONE
};

pub struct OpenRouterAdapter {
    client: reqwest::Client,
    base_url: String,
}

impl OpenRouterAdapter {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            base_url: OPENROUTER_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn get(&self, path: &str, token: &str) -> reqwest::RequestBuilder {
        self.client
            .get(format!("{}{path}", self.base_url))
            .bearer_auth(token)
    }

    /// `GET path`, returning the JSON body only for a 2xx reply.
    async fn fetch(&self, path: &str, token: &str) -> Option<Value> {
        match http::send(self.get(path, token)).await {
            Ok(reply) if reply.status.is_success() => Some(reply.json()),
            Ok(reply) => {
                debug!(path, status = reply.status.as_u16(), "openrouter lookup rejected");
                None
            }
            Err(e) => {
                debug!(path, error = %e, "openrouter lookup failed");
                None
            }
        }
    }

    /// `total_credits - total_usage`. Anything unreadable counts as unlimited,
    /// so a failed lookup never demotes a paid key.
    async fn remaining_credits(&self, token: &str) -> f64 {
        let Some(payload) = self.fetch("/api/v1/credits", token).await else {
            return f64::INFINITY;
        };
        let Some(data) = payload.get("data").filter(|d| d.is_object()) else {
            return f64::INFINITY;
        };
        let amount = |field: &str| match data.get(field) {
            None => Some(0.0),
            Some(v) => v.as_f64(),
        };
        match (amount("total_credits"), amount("total_usage")) {
            (Some(credits), Some(usage)) => credits - usage,
            _ => f64::INFINITY,
        }
    }

    async fn tier(&self, key_info: &Value, token: &str) -> &'static str {
        let data = key_info.get("data").unwrap_or(key_info);
        if data["is_free_tier"].as_bool() == Some(true) {
            return FREE;
        }
        if self.remaining_credits(token).await <= 0.0 {
            FREE
        } else {
            PAID
        }
    }

    /// Enabled child keys listed by a provisioning key, excluding itself.
    async fn child_keys(&self, token: &str) -> Vec<Credential> {
        let Some(payload) = self.fetch("/api/v1/keys", token).await else {
            return Vec::new();
        };
        let Some(entries) = payload.get("data").and_then(Value::as_array) else {
            return Vec::new();
        };
        entries
            .iter()
            .filter(|entry| entry["disabled"].as_bool() != Some(true))
            .filter_map(|entry| entry["hash"].as_str())
            .filter(|hash| *hash != token)
            .map(|hash| Credential::Simple(hash.to_string()))
            .collect()
    }

    async fn check(&self, credential: &Credential) -> Outcome {
        let token = credential.key();
        let reply = match http::send(self.get("/api/v1/key", &token)).await {
            Ok(reply) => reply,
            Err(e) => return http::transport_failure(NAME, credential, &e),
        };
        if reply.status == StatusCode::PAYMENT_REQUIRED {
            return Outcome::QuotaExhausted;
        }
        if !reply.status.is_success() {
            return http::classify_failure(&reply, &SIGNALS, Outcome::RateLimited);
        }

        let tier = self.tier(&reply.json(), &token).await;
        let discovered = self.child_keys(&token).await;
        info!(
            provider = NAME,
            credential = %credential.redacted(),
            tier,
            children = discovered.len(),
            "key verified"
        );
        Outcome::Valid {
            tier: tier.to_string(),
            capable: false,
            discovered,
        }
    }
}

impl ProviderAdapter for OpenRouterAdapter {
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
    use axum::routing::get;

    fn key() -> String {
        format!("sk-or-v1-{}", "0123456789abcdef".repeat(4))
    }

    async fn verify_against(app: axum::Router) -> Outcome {
        let base = mock::serve(app).await;
        let adapter = OpenRouterAdapter::new(mock::client()).with_base_url(base);
        adapter.verify(&Credential::Simple(key())).await
    }

    fn key_info(body: &'static str) -> axum::Router {
        axum::Router::new().route("/api/v1/key", get(move || async move { body }))
    }

    fn rejecting(status: u16, body: &'static str) -> axum::Router {
        let status = axum::http::StatusCode::from_u16(status).unwrap();
        axum::Router::new().route("/api/v1/key", get(move || async move { (status, body) }))
    }

    #[test]
    fn extracts_lowercase_keys_only() {
        let adapter = OpenRouterAdapter::new(reqwest::Client::new());
        let upper = format!("sk-or-v1-{}", "A".repeat(64));
        let text = format!("{} {upper}", key());
        assert_eq!(adapter.extract(&text), vec![Credential::Simple(key())]);
    }

    #[tokio::test]
    async fn paid_key_with_credits_is_paid() {
        let app = key_info(r#"{"data":{"label":"sk-or-v1-012...","is_free_tier":false,"usage":0}}"#)
            .route(
                "/api/v1/credits",
                get(|| async { r#"{"data":{"total_credits":10,"total_usage":2.5}}"# }),
            );
        assert_eq!(verify_against(app).await, Outcome::valid("Paid"));
    }

    #[tokio::test]
    async fn free_tier_flag_wins() {
        let app = key_info(r#"{"data":{"is_free_tier":true}}"#);
        assert_eq!(verify_against(app).await, Outcome::valid("Free"));
    }

    #[tokio::test]
    async fn spent_credits_demote_to_free() {
        let app = key_info(r#"{"data":{"is_free_tier":false}}"#).route(
            "/api/v1/credits",
            get(|| async { r#"{"data":{"total_credits":5,"total_usage":5}}"# }),
        );
        assert_eq!(verify_against(app).await, Outcome::valid("Free"));
    }

    #[tokio::test]
    async fn unreadable_credits_count_as_unlimited() {
        let app = key_info(r#"{"data":{"is_free_tier":false}}"#).route(
            "/api/v1/credits",
            get(|| async { r#"{"data":{"total_credits":"lots"}}"# }),
        );
        assert_eq!(verify_against(app).await, Outcome::valid("Paid"));
    }

    #[tokio::test]
    async fn enabled_child_keys_are_discovered() {
        let app = key_info(r#"{"data":{"is_free_tier":true}}"#).route(
            "/api/v1/keys",
            get(|| async {
                r#"{"data":[
                    {"hash":"child-a","disabled":false},
                    {"hash":"child-b","disabled":true},
                    {"name":"no hash"},
                    {"hash":"child-c"}
                ]}"#
            }),
        );
        assert_eq!(
            verify_against(app).await,
            Outcome::Valid {
                tier: "Free".into(),
                capable: false,
                discovered: vec![
                    Credential::Simple("child-a".into()),
                    Credential::Simple("child-c".into()),
                ],
            }
        );
    }

    #[tokio::test]
    async fn payment_required_is_quota_exhausted() {
        let outcome = verify_against(rejecting(402, r#"{"error":{"message":"Insufficient credits"}}"#)).await;
        assert_eq!(outcome, Outcome::QuotaExhausted);
    }

    #[tokio::test]
    async fn unmatched_429_is_rate_limited() {
        let outcome = verify_against(rejecting(429, r#"{"error":{"message":"Too many requests"}}"#)).await;
        assert_eq!(outcome, Outcome::RateLimited);
    }

    #[tokio::test]
    async fn unknown_key_is_invalid() {
        let outcome = verify_against(rejecting(401, r#"{"error":{"message":"User not found.","code":401}}"#)).await;
        assert_eq!(outcome, Outcome::Invalid);
    }
}
