//! Shared HTTP plumbing for adapters
//!
//! Every adapter sends one small request, reads the whole (small) body, and
//! classifies the status. Retries are never done here: the lifecycle engine
//! owns retry scheduling, so the client is built with a fixed timeout and
//! retries switched off.

use std::time::Duration;

use reqwest::StatusCode;
use reqwest::header::HeaderMap;
use serde_json::Value;
use tracing::{debug, warn};

use crate::signals::{ErrorDetail, Signals};
use crate::{Credential, Outcome};

/// Default per-request timeout for verification calls.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Statuses that say nothing about the credential itself.
const TRANSIENT_STATUSES: &[u16] = &[408, 500, 502, 503, 504, 529];

/// Build the shared verification client.
pub fn client(timeout: Duration) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .connect_timeout(timeout)
        .retry(reqwest::retry::never())
        .build()
}

/// A fully-read provider response.
#[derive(Debug, Clone)]
pub struct Reply {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl Reply {
    /// Body parsed as JSON, or `Value::Null` when it is not JSON.
    pub fn json(&self) -> Value {
        serde_json::from_str(&self.body).unwrap_or(Value::Null)
    }

    pub fn error_detail(&self) -> ErrorDetail {
        ErrorDetail::from_body(&self.body)
    }

    pub fn is_transient(&self) -> bool {
        TRANSIENT_STATUSES.contains(&self.status.as_u16())
    }
}

/// Send a request and read the body. Transport and body-read failures are
/// returned as `Err` for the caller to map to `Outcome::Transient`.
pub async fn send(request: reqwest::RequestBuilder) -> reqwest::Result<Reply> {
    let response = request.send().await?;
    let status = response.status();
    let headers = response.headers().clone();
    let body = response.text().await?;
    Ok(Reply {
        status,
        headers,
        body,
    })
}

/// Log a transport failure and report it as `Transient`.
pub fn transport_failure(provider: &str, credential: &Credential, err: &reqwest::Error) -> Outcome {
    warn!(
        provider,
        credential = %credential.redacted(),
        timeout = err.is_timeout(),
        connect = err.is_connect(),
        error = %err,
        "verification request failed"
    );
    Outcome::Transient
}

/// Classify a non-2xx reply with the usual status and signal rules.
///
/// Order: transient statuses, then provider signals (rate, quota, invalid),
/// then 401/403 as `Invalid`, then `unmatched_429` for a 429 that carried no
/// recognised signal, and `Dead` for anything else.
pub fn classify_failure(reply: &Reply, signals: &Signals, unmatched_429: Outcome) -> Outcome {
    if reply.is_transient() {
        debug!(status = reply.status.as_u16(), "transient provider status");
        return Outcome::Transient;
    }
    let detail = reply.error_detail();
    if let Some(signal) = signals.classify(&detail) {
        return signal.into();
    }
    match reply.status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Outcome::Invalid,
        StatusCode::TOO_MANY_REQUESTS => unmatched_429,
        _ => Outcome::Dead,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIGNALS: Signals = Signals {
        rate_keywords: &["rate limit"],
        quota_keywords: &["quota"],
        ..Signals::NONE
    };

    fn reply(status: u16, body: &str) -> Reply {
        Reply {
            status: StatusCode::from_u16(status).unwrap(),
            headers: HeaderMap::new(),
            body: body.to_string(),
        }
    }

    #[test]
    fn server_errors_are_transient() {
        for status in [408, 500, 502, 503, 504, 529] {
            assert_eq!(
                classify_failure(&reply(status, "quota"), &SIGNALS, Outcome::Dead),
                Outcome::Transient,
                "status {status}"
            );
        }
    }

    #[test]
    fn signals_win_over_status() {
        let r = reply(429, r#"{"error":{"message":"You exceeded your current quota"}}"#);
        assert_eq!(classify_failure(&r, &SIGNALS, Outcome::Dead), Outcome::QuotaExhausted);
    }

    #[test]
    fn auth_statuses_are_invalid() {
        assert_eq!(classify_failure(&reply(401, "{}"), &SIGNALS, Outcome::Dead), Outcome::Invalid);
        assert_eq!(classify_failure(&reply(403, ""), &SIGNALS, Outcome::Dead), Outcome::Invalid);
    }

    #[test]
    fn unmatched_429_uses_fallback() {
        let r = reply(429, r#"{"error":{"message":"slow down"}}"#);
        assert_eq!(classify_failure(&r, &SIGNALS, Outcome::RateLimited), Outcome::RateLimited);
        assert_eq!(classify_failure(&r, &SIGNALS, Outcome::Dead), Outcome::Dead);
    }

    #[test]
    fn other_rejections_are_dead() {
        assert_eq!(classify_failure(&reply(404, "no"), &SIGNALS, Outcome::Dead), Outcome::Dead);
    }

    #[test]
    fn reply_json_tolerates_garbage() {
        assert_eq!(reply(200, "<html>").json(), Value::Null);
        assert_eq!(reply(200, r#"{"a":1}"#).json()["a"], 1);
    }

    #[tokio::test]
    async fn send_reads_status_headers_and_body() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let app = axum::Router::new().fallback(|| async {
                (
                    axum::http::StatusCode::IM_A_TEAPOT,
                    [("x-ratelimit-limit-requests", "500")],
                    "short and stout",
                )
            });
            axum::serve(listener, app).await.unwrap();
        });

        let client = client(DEFAULT_TIMEOUT).unwrap();
        let reply = send(client.get(format!("http://{addr}/"))).await.unwrap();
        assert_eq!(reply.status.as_u16(), 418);
        assert_eq!(reply.headers["x-ratelimit-limit-requests"], "500");
        assert_eq!(reply.body, "short and stout");
    }

    #[tokio::test]
    async fn server_error_is_sent_once() {
        use std::sync::Arc;
        use std::sync::atomic::{AtomicUsize, Ordering};

        let hits = Arc::new(AtomicUsize::new(0));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let counter = hits.clone();
        tokio::spawn(async move {
            let app = axum::Router::new().fallback(move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    axum::http::StatusCode::SERVICE_UNAVAILABLE
                }
            });
            axum::serve(listener, app).await.unwrap();
        });

        let client = client(DEFAULT_TIMEOUT).unwrap();
        let reply = send(client.post(format!("http://{addr}/")).body("{}"))
            .await
            .unwrap();
        assert!(reply.is_transient());
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn send_to_closed_port_is_err() {
        let client = client(Duration::from_secs(2)).unwrap();
        let result = send(client.get("http://127.0.0.1:1/")).await;
        assert!(result.is_err());
    }
}
