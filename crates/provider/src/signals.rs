//! Failure signal detection in provider error responses
//!
//! Providers report throttling, quota exhaustion and authorization failures
//! with a mix of machine codes and free-text messages nested in different
//! places. `ErrorDetail` flattens the known payload shapes into one code, any
//! structured reasons, and one lowercased message; `Signals` is a per-provider table of codes and
//! keywords checked in a fixed precedence: rate limit, then quota, then invalid.

use serde_json::Value;

use crate::Outcome;

/// A recognised failure category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    RateLimited,
    QuotaExhausted,
    Invalid,
}

impl From<Signal> for Outcome {
    fn from(signal: Signal) -> Self {
        match signal {
            Signal::RateLimited => Outcome::RateLimited,
            Signal::QuotaExhausted => Outcome::QuotaExhausted,
            Signal::Invalid => Outcome::Invalid,
        }
    }
}

/// Error code and message pulled out of a response body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorDetail {
    /// Machine-readable code (`insufficient_quota`, `ThrottlingException`, ...).
    pub code: Option<String>,
    /// Reasons from `error.details[]` entries (`API_KEY_INVALID`, ...).
    pub reasons: Vec<String>,
    /// Human-readable message, lowercased for keyword matching.
    pub message: String,
}

impl ErrorDetail {
    /// Parse a response body. Never fails: non-JSON bodies become the message.
    ///
    /// Recognised shapes:
    /// - `{"error": {"code"|"type"|"status": .., "message": .., "details": [{"reason": ..}]}}`
    /// - `{"error": "message"}`
    /// - `{"detail": {"status": .., "message": ..}}` and `{"detail": "message"}`
    /// - `{"__type": "ns#Code", "message"|"Message": ..}`
    pub fn from_body(body: &str) -> Self {
        let Ok(json) = serde_json::from_str::<Value>(body) else {
            return Self {
                message: body.to_lowercase(),
                ..Default::default()
            };
        };

        let nested = json
            .get("error")
            .or_else(|| json.get("detail"))
            .unwrap_or(&json);

        let (code, message) = match nested {
            Value::String(message) => (None, Some(message.as_str())),
            Value::Object(_) => (
                first_string(nested, &["code", "type", "status", "__type"])
                    .map(|c| c.rsplit('#').next().unwrap_or(c)),
                first_string(nested, &["message", "Message"]),
            ),
            _ => (None, None),
        };

        let reasons = nested
            .get("details")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .filter_map(|d| d.get("reason").and_then(Value::as_str))
            .map(str::to_string)
            .collect();

        Self {
            code: code.map(str::to_string),
            reasons,
            message: message.unwrap_or(body).to_lowercase(),
        }
    }

    /// Replace the code, e.g. with one carried in a response header.
    pub fn with_code(mut self, code: Option<String>) -> Self {
        if code.is_some() {
            self.code = code;
        }
        self
    }

    /// Matches the code or any detail reason.
    fn has_code(&self, codes: &[&str]) -> bool {
        self.code
            .iter()
            .chain(&self.reasons)
            .any(|c| codes.iter().any(|k| k.eq_ignore_ascii_case(c)))
    }

    fn mentions(&self, keywords: &[&str]) -> bool {
        keywords.iter().any(|k| self.message.contains(k))
    }
}

fn first_string<'a>(value: &'a Value, fields: &[&str]) -> Option<&'a str> {
    fields
        .iter()
        .find_map(|f| value.get(*f).and_then(Value::as_str))
}

/// Per-provider code and keyword tables. Keywords must be lowercase.
#[derive(Debug, Clone, Copy)]
pub struct Signals {
    pub rate_codes: &'static [&'static str],
    pub rate_keywords: &'static [&'static str],
    pub quota_codes: &'static [&'static str],
    pub quota_keywords: &'static [&'static str],
    pub invalid_codes: &'static [&'static str],
    pub invalid_keywords: &'static [&'static str],
}

impl Signals {
    pub const NONE: Signals = Signals {
        rate_codes: &[],
        rate_keywords: &[],
        quota_codes: &[],
        quota_keywords: &[],
        invalid_codes: &[],
        invalid_keywords: &[],
    };

    /// First matching category in precedence order, or `None`.
    pub fn classify(&self, detail: &ErrorDetail) -> Option<Signal> {
        if detail.has_code(self.rate_codes) || detail.mentions(self.rate_keywords) {
            return Some(Signal::RateLimited);
        }
        if detail.has_code(self.quota_codes) || detail.mentions(self.quota_keywords) {
            return Some(Signal::QuotaExhausted);
        }
        if detail.has_code(self.invalid_codes) || detail.mentions(self.invalid_keywords) {
            return Some(Signal::Invalid);
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE: Signals = Signals {
        rate_codes: &["rate_limit_exceeded"],
        rate_keywords: &["rate limit"],
        quota_codes: &["insufficient_quota"],
        quota_keywords: &["quota"],
        invalid_codes: &["invalid_api_key"],
        invalid_keywords: &["not authorized"],
    };

    #[test]
    fn parses_nested_error_object() {
        let body = r#"{"error":{"message":"You exceeded your current QUOTA","type":"insufficient_quota","code":"insufficient_quota"}}"#;
        let detail = ErrorDetail::from_body(body);
        assert_eq!(detail.code.as_deref(), Some("insufficient_quota"));
        assert_eq!(detail.message, "you exceeded your current quota");
    }

    #[test]
    fn parses_anthropic_error_type() {
        let body = r#"{"type":"error","error":{"type":"rate_limit_error","message":"Number of requests has exceeded your rate limit"}}"#;
        let detail = ErrorDetail::from_body(body);
        assert_eq!(detail.code.as_deref(), Some("rate_limit_error"));
    }

    #[test]
    fn parses_detail_object() {
        let body = r#"{"detail":{"status":"quota_exceeded","message":"This request exceeds your quota."}}"#;
        let detail = ErrorDetail::from_body(body);
        assert_eq!(detail.code.as_deref(), Some("quota_exceeded"));
        assert!(detail.message.contains("exceeds your quota"));
    }

    #[test]
    fn parses_aws_type_with_namespace() {
        let body = r#"{"__type":"com.amazon.coral.service#ThrottlingException","Message":"Too many requests"}"#;
        let detail = ErrorDetail::from_body(body);
        assert_eq!(detail.code.as_deref(), Some("ThrottlingException"));
        assert_eq!(detail.message, "too many requests");
    }

    #[test]
    fn numeric_code_is_ignored() {
        let body = r#"{"error":{"code":429,"message":"Slow down","status":"RESOURCE_EXHAUSTED"}}"#;
        let detail = ErrorDetail::from_body(body);
        assert_eq!(detail.code.as_deref(), Some("RESOURCE_EXHAUSTED"));
    }

    #[test]
    fn detail_reasons_are_collected() {
        let body = r#"{"error":{"code":400,"message":"Bad request","status":"INVALID_ARGUMENT","details":[{"@type":"type.googleapis.com/google.rpc.ErrorInfo","reason":"API_KEY_INVALID","domain":"googleapis.com"},{"@type":"type.googleapis.com/google.rpc.LocalizedMessage","locale":"en-US"}]}}"#;
        let detail = ErrorDetail::from_body(body);
        assert_eq!(detail.code.as_deref(), Some("INVALID_ARGUMENT"));
        assert_eq!(detail.reasons, vec!["API_KEY_INVALID"]);
    }

    #[test]
    fn detail_reason_matches_like_a_code() {
        let table = Signals {
            invalid_codes: &["API_KEY_INVALID"],
            ..Signals::NONE
        };
        let body = r#"{"error":{"message":"Bad request","status":"INVALID_ARGUMENT","details":[{"reason":"api_key_invalid"}]}}"#;
        let detail = ErrorDetail::from_body(body);
        assert_eq!(table.classify(&detail), Some(Signal::Invalid));
        assert_eq!(Signals::NONE.classify(&detail), None);
    }

    #[test]
    fn plain_text_body_becomes_message() {
        let detail = ErrorDetail::from_body("Rate Limit hit");
        assert_eq!(detail.code, None);
        assert_eq!(detail.message, "rate limit hit");
    }

    #[test]
    fn string_error_field_is_message() {
        let detail = ErrorDetail::from_body(r#"{"error":"Not Authorized"}"#);
        assert_eq!(detail.message, "not authorized");
    }

    #[test]
    fn header_code_overrides_body_code() {
        let detail = ErrorDetail::from_body(r#"{"message":"denied"}"#)
            .with_code(Some("AccessDeniedException".into()));
        assert_eq!(detail.code.as_deref(), Some("AccessDeniedException"));
        let kept = ErrorDetail::from_body(r#"{"__type":"X"}"#).with_code(None);
        assert_eq!(kept.code.as_deref(), Some("X"));
    }

    #[test]
    fn rate_limit_takes_precedence_over_quota() {
        let detail = ErrorDetail::from_body("rate limit reached; quota remains");
        assert_eq!(TABLE.classify(&detail), Some(Signal::RateLimited));
    }

    #[test]
    fn quota_code_matches_case_insensitively() {
        let detail = ErrorDetail {
            code: Some("INSUFFICIENT_QUOTA".into()),
            ..Default::default()
        };
        assert_eq!(TABLE.classify(&detail), Some(Signal::QuotaExhausted));
    }

    #[test]
    fn invalid_keyword_detected() {
        let detail = ErrorDetail::from_body(r#"{"message":"User is not authorized to perform"}"#);
        assert_eq!(TABLE.classify(&detail), Some(Signal::Invalid));
    }

    #[test]
    fn unmatched_detail_is_none() {
        let detail = ErrorDetail::from_body(r#"{"error":{"message":"model not found"}}"#);
        assert_eq!(TABLE.classify(&detail), None);
        assert_eq!(Signals::NONE.classify(&detail), None);
    }

    #[test]
    fn signal_converts_to_outcome() {
        assert_eq!(Outcome::from(Signal::QuotaExhausted), Outcome::QuotaExhausted);
        assert_eq!(Outcome::from(Signal::Invalid), Outcome::Invalid);
    }
}
