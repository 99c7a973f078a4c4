//! AWS Bedrock adapter
//!
//! Credentials are access key id + secret pairs found near each other in the
//! text. The check is a SigV4-signed `InvokeModel` call tried region by region
//! in a fixed order, because model access is granted per region:
//!
//! - a model/resource-not-found reply, a transient status or a transport error
//!   moves on to the next region;
//! - a recognised throttle, quota or authorization error is final;
//! - the first success sets the tier to `region:<region>`;
//! - running out of regions is `Transient`.

use std::sync::LazyLock;

use chrono::Utc;
use provider::http::{self, Reply};
use provider::{Credential, Outcome, ProviderAdapter, Signals, VerifyFuture};
use regex::Regex;
use reqwest::Url;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::constants::{
    BEDROCK_ANTHROPIC_VERSION, BEDROCK_ENDPOINT_TEMPLATE, BEDROCK_MODEL, BEDROCK_REGIONS,
    BEDROCK_SIGNING_SERVICE, CHECK_PROMPT,
};
use crate::sigv4::Signer;

pub const NAME: &str = "aws";

/// Access key id, then the nearest following 40-character secret.
static PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"((?:AKIA|ABIA|ACCA|ASIA)[0-9A-Z]{16})\b[\s\S]*?\b([A-Za-z0-9/+=]{40})\b")
        .expect("valid aws pattern")
});

const NOT_FOUND_CODE: &str = "ResourceNotFoundException";

const SIGNALS: Signals = Signals {
    rate_codes: &[
        "ThrottlingException",
        "TooManyRequestsException",
        "ThrottledException",
    ],
    rate_keywords: &["throttl"],
    quota_codes: &["ServiceQuotaExceededException"],
    quota_keywords: &["quota", "exceed", "exhausted"],
    invalid_codes: &[
        "AccessDeniedException",
        "AuthFailure",
        "ExpiredTokenException",
        "IncompleteSignature",
        "InvalidClientTokenId",
        "InvalidSignatureException",
        "MissingAuthenticationToken",
        "OptInRequired",
        "SignatureDoesNotMatch",
        "UnauthorizedOperation",
        "UnrecognizedClientException",
    ],
    invalid_keywords: &["not authorized", "invalid"],
};

pub struct BedrockAdapter {
    client: reqwest::Client,
    regions: Vec<String>,
    endpoint_template: String,
}

impl BedrockAdapter {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            regions: BEDROCK_REGIONS.iter().map(|r| r.to_string()).collect(),
            endpoint_template: BEDROCK_ENDPOINT_TEMPLATE.to_string(),
        }
    }

    /// Endpoint with a `{region}` placeholder.
    pub fn with_endpoint_template(mut self, template: impl Into<String>) -> Self {
        self.endpoint_template = template.into();
        self
    }

    pub fn with_regions<I, S>(mut self, regions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.regions = regions.into_iter().map(Into::into).collect();
        self
    }

    fn invoke_url(&self, region: &str) -> Result<Url, String> {
        let endpoint = self.endpoint_template.replace("{region}", region);
        let model = BEDROCK_MODEL.replace(':', "%3A");
        Url::parse(&format!("{endpoint}/model/{model}/invoke")).map_err(|e| e.to_string())
    }

    async fn invoke(&self, url: Url, signer: Signer<'_>, body: &[u8]) -> reqwest::Result<Reply> {
        let signed = signer.sign("POST", &url, body, Utc::now());
        let request = self
            .client
            .post(url)
            .header("x-amz-date", signed.amz_date)
            .header("authorization", signed.authorization)
            .header("content-type", "application/json")
            .header("accept", "application/json")
            .body(body.to_vec());
        http::send(request).await
    }

    async fn check(&self, credential: &Credential) -> Outcome {
        let Credential::Composite { id, secret } = credential else {
            warn!(provider = NAME, credential = %credential.redacted(), "expected an access key pair");
            return Outcome::Transient;
        };

        let body = json!({
            "anthropic_version": BEDROCK_ANTHROPIC_VERSION,
            "max_tokens": 16,
            "messages": [{
                "role": "user",
                "content": [{ "type": "text", "text": CHECK_PROMPT }],
            }],
        })
        .to_string()
        .into_bytes();

        for region in &self.regions {
            let url = match self.invoke_url(region) {
                Ok(url) => url,
                Err(e) => {
                    warn!(region = %region, error = %e, "bad bedrock endpoint");
                    continue;
                }
            };
            let signer = Signer {
                access_key: id,
                secret_key: secret,
                region,
                service: BEDROCK_SIGNING_SERVICE,
            };

            let reply = match self.invoke(url, signer, &body).await {
                Ok(reply) => reply,
                Err(e) => {
                    debug!(region = %region, error = %e, "region unreachable");
                    continue;
                }
            };

            if reply.status.is_success() {
                let tier = format!("region:{region}");
                info!(provider = NAME, credential = %credential.redacted(), tier = %tier, "key verified");
                return Outcome::valid(tier);
            }
            if reply.is_transient() {
                debug!(region = %region, status = reply.status.as_u16(), "transient region status");
                continue;
            }

            let detail = reply.error_detail().with_code(error_type(&reply));
            let not_found = detail.code.as_deref() == Some(NOT_FOUND_CODE)
                || (detail.message.contains("model") && detail.message.contains("not found"));
            if not_found {
                debug!(region = %region, "model not available in region");
                continue;
            }
            if let Some(signal) = SIGNALS.classify(&detail) {
                debug!(region = %region, code = ?detail.code, ?signal, "authoritative region reply");
                return signal.into();
            }
            debug!(
                region = %region,
                status = reply.status.as_u16(),
                code = ?detail.code,
                "unclassified region reply"
            );
        }

        debug!(provider = NAME, credential = %credential.redacted(), "no region gave a definitive answer");
        Outcome::Transient
    }
}

/// Error code from `x-amzn-errortype` (`Code:namespace-uri`), if present.
fn error_type(reply: &Reply) -> Option<String> {
    reply
        .headers
        .get("x-amzn-errortype")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(':').next())
        .filter(|code| !code.is_empty())
        .map(str::to_string)
}

impl ProviderAdapter for BedrockAdapter {
    fn name(&self) -> &str {
        NAME
    }

    fn extract(&self, text: &str) -> Vec<Credential> {
        provider::extract::find_pairs(&PATTERN, text)
    }

    fn parse_key(&self, key: &str) -> provider::Result<Credential> {
        Credential::from_composite_key(key)
    }

    fn verify<'a>(&'a self, credential: &'a Credential) -> VerifyFuture<'a> {
        Box::pin(self.check(credential))
    }
}
