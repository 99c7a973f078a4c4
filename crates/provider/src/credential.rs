//! Credential identity and its store-key serialization

use std::fmt;

use crate::{ProviderError, Result};

/// Separator between the two halves of a composite credential's store key.
const COMPOSITE_SEPARATOR: char = ':';

/// A secret that authenticates to a provider.
///
/// Most providers use a single token. Composite credentials (access id plus
/// secret) serialize to `id:secret` so every credential has one store key.
/// `Debug` never prints the secret material.
#[derive(Clone, PartialEq, Eq, Hash)]
pub enum Credential {
    Simple(String),
    Composite { id: String, secret: String },
}

impl Credential {
    /// Build a composite credential, trimming whitespace from both halves.
    ///
    /// Rejects empty halves and ids containing the separator, since those
    /// could not round-trip through `key()`/`from_composite_key()`.
    pub fn composite(id: &str, secret: &str) -> Result<Self> {
        let id = id.trim();
        let secret = secret.trim();
        if id.is_empty() || secret.is_empty() {
            return Err(ProviderError::Configuration(
                "composite credential has an empty part".into(),
            ));
        }
        if id.contains(COMPOSITE_SEPARATOR) {
            return Err(ProviderError::Configuration(format!(
                "access id must not contain '{COMPOSITE_SEPARATOR}'"
            )));
        }
        Ok(Credential::Composite {
            id: id.to_string(),
            secret: secret.to_string(),
        })
    }

    /// Parse an `id:secret` store key. Splits on the first separator only.
    pub fn from_composite_key(key: &str) -> Result<Self> {
        let (id, secret) = key.split_once(COMPOSITE_SEPARATOR).ok_or_else(|| {
            ProviderError::Configuration(format!(
                "composite key {} has no '{COMPOSITE_SEPARATOR}' separator",
                common::redact(key)
            ))
        })?;
        Self::composite(id, secret)
    }

    /// Serialized form used as the classification map key.
    pub fn key(&self) -> String {
        match self {
            Credential::Simple(token) => token.clone(),
            Credential::Composite { id, secret } => {
                format!("{id}{COMPOSITE_SEPARATOR}{secret}")
            }
        }
    }

    /// Log-safe rendering. Composite credentials show the (non-secret) id.
    pub fn redacted(&self) -> String {
        match self {
            Credential::Simple(token) => common::redact(token),
            Credential::Composite { id, .. } => format!("{id}:[REDACTED]"),
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Credential({})", self.redacted())
    }
}
