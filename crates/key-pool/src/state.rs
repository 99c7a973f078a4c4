//! Per-provider classification state and its transition rules
//!
//! `ProviderState::apply` is the whole lifecycle state machine. It is pure:
//! callers hold the provider lock, apply an `Outcome`, then persist and
//! schedule according to the returned `Transition`.
//!
//! Transitions:
//! - Valid → classification = tier, capability merged, quota flag cleared
//! - RateLimited → provisional `rate_limited` if unclassified, one retry
//! - QuotaExhausted → quota flag set, classification untouched
//! - Invalid/Dead on an unclassified key → nothing durable; the caller
//!   remembers it for the rest of its batch
//! - Invalid/Dead on a classified key → `dead`, or evicted if already `dead`
//! - Transient → no change

use std::collections::{BTreeMap, BTreeSet};

use provider::Outcome;

/// Classification of a key that failed once and will be evicted on the next failure.
pub const DEAD: &str = "dead";

/// Provisional classification of a key first seen while throttled.
pub const RATE_LIMITED: &str = "rate_limited";

/// Everything a checker knows about its provider's keys.
///
/// All three fields are durable. Keys rejected before they were ever
/// classified are not recorded here; see `Checker`'s per-batch session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderState {
    pub keys: BTreeMap<String, String>,
    pub capabilities: BTreeSet<String>,
    pub quota_exhausted: BTreeSet<String>,
}

/// What `apply` did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    Classified { tier: String, capable: bool },
    RateLimited { provisional: bool },
    QuotaExhausted,
    SessionInvalid,
    MarkedDead,
    Evicted,
    Unchanged,
}

impl Transition {
    /// Whether durable state changed and must be saved.
    pub fn persists(&self) -> bool {
        !matches!(self, Transition::SessionInvalid | Transition::Unchanged)
    }

    pub fn schedules_retry(&self) -> bool {
        matches!(self, Transition::RateLimited { .. })
    }

    pub fn label(&self) -> &'static str {
        match self {
            Transition::Classified { .. } => "classified",
            Transition::RateLimited { .. } => "rate_limited",
            Transition::QuotaExhausted => "quota_exhausted",
            Transition::SessionInvalid => "session_invalid",
            Transition::MarkedDead => "marked_dead",
            Transition::Evicted => "evicted",
            Transition::Unchanged => "unchanged",
        }
    }
}

impl ProviderState {
    /// Fold one verification outcome for `key` into the state.
    pub fn apply(&mut self, key: &str, outcome: &Outcome) -> Transition {
        match outcome {
            Outcome::Valid { tier, capable, .. } => {
                self.keys.insert(key.to_string(), tier.clone());
                if *capable {
                    self.capabilities.insert(key.to_string());
                }
                self.quota_exhausted.remove(key);
                Transition::Classified {
                    tier: tier.clone(),
                    capable: *capable,
                }
            }
            Outcome::RateLimited => {
                let provisional = !self.keys.contains_key(key);
                if provisional {
                    self.keys.insert(key.to_string(), RATE_LIMITED.to_string());
                }
                Transition::RateLimited { provisional }
            }
            Outcome::QuotaExhausted => {
                self.quota_exhausted.insert(key.to_string());
                Transition::QuotaExhausted
            }
            Outcome::Invalid | Outcome::Dead => self.reject(key),
            Outcome::Transient => Transition::Unchanged,
        }
    }

    /// Two strikes: the first definitive failure marks `dead`, the next evicts.
    ///
    /// Eviction drops capability flags but not the quota flag: only a later
    /// success clears that, so an evicted over-quota key stays in the quota
    /// sweep.
    fn reject(&mut self, key: &str) -> Transition {
        match self.keys.get(key).map(String::as_str) {
            None => Transition::SessionInvalid,
            Some(DEAD) => {
                self.keys.remove(key);
                self.capabilities.remove(key);
                Transition::Evicted
            }
            Some(_) => {
                self.keys.insert(key.to_string(), DEAD.to_string());
                Transition::MarkedDead
            }
        }
    }

    pub fn is_known(&self, key: &str) -> bool {
        self.keys.contains_key(key)
    }

    /// Keys with exactly `tier` (case-insensitive), or every non-dead key.
    pub fn list(&self, tier: Option<&str>) -> Vec<String> {
        self.keys
            .iter()
            .filter(|(_, label)| match tier {
                Some(tier) => label.eq_ignore_ascii_case(tier),
                None => label.as_str() != DEAD,
            })
            .map(|(key, _)| key.clone())
            .collect()
    }

    /// Non-dead keys grouped by classification.
    pub fn tiers(&self) -> BTreeMap<String, Vec<String>> {
        let mut tiers: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (key, label) in &self.keys {
            if label != DEAD {
                tiers.entry(label.clone()).or_default().push(key.clone());
            }
        }
        tiers
    }
}
