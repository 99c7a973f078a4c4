//! One provider's verification engine
//!
//! A `Checker` pairs an adapter with the provider's state, store and retry
//! scheduler. Network calls run outside the state lock; only the
//! apply-and-persist step is serialized. An in-flight set keeps two
//! verifications of the same key from overlapping (e.g. a scan racing a sweep).
//!
//! Keys rejected before they were ever classified are remembered only by the
//! batch that rejected them. Each scan, sweep and retry is its own batch.

use std::collections::{BTreeMap, HashSet};
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, MutexGuard, PoisonError};
use std::time::Duration;

use provider::{Credential, Outcome, ProviderAdapter};
use rand::RngExt;
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::scheduler::{RetryTask, Reverify, Scheduler};
use crate::state::{ProviderState, Transition};
use crate::store::LifecycleStore;

pub struct Checker {
    adapter: Arc<dyn ProviderAdapter>,
    state: Mutex<ProviderState>,
    in_flight: std::sync::Mutex<HashSet<String>>,
    store: Arc<dyn LifecycleStore>,
    scheduler: Arc<dyn Scheduler>,
    retry_delay: Duration,
}

/// Removes its key from the in-flight set on drop.
struct InFlight<'a> {
    set: &'a std::sync::Mutex<HashSet<String>>,
    key: String,
}

impl<'a> InFlight<'a> {
    fn acquire(set: &'a std::sync::Mutex<HashSet<String>>, key: &str) -> Option<Self> {
        let inserted = set
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string());
        inserted.then(|| Self {
            set,
            key: key.to_string(),
        })
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.set
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.key);
    }
}

/// Keys one batch has seen rejected while unclassified.
#[derive(Debug, Default)]
struct Session {
    rejected: std::sync::Mutex<HashSet<String>>,
}

impl Session {
    fn contains(&self, key: &str) -> bool {
        self.lock().contains(key)
    }

    fn insert(&self, key: &str) {
        self.lock().insert(key.to_string());
    }

    fn lock(&self) -> MutexGuard<'_, HashSet<String>> {
        self.rejected.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Checker {
    /// Build a checker with whatever the store currently holds.
    pub async fn load(
        adapter: Arc<dyn ProviderAdapter>,
        store: Arc<dyn LifecycleStore>,
        scheduler: Arc<dyn Scheduler>,
        retry_delay: Duration,
    ) -> Arc<Self> {
        let state = store.load().await;
        info!(provider = adapter.name(), keys = state.keys.len(), "checker ready");
        Arc::new(Self {
            adapter,
            state: Mutex::new(state),
            in_flight: std::sync::Mutex::new(HashSet::new()),
            store,
            scheduler,
            retry_delay,
        })
    }

    pub fn name(&self) -> &str {
        self.adapter.name()
    }

    /// Verify every candidate in `text` that is not already classified.
    pub async fn scan(self: &Arc<Self>, text: &str) {
        let candidates = self.adapter.extract(text);
        let fresh: Vec<Credential> = {
            let state = self.state.lock().await;
            let mut seen = HashSet::new();
            candidates
                .into_iter()
                .filter(|c| {
                    let key = c.key();
                    !state.is_known(&key) && seen.insert(key)
                })
                .collect()
        };
        if !fresh.is_empty() {
            debug!(provider = self.name(), candidates = fresh.len(), "scanning");
        }
        self.verify_each(fresh, &Arc::default()).await;
    }

    /// Verify one credential as a batch of its own and fold the outcome into
    /// state. Returns `None` if another verification of it is in progress.
    pub async fn verify(self: &Arc<Self>, credential: Credential) -> Option<Transition> {
        self.verify_in(credential, &Session::default()).await
    }

    /// Returns `None` when skipped: `session` already saw the key rejected or
    /// another verification of it is in progress.
    async fn verify_in(self: &Arc<Self>, credential: Credential, session: &Session) -> Option<Transition> {
        let key = credential.key();
        if session.contains(&key) {
            debug!(provider = self.name(), credential = %credential.redacted(), "rejected earlier in this batch");
            return None;
        }
        let Some(_guard) = InFlight::acquire(&self.in_flight, &key) else {
            debug!(provider = self.name(), credential = %credential.redacted(), "verification already in flight");
            return None;
        };

        let outcome = self.adapter.verify(&credential).await;
        metrics::counter!(
            "keyprobe_verifications_total",
            "provider" => self.name().to_string(),
            "outcome" => outcome.label()
        )
        .increment(1);

        let transition = {
            let mut state = self.state.lock().await;
            let transition = state.apply(&key, &outcome);
            if transition.persists()
                && let Err(e) = self.store.save(&state).await
            {
                warn!(provider = self.name(), error = %e, "failed to persist state");
            }
            transition
        };

        if transition == Transition::SessionInvalid {
            session.insert(&key);
        }
        self.record(&credential, &transition);

        if transition.schedules_retry() {
            self.scheduler.schedule(
                self.retry_delay,
                RetryTask {
                    provider: self.name().to_string(),
                    credential: credential.clone(),
                    target: Arc::clone(self) as Arc<dyn Reverify>,
                },
            );
        }

        if let Outcome::Valid { discovered, .. } = outcome {
            self.verify_discovered(&key, discovered, session).await;
        }

        Some(transition)
    }

    fn record(&self, credential: &Credential, transition: &Transition) {
        let provider = self.name();
        let credential = credential.redacted();
        match transition {
            Transition::Classified { tier, capable } => {
                info!(provider, credential = %credential, tier = %tier, capable, "key classified");
            }
            Transition::RateLimited { provisional } => {
                info!(
                    provider,
                    credential = %credential,
                    provisional,
                    retry_secs = self.retry_delay.as_secs(),
                    "key rate limited, retry scheduled"
                );
            }
            Transition::QuotaExhausted => {
                info!(provider, credential = %credential, "key over quota");
            }
            Transition::MarkedDead => {
                info!(provider, credential = %credential, "key marked dead");
            }
            Transition::Evicted => {
                metrics::counter!("keyprobe_evictions_total", "provider" => provider.to_string())
                    .increment(1);
                info!(provider, credential = %credential, "dead key evicted");
            }
            Transition::SessionInvalid => {
                debug!(provider, credential = %credential, "key rejected");
            }
            Transition::Unchanged => {
                debug!(provider, credential = %credential, "no authoritative answer");
            }
        }
    }

    /// Verify keys found while verifying `parent`, one after another, in the
    /// parent's batch.
    async fn verify_discovered(self: &Arc<Self>, parent: &str, discovered: Vec<Credential>, session: &Session) {
        for child in discovered {
            let key = child.key();
            let skip = key == parent
                || session.contains(&key)
                || self.state.lock().await.is_known(&key);
            if skip {
                continue;
            }
            debug!(provider = self.name(), credential = %child.redacted(), "verifying discovered key");
            self.verify_boxed(child, session).await;
        }
    }

    /// `verify_in` behind a box, for the discovered-key recursion.
    fn verify_boxed<'a>(
        self: &'a Arc<Self>,
        credential: Credential,
        session: &'a Session,
    ) -> Pin<Box<dyn Future<Output = Option<Transition>> + Send + 'a>> {
        Box::pin(self.verify_in(credential, session))
    }

    async fn verify_each(self: &Arc<Self>, credentials: Vec<Credential>, session: &Arc<Session>) {
        let mut set = JoinSet::new();
        for credential in credentials {
            let checker = Arc::clone(self);
            let session = Arc::clone(session);
            set.spawn(async move {
                checker.verify_in(credential, &session).await;
            });
        }
        while let Some(result) = set.join_next().await {
            if let Err(e) = result {
                warn!(provider = self.name(), error = %e, "verification task failed");
            }
        }
    }

    /// Stored keys parsed back into credentials. Malformed keys are skipped.
    fn parse_all(&self, keys: impl IntoIterator<Item = String>) -> Vec<Credential> {
        keys.into_iter()
            .filter_map(|key| match self.adapter.parse_key(&key) {
                Ok(credential) => Some(credential),
                Err(e) => {
                    warn!(provider = self.name(), error = %e, "skipping malformed stored key");
                    None
                }
            })
            .collect()
    }

    /// Re-verify every classified key.
    pub async fn verify_all(self: &Arc<Self>) {
        let keys: Vec<String> = self.state.lock().await.keys.keys().cloned().collect();
        info!(provider = self.name(), keys = keys.len(), "full refresh");
        let credentials = self.parse_all(keys);
        self.verify_each(credentials, &Arc::default()).await;
    }

    /// Re-verify only keys flagged as over quota.
    pub async fn reverify_quota_exhausted(self: &Arc<Self>) {
        let keys: Vec<String> = self.state.lock().await.quota_exhausted.iter().cloned().collect();
        info!(provider = self.name(), keys = keys.len(), "quota refresh");
        let credentials = self.parse_all(keys);
        self.verify_each(credentials, &Arc::default()).await;
    }

    pub async fn list(&self, tier: Option<&str>) -> Vec<String> {
        self.state.lock().await.list(tier)
    }

    /// Uniformly random key from `list(tier)`.
    pub async fn pick(&self, tier: Option<&str>) -> Result<String> {
        let keys = self.list(tier).await;
        if keys.is_empty() {
            return Err(Error::NotFound {
                provider: self.name().to_string(),
                tier: tier.map(str::to_string),
            });
        }
        let index = rand::rng().random_range(0..keys.len());
        Ok(keys[index].clone())
    }

    pub async fn tiers(&self) -> BTreeMap<String, Vec<String>> {
        self.state.lock().await.tiers()
    }

    /// Copy of the current state.
    pub async fn snapshot(&self) -> ProviderState {
        self.state.lock().await.clone()
    }
}

impl Reverify for Checker {
    fn reverify(self: Arc<Self>, credential: Credential) -> Pin<Box<dyn Future<Output = ()> + Send>> {
        Box::pin(async move {
            self.verify(credential).await;
        })
    }
}
