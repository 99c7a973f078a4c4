//! All checkers, addressed by provider name

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use provider::ProviderAdapter;
use serde::Serialize;
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::checker::Checker;
use crate::error::{Error, Result};
use crate::scheduler::Scheduler;
use crate::store::JsonFileStore;

/// Per-provider entry of `Registry::summary`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderSummary {
    /// Every classified key, dead ones included.
    pub count: usize,
    /// Each key and its label.
    pub keys: BTreeMap<String, String>,
}

pub struct Registry {
    checkers: Vec<Arc<Checker>>,
}

impl Registry {
    pub fn new(checkers: Vec<Arc<Checker>>) -> Self {
        Self { checkers }
    }

    /// One checker per adapter, each backed by `<storage_dir>/<name>.json`.
    pub async fn load(
        adapters: Vec<Arc<dyn ProviderAdapter>>,
        storage_dir: &Path,
        scheduler: Arc<dyn Scheduler>,
        retry_delay: Duration,
    ) -> Self {
        let mut checkers = Vec::with_capacity(adapters.len());
        for adapter in adapters {
            let store = Arc::new(JsonFileStore::new(storage_dir, adapter.name()));
            checkers.push(Checker::load(adapter, store, scheduler.clone(), retry_delay).await);
        }
        info!(providers = checkers.len(), dir = %storage_dir.display(), "registry loaded");
        Self::new(checkers)
    }

    pub fn providers(&self) -> impl Iterator<Item = &str> {
        self.checkers.iter().map(|c| c.name())
    }

    pub fn checker(&self, provider: &str) -> Result<&Arc<Checker>> {
        self.checkers
            .iter()
            .find(|c| c.name() == provider)
            .ok_or_else(|| Error::UnknownProvider(provider.to_string()))
    }

    /// Offer `text` to every provider concurrently.
    pub async fn scan(&self, text: &str) {
        let text: Arc<str> = Arc::from(text);
        self.for_each(move |checker| {
            let text = text.clone();
            async move { checker.scan(&text).await }
        })
        .await;
    }

    pub async fn verify_all(&self) {
        self.for_each(|checker| async move { checker.verify_all().await })
            .await;
    }

    pub async fn reverify_quota_exhausted(&self) {
        self.for_each(|checker| async move { checker.reverify_quota_exhausted().await })
            .await;
    }

    async fn for_each<F, Fut>(&self, f: F)
    where
        F: Fn(Arc<Checker>) -> Fut,
        Fut: std::future::Future<Output = ()> + Send + 'static,
    {
        let mut set = JoinSet::new();
        for checker in &self.checkers {
            set.spawn(f(Arc::clone(checker)));
        }
        while let Some(result) = set.join_next().await {
            if let Err(e) = result {
                warn!(error = %e, "provider task failed");
            }
        }
    }

    pub async fn list(&self, provider: &str, tier: Option<&str>) -> Result<Vec<String>> {
        Ok(self.checker(provider)?.list(tier).await)
    }

    pub async fn pick(&self, provider: &str, tier: Option<&str>) -> Result<String> {
        self.checker(provider)?.pick(tier).await
    }

    pub async fn tiers(&self, provider: &str) -> Result<BTreeMap<String, Vec<String>>> {
        Ok(self.checker(provider)?.tiers().await)
    }

    pub async fn summary(&self) -> BTreeMap<String, ProviderSummary> {
        let mut summary = BTreeMap::new();
        for checker in &self.checkers {
            let keys = checker.snapshot().await.keys;
            summary.insert(
                checker.name().to_string(),
                ProviderSummary {
                    count: keys.len(),
                    keys,
                },
            );
        }
        summary
    }
}
