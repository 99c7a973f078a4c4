//! Periodic background re-verification
//!
//! Two independent timers: a full refresh of every classified key, and a
//! slower pass over quota-exhausted keys (quotas reset on a monthly scale).
//! Both run off the request path and are dropped on shutdown.

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::registry::Registry;

/// Which keys a sweep re-verifies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sweep {
    /// Every classified key. Also runs once at startup.
    Full,
    /// Only quota-exhausted keys. First run after one interval.
    QuotaExhausted,
}

impl Sweep {
    pub fn label(&self) -> &'static str {
        match self {
            Sweep::Full => "full",
            Sweep::QuotaExhausted => "quota_exhausted",
        }
    }

    async fn run(&self, registry: &Registry) {
        match self {
            Sweep::Full => registry.verify_all().await,
            Sweep::QuotaExhausted => registry.reverify_quota_exhausted().await,
        }
    }
}

/// Spawn a task that runs `sweep` every `interval`.
pub fn spawn_sweep_task(
    registry: Arc<Registry>,
    sweep: Sweep,
    interval: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // The first tick completes immediately
        if sweep == Sweep::QuotaExhausted {
            ticker.tick().await;
        }

        loop {
            ticker.tick().await;
            info!(sweep = sweep.label(), "sweep starting");
            sweep.run(&registry).await;
            info!(sweep = sweep.label(), "sweep finished");
        }
    })
}
