//! Deferred one-shot re-verification
//!
//! A rate-limited key gets exactly one retry after a fixed delay. The
//! scheduler only owns the timing; the retry itself goes back through the
//! owning checker via `Reverify`, so it takes the same lock, in-flight guard
//! and state machine as any other verification.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use provider::Credential;
use tracing::debug;

/// Something that can verify a credential again, detached from the caller.
///
/// Takes `Arc<Self>` so the returned future is `'static` and can outlive
/// whoever scheduled it.
pub trait Reverify: Send + Sync {
    fn reverify(self: Arc<Self>, credential: Credential) -> Pin<Box<dyn Future<Output = ()> + Send>>;
}

/// One pending retry.
pub struct RetryTask {
    pub provider: String,
    pub credential: Credential,
    pub target: Arc<dyn Reverify>,
}

impl RetryTask {
    pub async fn run(self) {
        debug!(provider = %self.provider, credential = %self.credential.redacted(), "retry firing");
        self.target.reverify(self.credential).await;
    }
}

impl std::fmt::Debug for RetryTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryTask")
            .field("provider", &self.provider)
            .field("credential", &self.credential)
            .finish()
    }
}

/// Fire-and-forget deferred execution. No cancellation.
pub trait Scheduler: Send + Sync {
    fn schedule(&self, delay: Duration, task: RetryTask);
}

/// Detached tokio task per retry. Pending retries are lost on shutdown.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioScheduler;

impl Scheduler for TokioScheduler {
    fn schedule(&self, delay: Duration, task: RetryTask) {
        debug!(
            provider = %task.provider,
            credential = %task.credential.redacted(),
            delay_secs = delay.as_secs(),
            "retry scheduled"
        );
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            task.run().await;
        });
    }
}

/// Holds retries until fired explicitly.
#[derive(Debug, Default)]
pub struct ManualScheduler {
    pending: Mutex<Vec<(Duration, RetryTask)>>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending(&self) -> usize {
        self.lock().len()
    }

    pub fn delays(&self) -> Vec<Duration> {
        self.lock().iter().map(|(delay, _)| *delay).collect()
    }

    /// Run every retry queued so far, in order. Retries scheduled while
    /// firing stay queued for the next call. Returns how many ran.
    pub async fn fire_all(&self) -> usize {
        let tasks: Vec<_> = std::mem::take(&mut *self.lock());
        let fired = tasks.len();
        for (_, task) in tasks {
            task.run().await;
        }
        fired
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<(Duration, RetryTask)>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(&self, delay: Duration, task: RetryTask) {
        self.lock().push((delay, task));
    }
}
