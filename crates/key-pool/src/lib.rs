//! Credential lifecycle engine
//!
//! Tracks, per provider, every key ever verified and what the provider last
//! said about it. Keys enter on their first successful (or rate-limited)
//! verification and leave only through the two-strikes `dead` rule.
//!
//! Key lifecycle:
//! 1. Text is scanned → each adapter extracts candidates not yet classified
//! 2. Adapter verifies → `Outcome` applied to `ProviderState`, state persisted
//! 3. Rate-limited → one retry scheduled after the fixed delay
//! 4. Over quota → flagged; the quota sweep re-checks it later
//! 5. Rejected → unclassified keys are forgotten when their batch ends; classified
//!    keys are marked `dead`, then evicted on the next failure
//! 6. Background sweeps re-verify every key periodically

pub mod checker;
pub mod error;
pub mod registry;
pub mod scheduler;
pub mod state;
pub mod store;
pub mod sweep;

pub use checker::Checker;
pub use error::{Error, Result};
pub use registry::{ProviderSummary, Registry};
pub use scheduler::{ManualScheduler, RetryTask, Reverify, Scheduler, TokioScheduler};
pub use state::{DEAD, ProviderState, RATE_LIMITED, Transition};
pub use store::{JsonFileStore, LifecycleStore};
pub use sweep::{Sweep, spawn_sweep_task};
