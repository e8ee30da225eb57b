//! # Registry Infrastructure
//!
//! The correlation registry that lets event listeners find the release steps
//! waiting on a queue item or run.
//!
//! ```text
//! ReleaseExecution ── register(token) ──→ CorrelationRegistry ←── claim(item) ── ReleaseQueueListener
//!                                                ↑
//!                                                └─────────── claim(run) ─── ReleaseRunListener
//! ```

pub mod correlation_registry;

pub use correlation_registry::{
    ClaimedRelease, CorrelationRegistry, CorrelationRegistryStats, CorrelationToken,
};
