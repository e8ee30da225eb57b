//! # Correlation Registry
//!
//! Links scheduled units of work back to the continuations waiting on them.
//!
//! ## Overview
//!
//! A release step registers a fresh [`CorrelationToken`] with its continuation,
//! then attaches only the token to the scheduling request. The host copies the
//! attachment from the queue item onto the resulting run, so both listeners can
//! find the waiting continuation from whichever unit of work they are notified
//! about. Lookups walk the attachments of that unit of work, never the whole
//! registry.
//!
//! ## Exactly-once
//!
//! [`CorrelationRegistry::claim`] removes entries atomically; a second claim for
//! the same unit of work (duplicate delivery) finds nothing. The continuation
//! itself also refuses a second resolution, which covers `stop()` racing a
//! listener.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::models::CorrelatedWork;
use crate::orchestration::continuation::Continuation;

/// Opaque id linking a queue item or run to a waiting continuation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CorrelationToken(Uuid);

impl CorrelationToken {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for CorrelationToken {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CorrelationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Registry snapshot for monitoring
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CorrelationRegistryStats {
    /// Tokens still waiting for an outcome
    pub outstanding: usize,
    pub registered_total: u64,
    /// Tokens claimed by a listener
    pub resolved_total: u64,
    /// Tokens removed without a listener (scheduling rejected, step stopped)
    pub unregistered_total: u64,
    pub oldest_pending_age_ms: Option<u64>,
}

#[derive(Clone)]
struct PendingRelease {
    continuation: Continuation,
    registered_at: Instant,
    registered_wall_clock: DateTime<Utc>,
}

/// A continuation removed from the registry, ready to be resolved
#[derive(Clone)]
pub struct ClaimedRelease {
    pub token: CorrelationToken,
    pub continuation: Continuation,
    pub registered_at: DateTime<Utc>,
}

impl fmt::Debug for ClaimedRelease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClaimedRelease")
            .field("token", &self.token)
            .field("job_name", &self.continuation.job_name())
            .field("registered_at", &self.registered_at)
            .finish()
    }
}

/// Concurrent token → continuation map
#[derive(Default)]
pub struct CorrelationRegistry {
    pending: DashMap<CorrelationToken, PendingRelease>,
    registered_total: AtomicU64,
    resolved_total: AtomicU64,
    unregistered_total: AtomicU64,
}

impl fmt::Debug for CorrelationRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CorrelationRegistry")
            .field("outstanding", &self.pending.len())
            .field(
                "registered_total",
                &self.registered_total.load(Ordering::Relaxed),
            )
            .finish()
    }
}

impl CorrelationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a token to the continuation waiting on it
    pub fn register(&self, token: CorrelationToken, continuation: Continuation) {
        debug!(
            token = %token,
            job_name = %continuation.job_name(),
            "Registering release correlation"
        );
        let previous = self.pending.insert(
            token,
            PendingRelease {
                continuation,
                registered_at: Instant::now(),
                registered_wall_clock: Utc::now(),
            },
        );
        if previous.is_some() {
            warn!(token = %token, "Correlation token registered twice, replacing continuation");
        }
        self.registered_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Continuations waiting on a unit of work, in attachment order.
    ///
    /// Entries stay registered; use [`claim`](Self::claim) to take them.
    pub fn lookup<W: CorrelatedWork + ?Sized>(&self, work: &W) -> Vec<Continuation> {
        work.correlation_tokens()
            .iter()
            .filter_map(|token| self.pending.get(token).map(|p| p.continuation.clone()))
            .collect()
    }

    /// Remove and return every continuation waiting on a unit of work.
    ///
    /// Only the first caller for a given token gets it back.
    pub fn claim<W: CorrelatedWork + ?Sized>(&self, work: &W) -> Vec<ClaimedRelease> {
        let claimed: Vec<ClaimedRelease> = work
            .correlation_tokens()
            .into_iter()
            .filter_map(|token| {
                self.pending.remove(&token).map(|(token, pending)| ClaimedRelease {
                    token,
                    continuation: pending.continuation,
                    registered_at: pending.registered_wall_clock,
                })
            })
            .collect();

        if !claimed.is_empty() {
            self.resolved_total
                .fetch_add(claimed.len() as u64, Ordering::Relaxed);
        }
        claimed
    }

    /// Forget a token so no later event can match it
    pub fn unregister(&self, token: &CorrelationToken) -> Option<Continuation> {
        let removed = self.pending.remove(token).map(|(_, p)| p.continuation);
        if removed.is_some() {
            self.unregistered_total.fetch_add(1, Ordering::Relaxed);
            debug!(token = %token, "Unregistered release correlation");
        }
        removed
    }

    pub fn contains(&self, token: &CorrelationToken) -> bool {
        self.pending.contains_key(token)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn stats(&self) -> CorrelationRegistryStats {
        let oldest_pending_age_ms = self
            .pending
            .iter()
            .map(|entry| entry.value().registered_at.elapsed().as_millis() as u64)
            .max();

        CorrelationRegistryStats {
            outstanding: self.pending.len(),
            registered_total: self.registered_total.load(Ordering::Relaxed),
            resolved_total: self.resolved_total.load(Ordering::Relaxed),
            unregistered_total: self.unregistered_total.load(Ordering::Relaxed),
            oldest_pending_age_ms,
        }
    }
}
