//! # Host Event Router
//!
//! Consumes the host's event stream on a spawned task and hands each event to
//! every registered listener. Listeners see all events, including ones for queue
//! items and runs unrelated to any release, and must no-op cheaply for those.
//!
//! ```text
//! HostEventPublisher ──broadcast──→ HostEventRouter task
//!                                       ├─→ QueueListener::on_left
//!                                       └─→ RunListener::on_completed
//! ```

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use super::types::HostEvent;
use crate::models::{LeftItem, RunRecord};

/// Reacts to queue items leaving the queue
pub trait QueueListener: Send + Sync {
    fn on_left(&self, item: &LeftItem);

    fn listener_name(&self) -> &str {
        "unnamed_queue_listener"
    }
}

/// Reacts to runs finishing
pub trait RunListener: Send + Sync {
    fn on_completed(&self, run: &RunRecord);

    fn listener_name(&self) -> &str {
        "unnamed_run_listener"
    }
}

/// Counters for the router task
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RouterStats {
    pub events_received: u64,
    pub queue_events: u64,
    pub run_events: u64,
    /// Events the router fell behind on and never saw
    pub events_lagged: u64,
}

#[derive(Default)]
struct RouterCounters {
    events_received: AtomicU64,
    queue_events: AtomicU64,
    run_events: AtomicU64,
    events_lagged: AtomicU64,
}

/// Dispatches host events to queue and run listeners
#[derive(Default)]
pub struct HostEventRouter {
    queue_listeners: Vec<Arc<dyn QueueListener>>,
    run_listeners: Vec<Arc<dyn RunListener>>,
    counters: RouterCounters,
}

impl std::fmt::Debug for HostEventRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostEventRouter")
            .field(
                "queue_listeners",
                &self
                    .queue_listeners
                    .iter()
                    .map(|l| l.listener_name().to_string())
                    .collect::<Vec<_>>(),
            )
            .field(
                "run_listeners",
                &self
                    .run_listeners
                    .iter()
                    .map(|l| l.listener_name().to_string())
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl HostEventRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_queue_listener(mut self, listener: Arc<dyn QueueListener>) -> Self {
        self.queue_listeners.push(listener);
        self
    }

    pub fn with_run_listener(mut self, listener: Arc<dyn RunListener>) -> Self {
        self.run_listeners.push(listener);
        self
    }

    /// Deliver one event to the matching listeners on the current task
    pub fn dispatch(&self, event: &HostEvent) {
        self.counters.events_received.fetch_add(1, Ordering::Relaxed);
        match event {
            HostEvent::QueueItemLeft(item) => {
                self.counters.queue_events.fetch_add(1, Ordering::Relaxed);
                for listener in &self.queue_listeners {
                    listener.on_left(item);
                }
            }
            HostEvent::RunCompleted(run) => {
                self.counters.run_events.fetch_add(1, Ordering::Relaxed);
                for listener in &self.run_listeners {
                    listener.on_completed(run);
                }
            }
        }
    }

    /// Consume `receiver` until the host closes the channel
    pub fn spawn(self: &Arc<Self>, mut receiver: broadcast::Receiver<HostEvent>) -> JoinHandle<()> {
        let router = Arc::clone(self);
        info!(
            queue_listeners = router.queue_listeners.len(),
            run_listeners = router.run_listeners.len(),
            "Starting host event router"
        );

        tokio::spawn(async move {
            loop {
                match receiver.recv().await {
                    Ok(event) => {
                        debug!(event = event.name(), "Routing host event");
                        router.dispatch(&event);
                    }
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        router
                            .counters
                            .events_lagged
                            .fetch_add(missed, Ordering::Relaxed);
                        error!(
                            missed = missed,
                            "Host event router lagged, releases waiting on the missed events will not resolve"
                        );
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        info!("Host event channel closed, stopping router");
                        break;
                    }
                }
            }
        })
    }

    pub fn stats(&self) -> RouterStats {
        RouterStats {
            events_received: self.counters.events_received.load(Ordering::Relaxed),
            queue_events: self.counters.queue_events.load(Ordering::Relaxed),
            run_events: self.counters.run_events.load(Ordering::Relaxed),
            events_lagged: self.counters.events_lagged.load(Ordering::Relaxed),
        }
    }
}
