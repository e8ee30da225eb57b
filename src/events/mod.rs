//! # Host Events
//!
//! Out-of-band notifications from the host: a queue item left the queue, or a run
//! finished. The host publishes them on a broadcast channel; the
//! [`HostEventRouter`] fans them out to the registered listeners.

pub mod publisher;
pub mod router;
pub mod types;

pub use publisher::HostEventPublisher;
pub use router::{HostEventRouter, QueueListener, RouterStats, RunListener};
pub use types::HostEvent;
