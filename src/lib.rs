#![allow(clippy::doc_markdown)] // Allow technical terms in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Release Trigger
//!
//! A `release` pipeline step: trigger a downstream job in a folder-based job host
//! and suspend the calling step until that job's build finishes, is cancelled, or
//! the caller is stopped.
//!
//! ## Architecture
//!
//! The step never blocks a thread while it waits. `start()` registers a
//! correlation token, tags the scheduled queue item with it and returns. Two
//! listeners on the host's event stream claim the token later:
//!
//! - a queue item that leaves the queue cancelled fails the caller
//! - a finished run resolves the caller with its result
//!
//! Claiming removes the token, so each caller is resumed exactly once no matter
//! how many events or `stop()` calls race for it.
//!
//! ## Module Organization
//!
//! - [`orchestration`] - The release step, parameter resolution, listeners and service
//! - [`registry`] - Correlation tokens and the registry of waiting callers
//! - [`host`] - The host facade trait and an in-memory host
//! - [`events`] - Host events and the listener router
//! - [`models`] - Jobs, parameters, queue items and runs
//! - [`config`] - Layered configuration
//! - [`error`] - Structured error handling
//! - [`logging`] - Tracing subscriber setup
//!
//! ## Testing
//!
//! ```bash
//! cargo test --lib    # Unit tests
//! cargo test          # Unit and integration tests
//! ```

pub mod config;
pub mod error;
pub mod events;
pub mod host;
pub mod logging;
pub mod models;
pub mod orchestration;
pub mod registry;

pub use config::{ReleaseConfig, UnknownParameterPolicy};
pub use error::{ReleaseError, Result};
pub use host::{HostFacade, InMemoryHost};
pub use models::{
    InvokingRun, JobInfo, ParameterDefinition, ParameterValue, ReleaseOutcome, RunReference,
    RunResult,
};
pub use orchestration::{
    Continuation, ContinuationHandle, ReleaseExecution, ReleaseService, ReleaseStep,
    ReleaseStepDescriptor,
};
pub use registry::{CorrelationRegistry, CorrelationToken};
