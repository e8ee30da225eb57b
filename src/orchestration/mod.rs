//! # Release Orchestration
//!
//! Everything between the pipeline engine calling `release` and the caller
//! resuming with an outcome.
//!
//! ## Core Components
//!
//! - **ReleaseExecution**: validates the step, resolves parameters, registers a
//!   correlation token and schedules the downstream job
//! - **ParameterResolver**: merges declared defaults with explicit values
//! - **ReleaseQueueListener**: fails callers whose downstream item was cancelled
//! - **ReleaseRunListener**: resolves callers when their downstream run finishes
//! - **Continuation**: the suspended caller; the first resolution wins
//! - **ReleaseService**: wires the above to a [`HostFacade`](crate::host::HostFacade)

pub mod continuation;
pub mod form_validation;
pub mod parameter_resolver;
pub mod queue_listener;
pub mod release_step;
pub mod run_listener;
pub mod service;

pub use continuation::{Continuation, ContinuationHandle, StepResult};
pub use form_validation::validate_release_form;
pub use parameter_resolver::ParameterResolver;
pub use queue_listener::ReleaseQueueListener;
pub use release_step::{
    ReleaseExecution, ReleaseServices, ReleaseStep, ReleaseStepDescriptor, ScheduledRelease,
};
pub use run_listener::ReleaseRunListener;
pub use service::{ListenerTask, ReleaseService};
