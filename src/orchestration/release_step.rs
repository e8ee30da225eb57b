//! # Release Step
//!
//! The `release` pipeline instruction: trigger a downstream job and suspend the
//! calling step until that job's outcome is known.
//!
//! ## Protocol
//!
//! ```text
//! ReleaseExecution::start()
//!     1. validate job name                  → Configuration
//!     2. host.find_item(name, container)    → JobNotFound
//!     3. ParameterResolver::resolve         → InvalidParameters
//!     4. registry.register(token, continuation)
//!     5. host.schedule(job, upstream cause, [marker, parameters, token])
//!     6. rejected → registry.unregister(token) → Scheduling
//!     7. Ok(ScheduledRelease)   (caller stays suspended)
//!
//! later, exactly one of:
//!     ReleaseQueueListener   item cancelled  → on_failure(Aborted)
//!     ReleaseRunListener     run finished    → on_success / on_failure(BuildFailed)
//!     ReleaseExecution::stop(cause)          → on_failure(EngineCancelled)
//! ```
//!
//! `start()` never waits for the downstream build; the engine awaits the
//! [`ContinuationHandle`](super::continuation::ContinuationHandle) instead.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use super::continuation::Continuation;
use super::parameter_resolver::ParameterResolver;
use crate::error::{ReleaseError, Result};
use crate::host::HostFacade;
use crate::models::{Cause, InvokingRun, ItemKind, ParameterValue, QueueItemId, ScheduleAttachment};
use crate::registry::{CorrelationRegistry, CorrelationToken};

/// Arguments of the `release` instruction
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReleaseStep {
    /// Name of the job to release, relative to the invoking run's folder
    #[serde(default)]
    pub job: String,
    #[serde(default)]
    pub parameters: Vec<ParameterValue>,
}

impl ReleaseStep {
    pub fn new(job: impl Into<String>) -> Self {
        Self {
            job: job.into(),
            parameters: Vec::new(),
        }
    }

    pub fn with_parameter(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.push(ParameterValue::new(name, value));
        self
    }
}

/// Describes the `release` instruction to the pipeline engine
#[derive(Debug, Clone, Copy, Default)]
pub struct ReleaseStepDescriptor;

impl ReleaseStepDescriptor {
    pub const FUNCTION_NAME: &'static str = "release";
    pub const DISPLAY_NAME: &'static str = "Trigger release for the job";

    pub fn function_name(&self) -> &'static str {
        Self::FUNCTION_NAME
    }

    pub fn display_name(&self) -> &'static str {
        Self::DISPLAY_NAME
    }

    /// Build a step from the argument map a pipeline script passed
    pub fn new_instance(&self, arguments: serde_json::Value) -> Result<ReleaseStep> {
        serde_json::from_value(arguments).map_err(|e| {
            ReleaseError::Configuration(format!(
                "Invalid arguments for {}: {e}",
                Self::FUNCTION_NAME
            ))
        })
    }
}

/// Collaborators a release execution needs
#[derive(Clone)]
pub struct ReleaseServices {
    pub host: Arc<dyn HostFacade>,
    pub registry: Arc<CorrelationRegistry>,
    pub resolver: ParameterResolver,
}

impl fmt::Debug for ReleaseServices {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReleaseServices")
            .field("registry", &self.registry)
            .field("resolver", &self.resolver)
            .finish()
    }
}

/// Returned by a successful `start()`: the caller is now suspended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledRelease {
    pub queue_item_id: QueueItemId,
    pub token: CorrelationToken,
}

#[derive(Debug, Default)]
struct ExecutionState {
    started: bool,
    token: Option<CorrelationToken>,
    /// Full name of the resolved downstream job
    job_name: Option<String>,
}

/// One invocation of the `release` instruction
pub struct ReleaseExecution {
    step: ReleaseStep,
    invoking_run: InvokingRun,
    continuation: Continuation,
    services: ReleaseServices,
    state: Mutex<ExecutionState>,
}

/// Unregisters a token unless the host accepted the scheduling request.
///
/// Covers rejection as well as the `start()` future being dropped while the
/// host is still scheduling.
struct PendingRegistration<'a> {
    execution: &'a ReleaseExecution,
    token: CorrelationToken,
    armed: bool,
}

impl Drop for PendingRegistration<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        self.execution.services.registry.unregister(&self.token);
        let mut state = self.execution.state.lock();
        if state.token == Some(self.token) {
            state.token = None;
        }
        debug!(token = %self.token, "Release was not scheduled, correlation removed");
    }
}

impl fmt::Debug for ReleaseExecution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReleaseExecution")
            .field("step", &self.step)
            .field("invoking_run", &self.invoking_run)
            .field("continuation", &self.continuation)
            .field("state", &*self.state.lock())
            .finish()
    }
}

impl ReleaseExecution {
    pub fn new(
        step: ReleaseStep,
        invoking_run: InvokingRun,
        continuation: Continuation,
        services: ReleaseServices,
    ) -> Self {
        Self {
            step,
            invoking_run,
            continuation,
            services,
            state: Mutex::new(ExecutionState::default()),
        }
    }

    pub fn step(&self) -> &ReleaseStep {
        &self.step
    }

    /// Token registered for this invocation while it is outstanding
    pub fn token(&self) -> Option<CorrelationToken> {
        self.state.lock().token
    }

    /// Validate, resolve parameters and submit the downstream build.
    ///
    /// Errors are synchronous and leave nothing registered; on `Ok` the
    /// continuation is resolved later by a listener or by [`stop`](Self::stop).
    /// An execution starts at most once.
    #[instrument(skip(self), fields(job = %self.step.job, invoking_run = %self.invoking_run.run))]
    pub async fn start(&self) -> Result<ScheduledRelease> {
        let job_name = self.step.job.trim();
        {
            let mut state = self.state.lock();
            if state.started || self.continuation.is_resolved() {
                return Err(ReleaseError::Configuration(format!(
                    "Release of {job_name} was already started"
                )));
            }
            state.started = true;
        }
        if job_name.is_empty() {
            return Err(ReleaseError::Configuration(
                "Job name is not defined.".to_string(),
            ));
        }

        let project = self
            .services
            .host
            .find_item(job_name, &self.invoking_run.parent, ItemKind::Project)
            .await
            .ok_or_else(|| ReleaseError::JobNotFound {
                job_name: job_name.to_string(),
            })?;

        self.state.lock().job_name = Some(project.full_name.clone());
        info!("Releasing project: {}", project.full_display_name());
        debug!(kind = ?project.kind, full_name = %project.full_name, "Project resolved");

        let parameters = self.services.resolver.resolve(
            &project.full_name,
            &project.parameter_definitions,
            &self.step.parameters,
        )?;

        let token = CorrelationToken::new();
        self.services
            .registry
            .register(token, self.continuation.clone());
        self.state.lock().token = Some(token);
        let mut registration = PendingRegistration {
            execution: self,
            token,
            armed: true,
        };

        let attachments = vec![
            ScheduleAttachment::ReleaseMarker,
            ScheduleAttachment::Parameters { parameters },
            ScheduleAttachment::Correlation { token },
        ];
        let cause = Cause::upstream(self.invoking_run.run.clone());

        match self
            .services
            .host
            .schedule(&project, cause, attachments)
            .await
        {
            Some(queue_item_id) => {
                registration.armed = false;
                info!(
                    token = %token,
                    queue_item_id = %queue_item_id,
                    "Release scheduled, waiting for downstream build"
                );
                Ok(ScheduledRelease {
                    queue_item_id,
                    token,
                })
            }
            None => {
                drop(registration);
                warn!(token = %token, "Host rejected release scheduling request");
                Err(ReleaseError::Scheduling {
                    job_name: project.full_name,
                })
            }
        }
    }

    /// Fail the caller because the engine stopped it (cancellation, timeout).
    ///
    /// The downstream item or run is left alone. Returns `false` when the
    /// continuation was already resolved.
    pub fn stop(&self, cause: impl fmt::Display) -> bool {
        let (token, job_name) = {
            let mut state = self.state.lock();
            let job_name = state
                .job_name
                .clone()
                .unwrap_or_else(|| self.step.job.trim().to_string());
            (state.token.take(), job_name)
        };
        if let Some(token) = token {
            self.services.registry.unregister(&token);
        }

        let resolved = self.continuation.on_failure(ReleaseError::EngineCancelled {
            job_name: job_name.clone(),
            reason: cause.to_string(),
        });
        if resolved {
            info!(job = %job_name, "Release stopped: {}", cause);
        } else {
            debug!(job = %job_name, "Release already resolved, stop is a no-op");
        }
        resolved
    }
}
