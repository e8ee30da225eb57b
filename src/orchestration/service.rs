//! # Release Service
//!
//! Wires a host, the correlation registry and the two listeners together.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use release_trigger::config::ReleaseConfig;
//! use release_trigger::host::InMemoryHost;
//! use release_trigger::models::{InvokingRun, RunReference};
//! use release_trigger::orchestration::{ReleaseService, ReleaseStep};
//!
//! # async fn example() -> release_trigger::error::Result<()> {
//! let host = Arc::new(InMemoryHost::default());
//! let service = ReleaseService::new(host, ReleaseConfig::default());
//! let _listeners = service.spawn_listeners();
//!
//! let outcome = service
//!     .release(
//!         ReleaseStep::new("deploy").with_parameter("version", "2.0"),
//!         InvokingRun::new(RunReference::new("pipeline", 7)),
//!     )
//!     .await?;
//! println!("released {}", outcome.run);
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::info;

use super::continuation::{Continuation, ContinuationHandle, StepResult};
use super::parameter_resolver::ParameterResolver;
use super::queue_listener::ReleaseQueueListener;
use super::release_step::{ReleaseExecution, ReleaseServices, ReleaseStep};
use super::run_listener::ReleaseRunListener;
use crate::config::ReleaseConfig;
use crate::events::{HostEventRouter, RouterStats};
use crate::host::HostFacade;
use crate::models::InvokingRun;
use crate::registry::CorrelationRegistry;

/// Router task started by [`ReleaseService::spawn_listeners`]
#[derive(Debug)]
pub struct ListenerTask {
    pub router: Arc<HostEventRouter>,
    pub handle: JoinHandle<()>,
}

impl ListenerTask {
    pub fn stats(&self) -> RouterStats {
        self.router.stats()
    }

    pub fn abort(&self) {
        self.handle.abort();
    }
}

pub struct ReleaseService {
    host: Arc<dyn HostFacade>,
    registry: Arc<CorrelationRegistry>,
    config: ReleaseConfig,
}

impl fmt::Debug for ReleaseService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReleaseService")
            .field("registry", &self.registry)
            .field("config", &self.config)
            .finish()
    }
}

impl ReleaseService {
    pub fn new(host: Arc<dyn HostFacade>, config: ReleaseConfig) -> Self {
        Self {
            host,
            registry: Arc::new(CorrelationRegistry::new()),
            config,
        }
    }

    pub fn registry(&self) -> &Arc<CorrelationRegistry> {
        &self.registry
    }

    pub fn config(&self) -> &ReleaseConfig {
        &self.config
    }

    pub fn services(&self) -> ReleaseServices {
        ReleaseServices {
            host: Arc::clone(&self.host),
            registry: Arc::clone(&self.registry),
            resolver: ParameterResolver::new(self.config.unknown_parameter_policy),
        }
    }

    /// Prepare an execution for an engine that drives `start`/`stop` itself
    pub fn execution(
        &self,
        step: ReleaseStep,
        invoking_run: InvokingRun,
    ) -> (ReleaseExecution, ContinuationHandle) {
        let (continuation, handle) = Continuation::channel(step.job.clone());
        let execution = ReleaseExecution::new(step, invoking_run, continuation, self.services());
        (execution, handle)
    }

    /// Subscribe both release listeners to the host event stream.
    ///
    /// The subscription exists when this returns, so releases started afterwards
    /// see every event for their downstream work.
    pub fn spawn_listeners(&self) -> ListenerTask {
        let router = Arc::new(
            HostEventRouter::new()
                .with_queue_listener(Arc::new(ReleaseQueueListener::new(Arc::clone(
                    &self.registry,
                ))))
                .with_run_listener(Arc::new(ReleaseRunListener::new(Arc::clone(
                    &self.registry,
                )))),
        );
        let handle = router.spawn(self.host.subscribe());
        info!("Release listeners subscribed to host events");
        ListenerTask { router, handle }
    }

    /// Trigger `step` and wait for the downstream build's outcome.
    ///
    /// Requires [`spawn_listeners`](Self::spawn_listeners). Dropping the returned
    /// future stops the release, including while the host is still scheduling.
    pub async fn release(&self, step: ReleaseStep, invoking_run: InvokingRun) -> StepResult {
        let (execution, handle) = self.execution(step, invoking_run);
        let mut guard = StopOnDrop {
            execution: &execution,
            armed: true,
        };

        let result = match execution.start().await {
            Ok(_) => handle.await,
            Err(e) => Err(e),
        };
        guard.armed = false;
        result
    }
}

struct StopOnDrop<'a> {
    execution: &'a ReleaseExecution,
    armed: bool,
}

impl Drop for StopOnDrop<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.execution.stop("release future dropped");
        }
    }
}
