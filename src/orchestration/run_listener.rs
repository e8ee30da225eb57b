//! Resolves waiting release steps when their downstream run finishes.

use std::sync::Arc;
use tracing::{debug, trace, warn};

use crate::error::ReleaseError;
use crate::events::RunListener;
use crate::logging::log_release_resolution;
use crate::models::{ReleaseOutcome, RunRecord};
use crate::registry::CorrelationRegistry;

#[derive(Debug, Clone)]
pub struct ReleaseRunListener {
    registry: Arc<CorrelationRegistry>,
}

impl ReleaseRunListener {
    pub fn new(registry: Arc<CorrelationRegistry>) -> Self {
        Self { registry }
    }
}

impl RunListener for ReleaseRunListener {
    fn on_completed(&self, run: &RunRecord) {
        let Some(result) = run.result else {
            warn!(run = %run.reference, "Completion event for a run without a result, ignoring");
            return;
        };

        let claimed = self.registry.claim(run);
        if claimed.is_empty() {
            trace!(run = %run.reference, "Completed run has no waiting release");
            return;
        }

        let job_name = run.reference.job_full_name.clone();
        for release in claimed {
            let resolved = if result.is_success() {
                release.continuation.on_success(ReleaseOutcome {
                    job_name: job_name.clone(),
                    run: run.reference.clone(),
                    result,
                })
            } else {
                release.continuation.on_failure(ReleaseError::BuildFailed {
                    job_name: job_name.clone(),
                    run: run.reference.clone(),
                    result,
                })
            };

            if resolved {
                log_release_resolution(
                    &job_name,
                    &release.token,
                    self.listener_name(),
                    if result.is_success() { "success" } else { "failed" },
                    Some(&format!("{} finished with {}", run.reference, result)),
                );
            } else {
                debug!(token = %release.token, "Release already resolved before run completion arrived");
            }
        }
    }

    fn listener_name(&self) -> &str {
        "release_run_listener"
    }
}
