//! Fails waiting release steps whose downstream queue item was cancelled.

use std::sync::Arc;
use tracing::{debug, trace};

use crate::error::ReleaseError;
use crate::events::QueueListener;
use crate::logging::log_release_resolution;
use crate::models::{CorrelatedWork, LeftItem};
use crate::registry::CorrelationRegistry;

#[derive(Debug, Clone)]
pub struct ReleaseQueueListener {
    registry: Arc<CorrelationRegistry>,
}

impl ReleaseQueueListener {
    pub fn new(registry: Arc<CorrelationRegistry>) -> Self {
        Self { registry }
    }
}

impl QueueListener for ReleaseQueueListener {
    fn on_left(&self, left: &LeftItem) {
        if !left.is_cancelled() {
            // Started normally; the run listener resolves it when the run finishes.
            trace!(item = %left.work_label(), "Queue item started, deferring to run completion");
            return;
        }

        let claimed = self.registry.claim(left);
        if claimed.is_empty() {
            trace!(item = %left.work_label(), "Cancelled queue item has no waiting release");
            return;
        }

        let job_name = left.item.task.full_display_name();
        for release in claimed {
            let resolved = release.continuation.on_failure(ReleaseError::Aborted {
                job_name: job_name.clone(),
            });
            if resolved {
                log_release_resolution(
                    &job_name,
                    &release.token,
                    self.listener_name(),
                    "aborted",
                    Some("downstream queue item was cancelled"),
                );
            } else {
                debug!(token = %release.token, "Release already resolved before cancellation arrived");
            }
        }
    }

    fn listener_name(&self) -> &str {
        "release_queue_listener"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Cause, JobInfo, QueueItem, QueueItemId, RunReference, ScheduleAttachment};
    use crate::orchestration::continuation::Continuation;
    use crate::registry::CorrelationToken;

    fn item(token: CorrelationToken) -> QueueItem {
        QueueItem {
            id: QueueItemId(9),
            task: JobInfo::project("team/deploy"),
            cause: Cause::upstream(RunReference::new("team/pipeline", 1)),
            attachments: vec![
                ScheduleAttachment::ReleaseMarker,
                ScheduleAttachment::Correlation { token },
            ],
            queued_at: chrono::Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_cancellation_aborts_waiting_release() {
        let registry = Arc::new(CorrelationRegistry::new());
        let (continuation, handle) = Continuation::channel("team/deploy");
        let token = CorrelationToken::new();
        registry.register(token, continuation);
        let listener = ReleaseQueueListener::new(registry.clone());

        listener.on_left(&LeftItem::cancelled(item(token)));

        let err = handle.await.unwrap_err();
        assert_eq!(
            err,
            ReleaseError::Aborted {
                job_name: "team » deploy".into()
            }
        );
        assert_eq!(err.to_string(), "Build of team » deploy was cancelled");
        assert_eq!(registry.pending_count(), 0);
    }

    #[test]
    fn test_started_item_is_left_for_run_listener() {
        let registry = Arc::new(CorrelationRegistry::new());
        let (continuation, _handle) = Continuation::channel("team/deploy");
        let token = CorrelationToken::new();
        registry.register(token, continuation.clone());
        let listener = ReleaseQueueListener::new(registry.clone());

        listener.on_left(&LeftItem::started(item(token)));

        assert!(!continuation.is_resolved());
        assert!(registry.contains(&token));
    }

    #[test]
    fn test_unrelated_cancellation_is_ignored() {
        let registry = Arc::new(CorrelationRegistry::new());
        let listener = ReleaseQueueListener::new(registry.clone());
        listener.on_left(&LeftItem::cancelled(item(CorrelationToken::new())));
        assert_eq!(registry.stats().resolved_total, 0);
    }
}
