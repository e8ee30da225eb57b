//! # In-Memory Host
//!
//! A complete [`HostFacade`] backed by process memory: an item tree of projects
//! and folders, a build queue, and run records numbered per job. Queue and run
//! lifecycle transitions publish the same events a real host would:
//!
//! ```text
//! schedule() ──→ queue ──cancel()──→ QueueItemLeft { cancelled: true }
//!                  │
//!                  └──start()──→ QueueItemLeft { cancelled: false }
//!                                   run ──complete()──→ RunCompleted
//! ```
//!
//! Used by the test suite and by embedders that drive builds themselves.

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use super::{resolve_item_path, HostFacade};
use crate::config::ReleaseConfig;
use crate::events::{HostEvent, HostEventPublisher};
use crate::models::{
    Cause, CorrelatedWork, ItemKind, JobInfo, LeftItem, QueueItem, QueueItemId, RunRecord,
    RunReference, RunResult, ScheduleAttachment,
};

#[derive(Default)]
struct HostState {
    queue: BTreeMap<QueueItemId, QueueItem>,
    runs: HashMap<RunReference, RunRecord>,
    next_build_numbers: HashMap<String, u64>,
}

/// Job host living entirely in memory
pub struct InMemoryHost {
    items: DashMap<String, JobInfo>,
    state: Mutex<HostState>,
    publisher: HostEventPublisher,
    scheduling_enabled: AtomicBool,
    next_item_id: AtomicU64,
}

impl std::fmt::Debug for InMemoryHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("InMemoryHost")
            .field("items", &self.items.len())
            .field("queued", &state.queue.len())
            .field("runs", &state.runs.len())
            .field(
                "scheduling_enabled",
                &self.scheduling_enabled.load(Ordering::Relaxed),
            )
            .finish()
    }
}

impl InMemoryHost {
    pub fn new(event_channel_capacity: usize) -> Self {
        Self {
            items: DashMap::new(),
            state: Mutex::new(HostState::default()),
            publisher: HostEventPublisher::new(event_channel_capacity),
            scheduling_enabled: AtomicBool::new(true),
            next_item_id: AtomicU64::new(1),
        }
    }

    /// Host whose event channel uses the configured capacity
    pub fn from_config(config: &ReleaseConfig) -> Self {
        Self::new(config.event_channel_capacity)
    }

    /// Add or replace an item in the tree
    pub fn add_item(&self, item: JobInfo) {
        debug!(full_name = %item.full_name, kind = ?item.kind, "Adding item to host");
        self.items.insert(item.full_name.clone(), item);
    }

    pub fn item(&self, full_name: &str) -> Option<JobInfo> {
        self.items.get(full_name).map(|entry| entry.value().clone())
    }

    /// When disabled, every scheduling request is rejected
    pub fn set_scheduling_enabled(&self, enabled: bool) {
        self.scheduling_enabled.store(enabled, Ordering::Relaxed);
    }

    pub fn publisher(&self) -> &HostEventPublisher {
        &self.publisher
    }

    pub fn queued_items(&self) -> Vec<QueueItem> {
        self.state.lock().queue.values().cloned().collect()
    }

    pub fn queue_len(&self) -> usize {
        self.state.lock().queue.len()
    }

    pub fn queued_item(&self, id: QueueItemId) -> Option<QueueItem> {
        self.state.lock().queue.get(&id).cloned()
    }

    pub fn run(&self, reference: &RunReference) -> Option<RunRecord> {
        self.state.lock().runs.get(reference).cloned()
    }

    /// Runs of a job ordered by build number
    pub fn runs_of(&self, job_full_name: &str) -> Vec<RunRecord> {
        let state = self.state.lock();
        let mut runs: Vec<RunRecord> = state
            .runs
            .values()
            .filter(|run| run.reference.job_full_name == job_full_name)
            .cloned()
            .collect();
        runs.sort_by_key(|run| run.reference.number);
        runs
    }

    /// Cancel a queued item. Returns `false` if it is no longer queued.
    pub fn cancel(&self, id: QueueItemId) -> bool {
        let removed = self.state.lock().queue.remove(&id);
        match removed {
            Some(item) => {
                info!(queue_item_id = %id, job = %item.task.full_name, "Queue item cancelled");
                self.publisher
                    .publish(HostEvent::QueueItemLeft(LeftItem::cancelled(item)));
                true
            }
            None => {
                debug!(queue_item_id = %id, "Cancel requested for item no longer queued");
                false
            }
        }
    }

    /// Bind a queued item to an executor, turning it into a run.
    ///
    /// The run inherits the item's attachments and takes its environment from the
    /// parameters attachment.
    pub fn start(&self, id: QueueItemId) -> Option<RunRecord> {
        let (item, run) = {
            let mut state = self.state.lock();
            let item = state.queue.remove(&id)?;
            let number = {
                let next = state
                    .next_build_numbers
                    .entry(item.task.full_name.clone())
                    .or_insert(1);
                let number = *next;
                *next += 1;
                number
            };
            let reference = RunReference::new(item.task.full_name.clone(), number);
            let run = RunRecord {
                display_name: format!("{} #{}", item.task.full_display_name(), number),
                reference: reference.clone(),
                queue_item_id: item.id,
                cause: item.cause.clone(),
                attachments: item.attachments.clone(),
                environment: item
                    .parameters()
                    .map(|p| p.to_environment())
                    .unwrap_or_default(),
                result: None,
                started_at: Utc::now(),
                completed_at: None,
            };
            state.runs.insert(reference, run.clone());
            (item, run)
        };

        info!(queue_item_id = %id, run = %run.reference, "Queue item started running");
        self.publisher
            .publish(HostEvent::QueueItemLeft(LeftItem::started(item)));
        Some(run)
    }

    /// Record a run's terminal result. Returns `None` for unknown or already
    /// completed runs.
    pub fn complete(&self, reference: &RunReference, result: RunResult) -> Option<RunRecord> {
        let completed = {
            let mut state = self.state.lock();
            let run = state.runs.get_mut(reference)?;
            if run.is_complete() {
                warn!(run = %reference, "Run already completed, ignoring result {}", result);
                return None;
            }
            run.result = Some(result);
            run.completed_at = Some(Utc::now());
            run.clone()
        };

        info!(run = %reference, result = %result, "Run completed");
        self.publisher
            .publish(HostEvent::RunCompleted(completed.clone()));
        Some(completed)
    }

    /// Start the oldest queued item of a job and complete it with `result`
    pub fn run_next(&self, job_full_name: &str, result: RunResult) -> Option<RunRecord> {
        let id = self
            .state
            .lock()
            .queue
            .values()
            .find(|item| item.task.full_name == job_full_name)
            .map(|item| item.id)?;
        let run = self.start(id)?;
        self.complete(&run.reference, result)
    }
}

impl Default for InMemoryHost {
    fn default() -> Self {
        Self::new(crate::events::publisher::DEFAULT_EVENT_CHANNEL_CAPACITY)
    }
}

#[async_trait]
impl HostFacade for InMemoryHost {
    async fn find_item(
        &self,
        name: &str,
        relative_to: &str,
        expected_kind: ItemKind,
    ) -> Option<JobInfo> {
        let item = resolve_item_path(name, relative_to)
            .into_iter()
            .find_map(|path| self.item(&path))?;

        if item.kind != expected_kind {
            debug!(
                full_name = %item.full_name,
                kind = ?item.kind,
                expected = ?expected_kind,
                "Item found but of the wrong kind"
            );
            return None;
        }
        Some(item)
    }

    async fn schedule(
        &self,
        job: &JobInfo,
        cause: Cause,
        attachments: Vec<ScheduleAttachment>,
    ) -> Option<QueueItemId> {
        if !self.scheduling_enabled.load(Ordering::Relaxed) {
            warn!(job = %job.full_name, "Scheduling is disabled, rejecting request");
            return None;
        }
        // Re-read the job: it may have been disabled since it was looked up.
        let current = self.item(&job.full_name)?;
        if !current.is_buildable() {
            warn!(job = %job.full_name, "Job is not buildable, rejecting request");
            return None;
        }

        let id = QueueItemId(self.next_item_id.fetch_add(1, Ordering::Relaxed));
        let item = QueueItem {
            id,
            task: current,
            cause,
            attachments,
            queued_at: Utc::now(),
        };
        debug!(queue_item_id = %id, job = %job.full_name, "Scheduled build");
        self.state.lock().queue.insert(id, item);
        Some(id)
    }

    fn subscribe(&self) -> broadcast::Receiver<HostEvent> {
        self.publisher.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EffectiveParameterSet, ParameterValue};

    fn upstream() -> Cause {
        Cause::upstream(RunReference::new("pipeline", 1))
    }

    #[tokio::test]
    async fn test_find_item_checks_kind() {
        let host = InMemoryHost::default();
        host.add_item(JobInfo::folder("team"));
        host.add_item(JobInfo::project("team/deploy"));

        assert!(host.find_item("deploy", "team", ItemKind::Project).await.is_some());
        assert!(host.find_item("team", "", ItemKind::Project).await.is_none());
        assert!(host.find_item("team", "", ItemKind::Folder).await.is_some());
        assert!(host.find_item("missing", "team", ItemKind::Project).await.is_none());
    }

    #[tokio::test]
    async fn test_schedule_rejections() {
        let host = InMemoryHost::default();
        let job = JobInfo::project("deploy");
        host.add_item(job.clone());
        host.add_item(JobInfo::project("frozen").disabled());

        host.set_scheduling_enabled(false);
        assert!(host.schedule(&job, upstream(), Vec::new()).await.is_none());
        host.set_scheduling_enabled(true);
        assert!(host.schedule(&job, upstream(), Vec::new()).await.is_some());

        let frozen = host.item("frozen").unwrap();
        assert!(host.schedule(&frozen, upstream(), Vec::new()).await.is_none());
        assert_eq!(host.queue_len(), 1);
    }

    #[tokio::test]
    async fn test_lifecycle_publishes_events_and_carries_attachments() {
        let host = InMemoryHost::default();
        let job = JobInfo::project("deploy");
        host.add_item(job.clone());
        let mut events = host.subscribe();

        let parameters: EffectiveParameterSet =
            vec![ParameterValue::new("version", "auto")].into_iter().collect();
        let attachments = vec![
            ScheduleAttachment::ReleaseMarker,
            ScheduleAttachment::Parameters { parameters },
        ];
        let id = host.schedule(&job, upstream(), attachments.clone()).await.unwrap();

        let run = host.start(id).unwrap();
        assert_eq!(run.reference, RunReference::new("deploy", 1));
        assert_eq!(run.attachments, attachments);
        assert_eq!(run.environment.get("version").map(String::as_str), Some("auto"));

        match events.recv().await.unwrap() {
            HostEvent::QueueItemLeft(left) => assert!(!left.is_cancelled()),
            other => panic!("unexpected event {other:?}"),
        }

        let completed = host.complete(&run.reference, RunResult::Success).unwrap();
        assert_eq!(completed.result, Some(RunResult::Success));
        assert!(host.complete(&run.reference, RunResult::Failure).is_none());

        match events.recv().await.unwrap() {
            HostEvent::RunCompleted(run) => assert_eq!(run.result, Some(RunResult::Success)),
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_cancel_only_once() {
        let host = InMemoryHost::default();
        let job = JobInfo::project("deploy");
        host.add_item(job.clone());
        let id = host.schedule(&job, upstream(), Vec::new()).await.unwrap();

        assert!(host.cancel(id));
        assert!(!host.cancel(id));
        assert!(host.start(id).is_none());
        assert_eq!(host.queue_len(), 0);
    }

    #[tokio::test]
    async fn test_build_numbers_per_job() {
        let host = InMemoryHost::default();
        let job = JobInfo::project("deploy");
        host.add_item(job.clone());
        for _ in 0..2 {
            host.schedule(&job, upstream(), Vec::new()).await.unwrap();
        }
        host.run_next("deploy", RunResult::Success).unwrap();
        host.run_next("deploy", RunResult::Failure).unwrap();

        let numbers: Vec<u64> = host
            .runs_of("deploy")
            .iter()
            .map(|run| run.reference.number)
            .collect();
        assert_eq!(numbers, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_configured_capacity_reaches_publisher() {
        let config = ReleaseConfig::default().with_event_channel_capacity(2);
        let host = InMemoryHost::from_config(&config);
        assert_eq!(host.publisher().capacity(), 2);

        let job = JobInfo::project("deploy");
        host.add_item(job.clone());
        let mut receiver = host.subscribe();
        for _ in 0..3 {
            let id = host.schedule(&job, upstream(), Vec::new()).await.unwrap();
            host.cancel(id);
        }

        assert!(matches!(
            receiver.recv().await,
            Err(broadcast::error::RecvError::Lagged(1))
        ));
    }
}
