//! Builders for hosts and releases used across integration tests

use std::sync::Arc;

use release_trigger::config::{ReleaseConfig, UnknownParameterPolicy};
use release_trigger::host::InMemoryHost;
use async_trait::async_trait;
use release_trigger::events::HostEvent;
use release_trigger::host::HostFacade;
use release_trigger::models::{
    Cause, InvokingRun, ItemKind, JobInfo, ParameterDefinition, QueueItemId, RunReference,
    ScheduleAttachment,
};
use tokio::sync::broadcast;
use release_trigger::orchestration::{ListenerTask, ReleaseService};

/// Host with a `team` folder holding a `team/deploy` project and a `team/pipeline` caller
pub struct HostBuilder {
    items: Vec<JobInfo>,
    policy: UnknownParameterPolicy,
    event_channel_capacity: usize,
}

impl HostBuilder {
    pub fn new() -> Self {
        Self {
            items: vec![
                JobInfo::folder("team"),
                JobInfo::project("team/pipeline"),
                JobInfo::project("team/deploy")
                    .with_parameter(ParameterDefinition::with_default("version", "1.0"))
                    .with_parameter(ParameterDefinition::with_default("dryRun", "false")),
            ],
            policy: UnknownParameterPolicy::Reject,
            event_channel_capacity: ReleaseConfig::default().event_channel_capacity,
        }
    }

    pub fn with_item(mut self, item: JobInfo) -> Self {
        self.items.push(item);
        self
    }

    pub fn with_policy(mut self, policy: UnknownParameterPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_event_channel_capacity(mut self, capacity: usize) -> Self {
        self.event_channel_capacity = capacity;
        self
    }

    pub fn build(self) -> Harness {
        let config = ReleaseConfig::default()
            .with_unknown_parameter_policy(self.policy)
            .with_event_channel_capacity(self.event_channel_capacity);
        let host = Arc::new(InMemoryHost::from_config(&config));
        for item in self.items {
            host.add_item(item);
        }
        let service = Arc::new(ReleaseService::new(host.clone(), config));
        let listeners = service.spawn_listeners();
        Harness {
            host,
            service,
            listeners,
        }
    }
}

pub struct Harness {
    pub host: Arc<InMemoryHost>,
    pub service: Arc<ReleaseService>,
    pub listeners: ListenerTask,
}

impl Harness {
    pub fn invoking_run(&self) -> InvokingRun {
        InvokingRun::new(RunReference::new("team/pipeline", 12))
    }
}

/// Host whose scheduling never completes, as when a remote host stops answering
pub struct StalledHost {
    pub inner: InMemoryHost,
}

#[async_trait]
impl HostFacade for StalledHost {
    async fn find_item(
        &self,
        name: &str,
        relative_to: &str,
        expected_kind: ItemKind,
    ) -> Option<JobInfo> {
        self.inner.find_item(name, relative_to, expected_kind).await
    }

    async fn schedule(
        &self,
        _job: &JobInfo,
        _cause: Cause,
        _attachments: Vec<ScheduleAttachment>,
    ) -> Option<QueueItemId> {
        tokio::time::sleep(std::time::Duration::from_secs(3600)).await;
        None
    }

    fn subscribe(&self) -> broadcast::Receiver<HostEvent> {
        self.inner.subscribe()
    }
}
