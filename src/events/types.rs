use serde::{Deserialize, Serialize};

use crate::models::{LeftItem, RunRecord};

/// Notification delivered by the host's queue and run lifecycles
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum HostEvent {
    /// A queue item left the queue, by starting a run or by cancellation
    QueueItemLeft(LeftItem),
    /// A run reached a terminal result
    RunCompleted(RunRecord),
}

impl HostEvent {
    pub fn name(&self) -> &'static str {
        match self {
            HostEvent::QueueItemLeft(_) => "queue.item_left",
            HostEvent::RunCompleted(_) => "run.completed",
        }
    }
}
