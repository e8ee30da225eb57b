//! Queue items and what a scheduling request carries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::job::JobInfo;
use super::parameter::EffectiveParameterSet;
use super::run::RunReference;
use crate::registry::CorrelationToken;

/// Host-assigned identifier of a queue item
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct QueueItemId(pub u64);

impl fmt::Display for QueueItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "queue-item-{}", self.0)
    }
}

/// Why a build was scheduled
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Cause {
    /// Started by another run
    Upstream { run: RunReference },
    /// Started by a user
    User { user_id: String },
}

impl Cause {
    pub fn upstream(run: RunReference) -> Self {
        Self::Upstream { run }
    }

    pub fn short_description(&self) -> String {
        match self {
            Self::Upstream { run } => format!("Started by upstream project {run}"),
            Self::User { user_id } => format!("Started by user {user_id}"),
        }
    }
}

/// Metadata attached to a scheduling request; the host copies it onto the
/// resulting run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScheduleAttachment {
    Parameters { parameters: EffectiveParameterSet },
    Correlation { token: CorrelationToken },
    /// Marks the build as triggered by a release
    ReleaseMarker,
}

/// Anything that carries schedule attachments: a queue item or the run it became
pub trait CorrelatedWork {
    fn attachments(&self) -> &[ScheduleAttachment];

    /// Label used in logs
    fn work_label(&self) -> String;

    fn correlation_tokens(&self) -> Vec<CorrelationToken> {
        self.attachments()
            .iter()
            .filter_map(|a| match a {
                ScheduleAttachment::Correlation { token } => Some(*token),
                _ => None,
            })
            .collect()
    }

    fn parameters(&self) -> Option<&EffectiveParameterSet> {
        self.attachments().iter().find_map(|a| match a {
            ScheduleAttachment::Parameters { parameters } => Some(parameters),
            _ => None,
        })
    }

    fn is_release_triggered(&self) -> bool {
        self.attachments()
            .iter()
            .any(|a| matches!(a, ScheduleAttachment::ReleaseMarker))
    }
}

/// A pending request to run a job, not yet bound to an executor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueItem {
    pub id: QueueItemId,
    pub task: JobInfo,
    pub cause: Cause,
    pub attachments: Vec<ScheduleAttachment>,
    pub queued_at: DateTime<Utc>,
}

impl CorrelatedWork for QueueItem {
    fn attachments(&self) -> &[ScheduleAttachment] {
        &self.attachments
    }

    fn work_label(&self) -> String {
        format!("{} ({})", self.id, self.task.full_name)
    }
}

/// A queue item that has left the queue, either to start running or cancelled
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeftItem {
    pub item: QueueItem,
    pub cancelled: bool,
    pub left_at: DateTime<Utc>,
}

impl LeftItem {
    pub fn cancelled(item: QueueItem) -> Self {
        Self {
            item,
            cancelled: true,
            left_at: Utc::now(),
        }
    }

    pub fn started(item: QueueItem) -> Self {
        Self {
            item,
            cancelled: false,
            left_at: Utc::now(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }
}

impl CorrelatedWork for LeftItem {
    fn attachments(&self) -> &[ScheduleAttachment] {
        &self.item.attachments
    }

    fn work_label(&self) -> String {
        self.item.work_label()
    }
}
