//! Run records and their terminal results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::queue::{Cause, CorrelatedWork, QueueItemId, ScheduleAttachment};

/// Terminal result of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunResult {
    Success,
    Unstable,
    Failure,
    NotBuilt,
    Aborted,
}

impl RunResult {
    /// Only a clean success resolves the caller successfully
    pub fn is_success(self) -> bool {
        self == RunResult::Success
    }
}

impl fmt::Display for RunResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RunResult::Success => "SUCCESS",
            RunResult::Unstable => "UNSTABLE",
            RunResult::Failure => "FAILURE",
            RunResult::NotBuilt => "NOT_BUILT",
            RunResult::Aborted => "ABORTED",
        };
        f.write_str(label)
    }
}

/// Stable reference to a run: job full name plus build number
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RunReference {
    pub job_full_name: String,
    pub number: u64,
}

impl RunReference {
    pub fn new(job_full_name: impl Into<String>, number: u64) -> Self {
        Self {
            job_full_name: job_full_name.into(),
            number,
        }
    }
}

impl fmt::Display for RunReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} #{}", self.job_full_name, self.number)
    }
}

/// The run executing the release step, and the folder its job lives in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvokingRun {
    pub run: RunReference,
    /// Container job names are resolved against
    pub parent: String,
}

impl InvokingRun {
    /// Derives the container from the run's job path
    pub fn new(run: RunReference) -> Self {
        let parent = match run.job_full_name.rfind('/') {
            Some(idx) => run.job_full_name[..idx].to_string(),
            None => String::new(),
        };
        Self { run, parent }
    }
}

/// Execution record of a job; persists after completion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub reference: RunReference,
    pub display_name: String,
    pub queue_item_id: QueueItemId,
    pub cause: Cause,
    /// Carried over from the originating queue item
    pub attachments: Vec<ScheduleAttachment>,
    pub environment: BTreeMap<String, String>,
    pub result: Option<RunResult>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl RunRecord {
    pub fn is_complete(&self) -> bool {
        self.result.is_some()
    }
}

impl CorrelatedWork for RunRecord {
    fn attachments(&self) -> &[ScheduleAttachment] {
        &self.attachments
    }

    fn work_label(&self) -> String {
        self.reference.to_string()
    }
}

/// What a successful release delivers to the caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseOutcome {
    pub job_name: String,
    pub run: RunReference,
    pub result: RunResult,
}
