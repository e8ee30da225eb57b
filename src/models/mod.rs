//! # Models
//!
//! Data carried across the host boundary: jobs and their parameter definitions,
//! queue items with their schedule attachments, and run records.

pub mod job;
pub mod parameter;
pub mod queue;
pub mod run;

pub use job::{ItemKind, JobInfo};
pub use parameter::{EffectiveParameterSet, ParameterDefinition, ParameterValue};
pub use queue::{Cause, CorrelatedWork, LeftItem, QueueItem, QueueItemId, ScheduleAttachment};
pub use run::{InvokingRun, ReleaseOutcome, RunRecord, RunReference, RunResult};
