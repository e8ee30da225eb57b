//! # Host Facade
//!
//! The boundary to the job host that owns items, the build queue and run records.
//! Release steps receive the host explicitly instead of reaching for a global
//! instance; [`memory::InMemoryHost`] is a complete in-process implementation.

pub mod memory;

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::events::HostEvent;
use crate::models::{Cause, ItemKind, JobInfo, QueueItemId, ScheduleAttachment};

pub use memory::InMemoryHost;

/// Primitives the release protocol consumes from the job host
#[async_trait]
pub trait HostFacade: Send + Sync {
    /// Resolve `name` relative to the container `relative_to`.
    ///
    /// Returns `None` when nothing is found or the item is not of `expected_kind`.
    async fn find_item(
        &self,
        name: &str,
        relative_to: &str,
        expected_kind: ItemKind,
    ) -> Option<JobInfo>;

    /// Submit a build request. `None` means the host rejected it immediately.
    async fn schedule(
        &self,
        job: &JobInfo,
        cause: Cause,
        attachments: Vec<ScheduleAttachment>,
    ) -> Option<QueueItemId>;

    /// Subscribe to queue-left and run-completed events for all items and runs
    fn subscribe(&self) -> broadcast::Receiver<HostEvent>;
}

/// Candidate full names for `name` looked up from `relative_to`, in lookup order.
///
/// A leading `/` makes the name absolute. Otherwise the name is resolved
/// against the container first (`..` walks up, `.` stays), then from the root.
/// Candidates that walk above the root are dropped.
pub fn resolve_item_path(name: &str, relative_to: &str) -> Vec<String> {
    let name = name.trim();
    if name.is_empty() {
        return Vec::new();
    }

    if let Some(absolute) = name.strip_prefix('/') {
        return normalize_path(absolute).into_iter().collect();
    }

    let mut candidates = Vec::with_capacity(2);
    let relative_to = relative_to.trim_matches('/');
    if !relative_to.is_empty() {
        if let Some(path) = normalize_path(&format!("{relative_to}/{name}")) {
            candidates.push(path);
        }
    }
    if let Some(path) = normalize_path(name) {
        if !candidates.contains(&path) {
            candidates.push(path);
        }
    }
    candidates
}

fn normalize_path(path: &str) -> Option<String> {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop()?;
            }
            other => segments.push(other),
        }
    }
    if segments.is_empty() {
        None
    } else {
        Some(segments.join("/"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_resolution_prefers_container() {
        assert_eq!(
            resolve_item_path("deploy", "team"),
            vec!["team/deploy".to_string(), "deploy".to_string()]
        );
    }

    #[test]
    fn test_top_level_container() {
        assert_eq!(resolve_item_path("deploy", ""), vec!["deploy".to_string()]);
    }

    #[test]
    fn test_absolute_and_parent_segments() {
        assert_eq!(
            resolve_item_path("/other/deploy", "team"),
            vec!["other/deploy".to_string()]
        );
        assert_eq!(
            resolve_item_path("../shared/deploy", "team/app"),
            vec!["team/shared/deploy".to_string()]
        );
        assert_eq!(
            resolve_item_path("./deploy", "team"),
            vec!["team/deploy".to_string(), "deploy".to_string()]
        );
    }

    #[test]
    fn test_walking_above_root_yields_nothing() {
        assert!(resolve_item_path("../../deploy", "team").is_empty());
        assert!(resolve_item_path("   ", "team").is_empty());
        assert!(resolve_item_path("/", "").is_empty());
    }
}
