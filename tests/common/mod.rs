//! Shared helpers for release integration tests

#![allow(dead_code)]

pub mod builders;
pub mod strategies;

pub use builders::*;

use std::time::Duration;

use release_trigger::host::InMemoryHost;
use release_trigger::models::QueueItem;

/// Poll until the host has at least `count` queued items
pub async fn wait_for_queued(host: &InMemoryHost, count: usize) -> Vec<QueueItem> {
    for _ in 0..200 {
        let items = host.queued_items();
        if items.len() >= count {
            return items;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("expected {count} queued items, found {}", host.queue_len());
}

/// Give the router task a chance to drain pending events
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(20)).await;
}
