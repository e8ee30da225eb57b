use tokio::sync::broadcast;
use tracing::trace;

use super::types::HostEvent;

/// Default number of buffered events per subscriber
pub const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 1024;

/// Broadcasts host lifecycle events to every subscriber
#[derive(Debug, Clone)]
pub struct HostEventPublisher {
    sender: broadcast::Sender<HostEvent>,
    capacity: usize,
}

impl HostEventPublisher {
    /// Publisher buffering up to `capacity` events per subscriber
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (sender, _) = broadcast::channel(capacity);
        Self { sender, capacity }
    }

    /// Events a subscriber may fall behind by before it lags
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Publish an event.
    ///
    /// Returns the number of subscribers that received it. Publishing with no
    /// subscribers is not an error: unrelated hosts run without release listeners.
    pub fn publish(&self, event: HostEvent) -> usize {
        let name = event.name();
        match self.sender.send(event) {
            Ok(receivers) => receivers,
            Err(broadcast::error::SendError(_)) => {
                trace!(event = name, "No subscribers for host event");
                0
            }
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<HostEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for HostEventPublisher {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CHANNEL_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Cause, JobInfo, LeftItem, QueueItem, QueueItemId, RunReference};

    fn left() -> HostEvent {
        HostEvent::QueueItemLeft(LeftItem::cancelled(QueueItem {
            id: QueueItemId(1),
            task: JobInfo::project("deploy"),
            cause: Cause::upstream(RunReference::new("pipeline", 1)),
            attachments: Vec::new(),
            queued_at: chrono::Utc::now(),
        }))
    }

    #[test]
    fn test_publish_without_subscribers() {
        let publisher = HostEventPublisher::default();
        assert_eq!(publisher.subscriber_count(), 0);
        assert_eq!(publisher.publish(left()), 0);
    }

    #[test]
    fn test_capacity_is_at_least_one() {
        assert_eq!(HostEventPublisher::new(0).capacity(), 1);
        assert_eq!(HostEventPublisher::new(64).capacity(), 64);
        assert_eq!(
            HostEventPublisher::default().capacity(),
            DEFAULT_EVENT_CHANNEL_CAPACITY
        );
    }

    #[tokio::test]
    async fn test_publish_reaches_subscribers() {
        let publisher = HostEventPublisher::new(8);
        let mut first = publisher.subscribe();
        let mut second = publisher.subscribe();

        assert_eq!(publisher.publish(left()), 2);
        assert_eq!(first.recv().await.unwrap().name(), "queue.item_left");
        assert_eq!(second.recv().await.unwrap().name(), "queue.item_left");
    }
}
