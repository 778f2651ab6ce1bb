//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`EventBus`] fans [`PipelineEvent`]s out to any number of observers
//! (progress reporters, log sinks). Publishing is lossy by design: an
//! event with no subscribers is dropped, and slow subscribers observe
//! `RecvError::Lagged` when the buffer wraps.

use clipcast_core::types::{CorrelationId, Timestamp};
use serde::Serialize;
use tokio::sync::broadcast;

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 256;

/// A state change in a pipeline run that observers may care about.
#[derive(Debug, Clone, Serialize)]
pub enum PipelineEvent {
    /// A render job was accepted by the remote service.
    ClipSubmitted {
        index: usize,
        correlation_id: CorrelationId,
    },

    /// A still-running render job reported progress (0–100).
    ClipProgress {
        index: usize,
        correlation_id: CorrelationId,
        percent: f64,
    },

    /// A rendered clip was retrieved and written to disk.
    ClipCompleted {
        index: usize,
        correlation_id: CorrelationId,
        output_path: String,
    },

    /// A render job failed terminally (submission, polling, or timeout).
    ClipFailed {
        index: usize,
        correlation_id: CorrelationId,
        error: String,
    },

    /// The completion-feed subscription was established.
    FeedConnected { timestamp: Timestamp },

    /// The completion-feed subscription dropped (a reconnect follows
    /// unless the listener was cancelled).
    FeedDisconnected { timestamp: Timestamp },
}

/// In-process fan-out event bus.
pub struct EventBus {
    sender: broadcast::Sender<PipelineEvent>,
}

impl EventBus {
    /// Create a bus with a specific channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers.
    ///
    /// If there are no active subscribers the event is silently dropped.
    pub fn publish(&self, event: PipelineEvent) {
        // Ignore the SendError — it only means there are zero receivers.
        let _ = self.sender.send(event);
    }

    /// Subscribe to all events published on this bus.
    pub fn subscribe(&self) -> broadcast::Receiver<PipelineEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[tokio::test]
    async fn publish_and_receive_single_subscriber() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();

        bus.publish(PipelineEvent::ClipCompleted {
            index: 2,
            correlation_id: "job-3".into(),
            output_path: "/tmp/clip-3.mp4".into(),
        });

        let received = rx.recv().await.expect("should receive the event");
        assert_matches!(
            received,
            PipelineEvent::ClipCompleted { index: 2, .. }
        );
    }

    #[tokio::test]
    async fn multiple_subscribers_receive_same_event() {
        let bus = EventBus::default();
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        bus.publish(PipelineEvent::ClipSubmitted {
            index: 0,
            correlation_id: "job-1".into(),
        });

        assert_matches!(
            rx1.recv().await.unwrap(),
            PipelineEvent::ClipSubmitted { index: 0, .. }
        );
        assert_matches!(
            rx2.recv().await.unwrap(),
            PipelineEvent::ClipSubmitted { index: 0, .. }
        );
    }

    #[test]
    fn publish_with_no_subscribers_does_not_panic() {
        let bus = EventBus::default();
        bus.publish(PipelineEvent::FeedConnected {
            timestamp: chrono::Utc::now(),
        });
    }
}
