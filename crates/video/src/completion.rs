//! Feed-based completion waiting.
//!
//! The completion feed only signals that a job finished — it never
//! carries the artifact. This module waits on the tracker for the full
//! id set, then explicitly retrieves every artifact in positional
//! order.

use std::path::PathBuf;
use std::sync::Arc;

use clipcast_core::types::CorrelationId;
use clipcast_events::feed::FeedListener;

use crate::client::{RenderBackend, RenderError, RenderStatus};

/// Wait for the whole batch via the completion feed, then download.
///
/// Starts the listener if it is not already running (a started listener
/// ignores the call). The wait itself has no timeout — callers wanting
/// a deadline race this future. Retrieval failures abort with the
/// offending job's error; earlier artifacts stay on disk.
pub async fn wait_via_feed(
    backend: &dyn RenderBackend,
    listener: &Arc<FeedListener>,
    correlation_ids: &[CorrelationId],
    outputs: &[PathBuf],
) -> Result<(), RenderError> {
    if correlation_ids.len() != outputs.len() {
        return Err(RenderError::BatchMismatch {
            ids: correlation_ids.len(),
            outputs: outputs.len(),
        });
    }

    listener.start();

    tracing::debug!(count = correlation_ids.len(), "Waiting on completion feed");
    listener.tracker().wait_for_all(correlation_ids).await;
    tracing::info!(count = correlation_ids.len(), "All completions received via feed");

    for (correlation_id, output) in correlation_ids.iter().zip(outputs) {
        match backend.fetch_status(correlation_id).await? {
            RenderStatus::Ready(bytes) => {
                tokio::fs::write(output, &bytes).await?;
                tracing::info!(
                    correlation_id = %correlation_id,
                    output = %output.display(),
                    "Rendered clip written",
                );
            }
            RenderStatus::InProgress { .. } => {
                // The feed said completed but the service disagrees;
                // surface it rather than writing a progress body.
                return Err(RenderError::NotReady {
                    correlation_id: correlation_id.clone(),
                });
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;
    use clipcast_events::bus::EventBus;
    use clipcast_events::feed::{apply_frame, FeedConfig};
    use clipcast_events::tracker::CorrelationTracker;

    struct ReadyBackend;

    #[async_trait]
    impl RenderBackend for ReadyBackend {
        async fn fetch_status(&self, correlation_id: &str) -> Result<RenderStatus, RenderError> {
            Ok(RenderStatus::Ready(correlation_id.as_bytes().to_vec()))
        }
    }

    struct BusyBackend;

    #[async_trait]
    impl RenderBackend for BusyBackend {
        async fn fetch_status(&self, _correlation_id: &str) -> Result<RenderStatus, RenderError> {
            Ok(RenderStatus::InProgress { progress: 50.0 })
        }
    }

    fn test_listener() -> Arc<FeedListener> {
        Arc::new(FeedListener::new(
            FeedConfig {
                url: "ws://127.0.0.1:1".into(),
                channel: "video-completions".into(),
            },
            Arc::new(CorrelationTracker::new()),
            Arc::new(EventBus::default()),
        ))
    }

    fn ids(list: &[&str]) -> Vec<CorrelationId> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn waits_for_feed_then_retrieves_in_order() {
        let listener = test_listener();
        let dir = std::env::temp_dir().join(format!("clipcast-feed-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let outputs = vec![dir.join("a.mp4"), dir.join("b.mp4")];

        // Deliver completion events as the feed would, out of batch order.
        let tracker = Arc::clone(listener.tracker());
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            apply_frame(&tracker, r#"{"correlationId":"j2","status":"completed"}"#);
            apply_frame(&tracker, r#"{"correlationId":"j1","status":"completed"}"#);
        });

        wait_via_feed(&ReadyBackend, &listener, &ids(&["j1", "j2"]), &outputs)
            .await
            .unwrap();

        assert_eq!(std::fs::read(&outputs[0]).unwrap(), b"j1");
        assert_eq!(std::fs::read(&outputs[1]).unwrap(), b"j2");

        listener.shutdown();
        std::fs::remove_dir_all(dir).ok();
    }

    #[tokio::test]
    async fn mismatched_batch_is_rejected_before_waiting() {
        let listener = test_listener();
        let result = wait_via_feed(
            &ReadyBackend,
            &listener,
            &ids(&["j1", "j2"]),
            &[PathBuf::from("/tmp/only-one.mp4")],
        )
        .await;

        assert!(matches!(
            result,
            Err(RenderError::BatchMismatch { ids: 2, outputs: 1 })
        ));
        listener.shutdown();
    }

    #[tokio::test]
    async fn disagreeing_service_surfaces_not_ready() {
        let listener = test_listener();
        listener.tracker().mark_completed("j1");

        let result = wait_via_feed(
            &BusyBackend,
            &listener,
            &ids(&["j1"]),
            &[PathBuf::from("/tmp/never-written.mp4")],
        )
        .await;

        assert!(matches!(result, Err(RenderError::NotReady { .. })));
        listener.shutdown();
    }
}
