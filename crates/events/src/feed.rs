//! Completion-feed listener.
//!
//! A single long-lived WebSocket subscription to a named completion
//! channel. Every inbound text frame is parsed as a
//! [`CompletionEvent`]; frames with `status == "completed"` mark the
//! corresponding correlation id in the [`CorrelationTracker`].
//!
//! The listener is deliberately forgiving: malformed frames are logged
//! and discarded, non-completion statuses are ignored, and ids that no
//! registration references are recorded anyway so a later registration
//! still observes them. A dropped connection triggers an
//! exponential-backoff reconnect; only cancellation stops the task.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::StreamExt;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;

use crate::bus::{EventBus, PipelineEvent};
use crate::reconnect::{next_delay, ReconnectConfig};
use crate::tracker::CorrelationTracker;

/// The only status token that marks a job completed.
pub const STATUS_COMPLETED: &str = "completed";

type WsStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

/// Connection settings for the completion feed.
#[derive(Debug, Clone)]
pub struct FeedConfig {
    /// WebSocket base URL, e.g. `ws://host:9100`.
    pub url: String,
    /// Name of the completion channel to subscribe to.
    pub channel: String,
}

/// Wire shape of one completion-feed event.
///
/// Anything that does not deserialize to this shape is malformed and
/// gets discarded by [`apply_frame`].
#[derive(Debug, serde::Deserialize)]
pub struct CompletionEvent {
    #[serde(rename = "correlationId")]
    pub correlation_id: String,
    pub status: String,
}

/// Errors from the feed subscription layer.
#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    /// Failed to establish the WebSocket connection.
    #[error("Connection error: {0}")]
    Connection(String),
}

/// Parse a feed text frame into a typed event.
pub fn parse_event(text: &str) -> Result<CompletionEvent, serde_json::Error> {
    serde_json::from_str(text)
}

/// Apply one inbound frame to the tracker.
///
/// Returns `true` when a completion was recorded. Malformed frames and
/// non-completion statuses return `false` and never propagate an error;
/// a bad message must not take the subscription down.
pub fn apply_frame(tracker: &CorrelationTracker, text: &str) -> bool {
    match parse_event(text) {
        Ok(event) if event.status == STATUS_COMPLETED => {
            tracing::debug!(
                correlation_id = %event.correlation_id,
                "Completion event received",
            );
            tracker.mark_completed(&event.correlation_id);
            true
        }
        Ok(event) => {
            tracing::debug!(
                correlation_id = %event.correlation_id,
                status = %event.status,
                "Feed event ignored (status not completed)",
            );
            false
        }
        Err(e) => {
            tracing::warn!(error = %e, raw_message = %text, "Discarding malformed feed event");
            false
        }
    }
}

/// Long-lived subscription to the completion feed.
///
/// Created once per process (or per deliberately shared tracker) and
/// started at most once; later [`start`](Self::start) calls are no-ops.
pub struct FeedListener {
    config: FeedConfig,
    tracker: Arc<CorrelationTracker>,
    bus: Arc<EventBus>,
    started: AtomicBool,
    cancel: CancellationToken,
}

impl FeedListener {
    pub fn new(config: FeedConfig, tracker: Arc<CorrelationTracker>, bus: Arc<EventBus>) -> Self {
        Self {
            config,
            tracker,
            bus,
            started: AtomicBool::new(false),
            cancel: CancellationToken::new(),
        }
    }

    /// The tracker this listener feeds completions into.
    pub fn tracker(&self) -> &Arc<CorrelationTracker> {
        &self.tracker
    }

    /// Spawn the subscription task.
    ///
    /// The first call spawns the long-lived task and returns `true`;
    /// every later call is a no-op returning `false`.
    pub fn start(self: &Arc<Self>) -> bool {
        if self.started.swap(true, Ordering::SeqCst) {
            tracing::debug!(channel = %self.config.channel, "Feed listener already started");
            return false;
        }

        let listener = Arc::clone(self);
        tokio::spawn(async move {
            tracing::info!(channel = %listener.config.channel, "Starting completion feed task");
            listener.run().await;
            tracing::info!(channel = %listener.config.channel, "Completion feed task exited");
        });
        true
    }

    /// Tear the subscription down. Only needed by owners that outlive
    /// their batch; normally the listener runs until process exit.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    // ---- private: connection lifecycle ----

    /// Connect → process frames → back off → reconnect, until cancelled.
    async fn run(&self) {
        let reconnect = ReconnectConfig::default();
        let mut delay = reconnect.initial_delay;

        loop {
            if self.cancel.is_cancelled() {
                return;
            }

            match self.connect().await {
                Ok(mut ws) => {
                    delay = reconnect.initial_delay;
                    self.bus.publish(PipelineEvent::FeedConnected {
                        timestamp: chrono::Utc::now(),
                    });

                    self.process_frames(&mut ws).await;

                    self.bus.publish(PipelineEvent::FeedDisconnected {
                        timestamp: chrono::Utc::now(),
                    });
                    if self.cancel.is_cancelled() {
                        return;
                    }
                    tracing::info!(
                        channel = %self.config.channel,
                        "Completion feed connection lost, reconnecting",
                    );
                }
                Err(e) => {
                    tracing::warn!(
                        channel = %self.config.channel,
                        error = %e,
                        "Feed connection failed",
                    );
                }
            }

            tokio::select! {
                _ = self.cancel.cancelled() => return,
                _ = tokio::time::sleep(delay) => {}
            }
            delay = next_delay(delay, &reconnect);
        }
    }

    /// Open the WebSocket subscription for this listener's channel.
    ///
    /// A fresh `clientId` (UUID v4) is appended so the feed service can
    /// address this subscriber.
    async fn connect(&self) -> Result<WsStream, FeedError> {
        let client_id = uuid::Uuid::new_v4().to_string();
        let url = format!(
            "{}/feed/{}?clientId={}",
            self.config.url, self.config.channel, client_id
        );

        let (ws, _response) = connect_async(&url).await.map_err(|e| {
            FeedError::Connection(format!(
                "Failed to connect to completion feed at {}: {e}",
                self.config.url
            ))
        })?;

        tracing::info!(
            channel = %self.config.channel,
            client_id = %client_id,
            "Subscribed to completion feed",
        );
        Ok(ws)
    }

    /// Consume frames in arrival order until the connection drops or
    /// the listener is cancelled.
    async fn process_frames(&self, ws: &mut WsStream) {
        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => return,
                frame = ws.next() => match frame {
                    Some(Ok(Message::Text(text))) => {
                        apply_frame(&self.tracker, &text);
                    }
                    Some(Ok(Message::Binary(_))) => {
                        tracing::trace!("Ignoring binary feed frame");
                    }
                    Some(Ok(Message::Ping(_) | Message::Pong(_))) => {
                        // Handled automatically by tungstenite.
                    }
                    Some(Ok(Message::Close(frame))) => {
                        tracing::info!(?frame, "Completion feed closed by server");
                        return;
                    }
                    Some(Ok(Message::Frame(_))) => {}
                    Some(Err(e)) => {
                        tracing::error!(error = %e, "Feed receive error");
                        return;
                    }
                    None => return,
                }
            }
        }
    }
}
