//! Batch orchestration: submit, wait, concatenate.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clipcast_core::ffmpeg::concat_clips;
use clipcast_core::types::CorrelationId;
use clipcast_events::bus::{EventBus, PipelineEvent};
use clipcast_events::feed::FeedListener;
use clipcast_video::client::{RenderClient, RenderError};
use clipcast_video::completion::wait_via_feed;
use clipcast_video::poller::{poll_batch, PollConfig, PollObserver};
use clipcast_video::spec::RenderSpec;

use crate::error::PipelineError;

/// How a batch learns about completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionStrategy {
    /// Bounded status polling per job.
    Poll,
    /// Push-based completion feed, with explicit retrieval afterwards.
    Feed,
}

/// Drives one render batch from specs to a concatenated output file.
pub struct VideoManager {
    render: RenderClient,
    listener: Arc<FeedListener>,
    bus: Arc<EventBus>,
    poll: PollConfig,
}

/// Poll observer that logs per-clip outcomes and mirrors them onto the
/// event bus.
struct BusObserver<'a> {
    bus: &'a EventBus,
    correlation_ids: &'a [CorrelationId],
}

impl PollObserver for BusObserver<'_> {
    fn on_progress(&mut self, index: usize, attempt: u32, progress: f64) {
        tracing::debug!(index, attempt, progress, "Clip render progress");
        self.bus.publish(PipelineEvent::ClipProgress {
            index,
            correlation_id: self.correlation_ids[index].clone(),
            percent: progress,
        });
    }

    fn on_success(&mut self, index: usize, path: &Path) {
        tracing::info!(index, path = %path.display(), "Clip completed");
        self.bus.publish(PipelineEvent::ClipCompleted {
            index,
            correlation_id: self.correlation_ids[index].clone(),
            output_path: path.to_string_lossy().to_string(),
        });
    }

    fn on_error(&mut self, index: usize, error: &RenderError) {
        tracing::error!(index, error = %error, "Clip failed");
        self.bus.publish(PipelineEvent::ClipFailed {
            index,
            correlation_id: self.correlation_ids[index].clone(),
            error: error.to_string(),
        });
    }
}

impl VideoManager {
    pub fn new(
        render: RenderClient,
        listener: Arc<FeedListener>,
        bus: Arc<EventBus>,
        poll: PollConfig,
    ) -> Self {
        Self {
            render,
            listener,
            bus,
            poll,
        }
    }

    /// Observers subscribe here for per-clip progress events.
    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    /// Submit every spec and wait for the rendered clips to land on
    /// disk, using the chosen completion strategy.
    ///
    /// Returns the ordered clip output paths. Per-clip polling hiccups
    /// are reported through the bus, not here; a clip that never
    /// finishes simply leaves no file, which the concat step treats as
    /// fatal.
    pub async fn collect_clips(
        &self,
        specs: &[RenderSpec],
        strategy: CompletionStrategy,
    ) -> Result<Vec<PathBuf>, PipelineError> {
        tracing::info!(count = specs.len(), ?strategy, "Requesting clip renders");
        let correlation_ids = self.render.submit_all(specs).await?;

        for (index, correlation_id) in correlation_ids.iter().enumerate() {
            self.bus.publish(PipelineEvent::ClipSubmitted {
                index,
                correlation_id: correlation_id.clone(),
            });
        }

        let outputs: Vec<PathBuf> = specs.iter().map(|s| s.output_path.clone()).collect();

        match strategy {
            CompletionStrategy::Poll => {
                let mut observer = BusObserver {
                    bus: self.bus.as_ref(),
                    correlation_ids: &correlation_ids,
                };
                poll_batch(&self.render, &correlation_ids, &outputs, &self.poll, &mut observer)
                    .await?;
            }
            CompletionStrategy::Feed => {
                wait_via_feed(&self.render, &self.listener, &correlation_ids, &outputs).await?;
                for (index, (correlation_id, output)) in
                    correlation_ids.iter().zip(&outputs).enumerate()
                {
                    self.bus.publish(PipelineEvent::ClipCompleted {
                        index,
                        correlation_id: correlation_id.clone(),
                        output_path: output.to_string_lossy().to_string(),
                    });
                }
            }
        }

        Ok(outputs)
    }

    /// Full batch run: render every clip, then concatenate them into
    /// `final_output`.
    ///
    /// Any structural failure aborts the run; clip files already
    /// written stay on disk for inspection or manual assembly.
    pub async fn process(
        &self,
        specs: &[RenderSpec],
        final_output: &Path,
        strategy: CompletionStrategy,
    ) -> Result<(), PipelineError> {
        let outputs = self.collect_clips(specs, strategy).await?;

        tracing::info!(final_output = %final_output.display(), "Concatenating clips");
        concat_clips(&outputs, final_output).await?;

        tracing::info!(final_output = %final_output.display(), "Pipeline run complete");
        Ok(())
    }
}
