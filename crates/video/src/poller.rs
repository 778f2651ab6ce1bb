//! Bounded-round batch polling for outstanding render jobs.
//!
//! Each round visits every still-incomplete index in batch order,
//! issuing one status query per index. Per-index outcomes are isolated:
//! a query failure or slow job never stalls its siblings, and the round
//! sleep is shared, not per-index. After the attempt budget is spent,
//! every residual index gets exactly one timeout callback and the call
//! returns normally — partial batch failure is the observer's news to
//! deliver, not an exception.

use std::path::{Path, PathBuf};
use std::time::Duration;

use clipcast_core::types::CorrelationId;

use crate::client::{RenderBackend, RenderError, RenderStatus};

/// Tuning for [`poll_batch`].
#[derive(Debug, Clone)]
pub struct PollConfig {
    /// Polling rounds before residual jobs are declared timed out.
    pub max_attempts: u32,
    /// Shared pause between rounds.
    pub delay: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            max_attempts: 12 * 15,
            delay: Duration::from_secs(5),
        }
    }
}

/// Per-index progress/outcome callbacks for a polling run.
///
/// All methods default to no-ops; observers implement what they need.
pub trait PollObserver: Send {
    /// A still-rendering job reported progress (0–100).
    fn on_progress(&mut self, index: usize, attempt: u32, progress: f64) {
        let _ = (index, attempt, progress);
    }

    /// A job finished and its artifact was written to `path`.
    fn on_success(&mut self, index: usize, path: &Path) {
        let _ = (index, path);
    }

    /// A status query failed, or the job timed out after the final
    /// round. Query failures leave the index eligible for the next
    /// round; [`RenderError::Timeout`] is terminal.
    fn on_error(&mut self, index: usize, error: &RenderError) {
        let _ = (index, error);
    }
}

/// Observer that ignores every callback.
pub struct NoopObserver;

impl PollObserver for NoopObserver {}

/// Poll a batch of render jobs until every artifact is retrieved or the
/// attempt budget runs out.
///
/// `correlation_ids` and `outputs` correspond positionally; a length
/// mismatch is a structural error raised before any network activity.
/// Successfully retrieved artifacts are written to their output path as
/// soon as they are ready, in the middle of the run.
pub async fn poll_batch(
    backend: &dyn RenderBackend,
    correlation_ids: &[CorrelationId],
    outputs: &[PathBuf],
    config: &PollConfig,
    observer: &mut dyn PollObserver,
) -> Result<(), RenderError> {
    if correlation_ids.len() != outputs.len() {
        return Err(RenderError::BatchMismatch {
            ids: correlation_ids.len(),
            outputs: outputs.len(),
        });
    }

    let mut completed = vec![false; correlation_ids.len()];

    for attempt in 0..config.max_attempts {
        tracing::debug!(
            attempt = attempt + 1,
            max_attempts = config.max_attempts,
            "Polling render batch",
        );

        let mut all_completed = true;
        for index in 0..correlation_ids.len() {
            if completed[index] {
                continue;
            }

            match backend.fetch_status(&correlation_ids[index]).await {
                Ok(RenderStatus::Ready(bytes)) => {
                    match tokio::fs::write(&outputs[index], &bytes).await {
                        Ok(()) => {
                            tracing::info!(
                                index,
                                correlation_id = %correlation_ids[index],
                                output = %outputs[index].display(),
                                "Rendered clip retrieved",
                            );
                            observer.on_success(index, &outputs[index]);
                            completed[index] = true;
                        }
                        Err(e) => {
                            // The artifact write failed; the job itself
                            // is fine, so retry the index next round.
                            let error = RenderError::Io(e);
                            tracing::warn!(index, error = %error, "Failed to write clip");
                            observer.on_error(index, &error);
                            all_completed = false;
                        }
                    }
                }
                Ok(RenderStatus::InProgress { progress }) => {
                    observer.on_progress(index, attempt, progress);
                    all_completed = false;
                }
                Err(e) => {
                    tracing::warn!(
                        index,
                        correlation_id = %correlation_ids[index],
                        error = %e,
                        "Status query failed",
                    );
                    observer.on_error(index, &e);
                    all_completed = false;
                }
            }
        }

        if all_completed {
            tracing::info!(count = correlation_ids.len(), "Render batch fully retrieved");
            return Ok(());
        }

        tokio::time::sleep(config.delay).await;
    }

    // Attempt budget exhausted: one terminal timeout per residual index.
    for (index, done) in completed.iter().enumerate() {
        if !done {
            tracing::error!(
                index,
                correlation_id = %correlation_ids[index],
                "Polling timed out",
            );
            observer.on_error(index, &RenderError::Timeout);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;

    /// One scripted status answer.
    enum Step {
        Ready(Vec<u8>),
        Progress(f64),
        Fail,
    }

    /// Backend whose per-id answer sequence sticks on its last step.
    struct ScriptedBackend {
        scripts: HashMap<String, Vec<Step>>,
        positions: Mutex<HashMap<String, usize>>,
        queries: AtomicU32,
    }

    impl ScriptedBackend {
        fn new(scripts: Vec<(&str, Vec<Step>)>) -> Self {
            Self {
                scripts: scripts
                    .into_iter()
                    .map(|(id, steps)| (id.to_string(), steps))
                    .collect(),
                positions: Mutex::new(HashMap::new()),
                queries: AtomicU32::new(0),
            }
        }

        fn query_count(&self) -> u32 {
            self.queries.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl RenderBackend for ScriptedBackend {
        async fn fetch_status(&self, correlation_id: &str) -> Result<RenderStatus, RenderError> {
            self.queries.fetch_add(1, Ordering::SeqCst);
            let steps = &self.scripts[correlation_id];
            let mut positions = self.positions.lock().unwrap();
            let pos = positions.entry(correlation_id.to_string()).or_insert(0);
            let step = &steps[(*pos).min(steps.len() - 1)];
            *pos += 1;
            match step {
                Step::Ready(bytes) => Ok(RenderStatus::Ready(bytes.clone())),
                Step::Progress(pct) => Ok(RenderStatus::InProgress { progress: *pct }),
                Step::Fail => Err(RenderError::Status {
                    status: 500,
                    body: "scripted failure".into(),
                }),
            }
        }
    }

    /// Observer that records every callback for assertions.
    #[derive(Default)]
    struct Recording {
        progress: Vec<(usize, u32, f64)>,
        successes: Vec<usize>,
        query_errors: Vec<usize>,
        timeouts: Vec<usize>,
    }

    impl PollObserver for Recording {
        fn on_progress(&mut self, index: usize, attempt: u32, progress: f64) {
            self.progress.push((index, attempt, progress));
        }
        fn on_success(&mut self, index: usize, _path: &Path) {
            self.successes.push(index);
        }
        fn on_error(&mut self, index: usize, error: &RenderError) {
            match error {
                RenderError::Timeout => self.timeouts.push(index),
                _ => self.query_errors.push(index),
            }
        }
    }

    fn fast_config(max_attempts: u32) -> PollConfig {
        PollConfig {
            max_attempts,
            delay: Duration::from_millis(1),
        }
    }

    fn temp_outputs(n: usize) -> (PathBuf, Vec<PathBuf>) {
        let dir = std::env::temp_dir().join(format!("clipcast-poll-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let outputs = (0..n).map(|i| dir.join(format!("clip-{i}.mp4"))).collect();
        (dir, outputs)
    }

    fn ids(list: &[&str]) -> Vec<CorrelationId> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn batch_mismatch_precedes_any_query() {
        let backend = ScriptedBackend::new(vec![("j1", vec![Step::Ready(vec![1])])]);
        let (dir, outputs) = temp_outputs(3);

        let result = poll_batch(
            &backend,
            &ids(&["j1", "j2"]),
            &outputs,
            &fast_config(5),
            &mut NoopObserver,
        )
        .await;

        assert!(matches!(
            result,
            Err(RenderError::BatchMismatch { ids: 2, outputs: 3 })
        ));
        assert_eq!(backend.query_count(), 0);
        std::fs::remove_dir_all(dir).ok();
    }

    #[tokio::test]
    async fn mixed_progress_round_then_early_drain() {
        // Round 1: j1 at 40%, j2 ready. Round 2: j1 ready. The run
        // returns long before the attempt budget.
        let backend = ScriptedBackend::new(vec![
            ("j1", vec![Step::Progress(40.0), Step::Ready(vec![0xA])]),
            ("j2", vec![Step::Ready(vec![0xB])]),
        ]);
        let (dir, outputs) = temp_outputs(2);
        let mut observer = Recording::default();

        poll_batch(
            &backend,
            &ids(&["j1", "j2"]),
            &outputs,
            &fast_config(100),
            &mut observer,
        )
        .await
        .unwrap();

        assert_eq!(observer.progress, vec![(0, 0, 40.0)]);
        assert_eq!(observer.successes, vec![1, 0]);
        assert!(observer.timeouts.is_empty());
        // j1 twice, j2 once — nothing close to 100 rounds.
        assert_eq!(backend.query_count(), 3);

        assert_eq!(std::fs::read(&outputs[0]).unwrap(), vec![0xA]);
        assert_eq!(std::fs::read(&outputs[1]).unwrap(), vec![0xB]);
        std::fs::remove_dir_all(dir).ok();
    }

    #[tokio::test]
    async fn partial_timeout_reports_each_residual_index_once() {
        let backend = ScriptedBackend::new(vec![
            ("j1", vec![Step::Ready(vec![1])]),
            ("j2", vec![Step::Progress(10.0)]),
            ("j3", vec![Step::Ready(vec![3])]),
        ]);
        let (dir, outputs) = temp_outputs(3);
        let mut observer = Recording::default();

        // Returns Ok despite the stuck job: partial failure travels
        // through the observer, not the Result.
        poll_batch(
            &backend,
            &ids(&["j1", "j2", "j3"]),
            &outputs,
            &fast_config(3),
            &mut observer,
        )
        .await
        .unwrap();

        assert_eq!(observer.successes, vec![0, 2]);
        assert_eq!(observer.timeouts, vec![1]);
        std::fs::remove_dir_all(dir).ok();
    }

    #[tokio::test]
    async fn query_failure_keeps_index_eligible() {
        let backend = ScriptedBackend::new(vec![(
            "j1",
            vec![Step::Fail, Step::Ready(vec![7])],
        )]);
        let (dir, outputs) = temp_outputs(1);
        let mut observer = Recording::default();

        poll_batch(
            &backend,
            &ids(&["j1"]),
            &outputs,
            &fast_config(5),
            &mut observer,
        )
        .await
        .unwrap();

        assert_eq!(observer.query_errors, vec![0]);
        assert_eq!(observer.successes, vec![0]);
        assert!(observer.timeouts.is_empty());
        std::fs::remove_dir_all(dir).ok();
    }

    #[tokio::test]
    async fn completed_indices_are_not_polled_again() {
        let backend = ScriptedBackend::new(vec![
            ("j1", vec![Step::Ready(vec![1])]),
            ("j2", vec![Step::Progress(0.0), Step::Progress(50.0), Step::Ready(vec![2])]),
        ]);
        let (dir, outputs) = temp_outputs(2);

        poll_batch(
            &backend,
            &ids(&["j1", "j2"]),
            &outputs,
            &fast_config(10),
            &mut NoopObserver,
        )
        .await
        .unwrap();

        // j1: 1 query. j2: 3 queries. A naive re-poll of j1 would add 2.
        assert_eq!(backend.query_count(), 4);
        std::fs::remove_dir_all(dir).ok();
    }
}
