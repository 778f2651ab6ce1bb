//! Correlation tracker: the registry of outstanding remote jobs.
//!
//! [`CorrelationTracker`] maps opaque correlation ids to completion
//! state and lets any number of independent callers wait for the joint
//! completion of their own id subset. Completion marks arrive from the
//! push feed (or from tests) via [`mark_completed`]; one mark may
//! satisfy several overlapping registrations at once.
//!
//! The tracker is shared as `Arc<CorrelationTracker>` and is safe to
//! call from parallel tasks: all state lives behind a single mutex and
//! the lock is never held across an await point.
//!
//! [`mark_completed`]: CorrelationTracker::mark_completed

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Mutex, MutexGuard};

use clipcast_core::types::CorrelationId;
use tokio::sync::oneshot;

/// Per-job bookkeeping. Records are created lazily — on the first wait
/// registration referencing the id, or on the first completion mark —
/// and live for the lifetime of the tracker.
#[derive(Debug, Default)]
struct JobRecord {
    /// Monotonic: once `true`, never reverts.
    completed: bool,
    /// Last reported progress percentage (0–100), 0 if never reported.
    progress: f64,
}

/// A caller's declared interest in the joint completion of a set of
/// correlation ids. Resolved exactly once: sending on the oneshot
/// channel consumes the sender, so a registration cannot double-fire.
struct Waiter {
    ids: Vec<CorrelationId>,
    tx: oneshot::Sender<()>,
}

#[derive(Default)]
struct TrackerState {
    jobs: HashMap<CorrelationId, JobRecord>,
    waiters: Vec<Waiter>,
}

impl TrackerState {
    fn all_completed(&self, ids: &[CorrelationId]) -> bool {
        ids.iter()
            .all(|id| self.jobs.get(id).is_some_and(|job| job.completed))
    }
}

/// Registry of remote-job completion state with multi-waiter fan-out.
#[derive(Default)]
pub struct CorrelationTracker {
    inner: Mutex<TrackerState>,
}

impl CorrelationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, TrackerState> {
        // A poisoned lock only means a panic elsewhere while holding it;
        // the state itself is always consistent between operations.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Register interest in the joint completion of `ids`.
    ///
    /// If every id is already completed, the registration resolves
    /// before this method returns and nothing is stored. Otherwise all
    /// referenced ids get a (pending) job record and the returned
    /// future resolves when the last of them is marked completed.
    ///
    /// The returned future never fails and the tracker imposes no
    /// timeout; callers wanting a deadline race the future themselves.
    pub fn wait_for_all(&self, ids: &[CorrelationId]) -> impl Future<Output = ()> + Send + 'static {
        let rx = {
            let mut state = self.state();

            if state.all_completed(ids) {
                tracing::debug!(count = ids.len(), "All correlation ids already completed");
                None
            } else {
                for id in ids {
                    state.jobs.entry(id.clone()).or_default();
                }
                let (tx, rx) = oneshot::channel();
                state.waiters.push(Waiter {
                    ids: ids.to_vec(),
                    tx,
                });
                tracing::debug!(count = ids.len(), "Registered completion waiter");
                Some(rx)
            }
        };

        async move {
            if let Some(rx) = rx {
                // A dropped sender means the tracker itself went away;
                // resolving is the only sane answer for the waiter.
                let _ = rx.await;
            }
        }
    }

    /// Mark a correlation id as completed.
    ///
    /// Idempotent: re-marking an already-completed id changes nothing
    /// and cannot re-resolve a waiter (resolution consumed its sender
    /// and removed it from the active set). Ids never seen before get a
    /// record created in the completed state, so a registration that
    /// arrives later still observes the completion.
    pub fn mark_completed(&self, id: &str) {
        let mut state = self.state();

        let record = state.jobs.entry(id.to_string()).or_default();
        if record.completed {
            tracing::debug!(correlation_id = id, "Duplicate completion mark ignored");
            return;
        }
        record.completed = true;
        tracing::info!(correlation_id = id, "Marked completed");

        // Take the waiter list so resolved entries can be dropped while
        // scanning; survivors are put back afterwards.
        let waiters = std::mem::take(&mut state.waiters);
        let mut remaining = Vec::with_capacity(waiters.len());
        for waiter in waiters {
            if state.all_completed(&waiter.ids) {
                tracing::debug!(count = waiter.ids.len(), "Resolving completion waiter");
                let _ = waiter.tx.send(());
            } else {
                remaining.push(waiter);
            }
        }
        state.waiters = remaining;
    }

    /// Record the last known progress percentage for a job.
    ///
    /// Values are clamped to 0–100. An id never seen before gets a
    /// pending record (and a warning, since progress for an untracked
    /// job usually means a wiring mistake upstream).
    pub fn set_progress(&self, id: &str, percentage: f64) {
        let mut state = self.state();
        if !state.jobs.contains_key(id) {
            tracing::warn!(correlation_id = id, "Progress reported for unknown correlation id");
        }
        let record = state.jobs.entry(id.to_string()).or_default();
        record.progress = percentage.clamp(0.0, 100.0);
    }

    /// Average of the last known progress across `ids` (unknown ids
    /// count as 0). Returns 0 for an empty slice.
    pub fn total_progress(&self, ids: &[CorrelationId]) -> f64 {
        if ids.is_empty() {
            return 0.0;
        }
        let state = self.state();
        let total: f64 = ids
            .iter()
            .map(|id| state.jobs.get(id).map_or(0.0, |job| job.progress))
            .sum();
        total / ids.len() as f64
    }

    /// Whether `id` has been marked completed.
    pub fn is_completed(&self, id: &str) -> bool {
        self.state().jobs.get(id).is_some_and(|job| job.completed)
    }

    /// Number of currently unresolved wait registrations.
    pub fn pending_waiters(&self) -> usize {
        self.state().waiters.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;

    fn ids(list: &[&str]) -> Vec<CorrelationId> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn waiter_resolves_when_all_ids_complete() {
        let tracker = CorrelationTracker::new();
        let wait = tracker.wait_for_all(&ids(&["a", "b"]));

        tracker.mark_completed("a");
        tracker.mark_completed("b");

        wait.await;
        assert_eq!(tracker.pending_waiters(), 0);
    }

    #[tokio::test]
    async fn already_completed_subset_resolves_immediately() {
        let tracker = CorrelationTracker::new();
        tracker.mark_completed("a");
        tracker.mark_completed("b");

        // Resolved at registration time — no further marks needed.
        let wait = tracker.wait_for_all(&ids(&["a", "b"]));
        assert!(wait.now_or_never().is_some());
        assert_eq!(tracker.pending_waiters(), 0);
    }

    #[tokio::test]
    async fn duplicate_mark_is_idempotent() {
        let tracker = CorrelationTracker::new();
        let wait = tracker.wait_for_all(&ids(&["a"]));

        tracker.mark_completed("a");
        tracker.mark_completed("a");

        wait.await;
        assert!(tracker.is_completed("a"));
        assert_eq!(tracker.pending_waiters(), 0);
    }

    #[tokio::test]
    async fn partial_completion_does_not_resolve() {
        let tracker = CorrelationTracker::new();
        let wait = tracker.wait_for_all(&ids(&["a", "b"]));

        tracker.mark_completed("a");
        assert_eq!(tracker.pending_waiters(), 1);

        tracker.mark_completed("b");
        wait.await;
    }

    #[tokio::test]
    async fn overlapping_subsets_resolve_independently() {
        let tracker = CorrelationTracker::new();
        let wait_ab = tracker.wait_for_all(&ids(&["a", "b"]));
        let wait_bc = tracker.wait_for_all(&ids(&["b", "c"]));

        // B alone satisfies neither registration.
        tracker.mark_completed("b");
        assert_eq!(tracker.pending_waiters(), 2);

        tracker.mark_completed("a");
        wait_ab.await;
        assert_eq!(tracker.pending_waiters(), 1);

        tracker.mark_completed("c");
        wait_bc.await;
        assert_eq!(tracker.pending_waiters(), 0);
    }

    #[tokio::test]
    async fn one_mark_can_resolve_several_waiters() {
        let tracker = CorrelationTracker::new();
        tracker.mark_completed("a");
        tracker.mark_completed("c");
        let wait_ab = tracker.wait_for_all(&ids(&["a", "b"]));
        let wait_bc = tracker.wait_for_all(&ids(&["b", "c"]));
        let wait_b = tracker.wait_for_all(&ids(&["b"]));

        tracker.mark_completed("b");

        wait_ab.await;
        wait_bc.await;
        wait_b.await;
        assert_eq!(tracker.pending_waiters(), 0);
    }

    #[test]
    fn unknown_id_mark_does_not_disturb_registrations() {
        let tracker = CorrelationTracker::new();
        let _wait = tracker.wait_for_all(&ids(&["a"]));

        tracker.mark_completed("never-registered");

        assert!(tracker.is_completed("never-registered"));
        assert_eq!(tracker.pending_waiters(), 1);
    }

    #[tokio::test]
    async fn completion_before_registration_is_not_missed() {
        let tracker = CorrelationTracker::new();
        // The feed can deliver a completion before anyone registers.
        tracker.mark_completed("early");

        let wait = tracker.wait_for_all(&ids(&["early"]));
        assert!(wait.now_or_never().is_some());
    }

    #[test]
    fn progress_defaults_to_zero() {
        let tracker = CorrelationTracker::new();
        let _wait = tracker.wait_for_all(&ids(&["a", "b"]));
        assert_eq!(tracker.total_progress(&ids(&["a", "b"])), 0.0);
    }

    #[test]
    fn total_progress_averages_known_values() {
        let tracker = CorrelationTracker::new();
        tracker.set_progress("a", 50.0);
        tracker.set_progress("b", 100.0);
        assert_eq!(tracker.total_progress(&ids(&["a", "b"])), 75.0);
        // Unknown ids pull the average down as zeros.
        assert_eq!(tracker.total_progress(&ids(&["a", "b", "c"])), 50.0);
    }

    #[test]
    fn progress_is_clamped() {
        let tracker = CorrelationTracker::new();
        tracker.set_progress("a", 250.0);
        tracker.set_progress("b", -10.0);
        assert_eq!(tracker.total_progress(&ids(&["a"])), 100.0);
        assert_eq!(tracker.total_progress(&ids(&["b"])), 0.0);
    }

    #[test]
    fn total_progress_of_empty_set_is_zero() {
        let tracker = CorrelationTracker::new();
        assert_eq!(tracker.total_progress(&[]), 0.0);
    }
}
