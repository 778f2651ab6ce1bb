//! Two-tier polling for podcast generation.
//!
//! The inner loop issues bounded status queries on a fixed interval and
//! returns as soon as the response carries the finished result. The
//! outer loop restarts the inner loop — with a much longer pause — when
//! the service answers with a 5xx, up to a bounded restart budget.
//! The two tiers are deliberately separate knobs: attempt exhaustion is
//! "the job is slow", a 5xx restart is "the service fell over and came
//! back".

use std::time::Duration;

use clipcast_core::cache::{djb2, DiskCache};

use crate::client::{PodcastClient, PodcastError};
use crate::types::PodcastResponse;

/// Retry tuning for [`wait_for_podcast`].
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Status queries per inner round.
    pub max_attempts: u32,
    /// Pause between status queries.
    pub delay: Duration,
    /// Full inner-round restarts allowed on 5xx responses.
    pub max_restarts: u32,
    /// Pause before an inner round restarts after a 5xx.
    pub restart_pause: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 12 * 30,
            delay: Duration::from_secs(5),
            max_restarts: 5,
            restart_pause: Duration::from_secs(60),
        }
    }
}

/// Inner polling round: query until the podcast is ready or attempts
/// run out (`Ok(None)`). 5xx responses propagate to the caller.
async fn poll_status(
    client: &PodcastClient,
    correlation_id: &str,
    policy: &RetryPolicy,
) -> Result<Option<PodcastResponse>, PodcastError> {
    for attempt in 0..policy.max_attempts {
        let response = client.status(correlation_id).await?;

        if let Some(error) = &response.error {
            // The service reports soft generation errors in-band; they
            // can still resolve on a later attempt.
            tracing::error!(correlation_id, error = %error, "Podcast generation error reported");
        }
        if response.is_ready() {
            return Ok(Some(response));
        }

        tracing::info!(
            correlation_id,
            attempt = attempt + 1,
            max_attempts = policy.max_attempts,
            "Podcast not ready yet, retrying",
        );
        tokio::time::sleep(policy.delay).await;
    }

    Ok(None)
}

/// Wait for a submitted podcast job to finish.
///
/// Runs the inner polling round, restarting it after a long pause when
/// the service answers 5xx, up to [`RetryPolicy::max_restarts`] times.
/// Attempt or restart exhaustion yields [`PodcastError::Exhausted`];
/// any non-5xx failure aborts the wait immediately.
pub async fn wait_for_podcast(
    client: &PodcastClient,
    correlation_id: &str,
    policy: &RetryPolicy,
) -> Result<PodcastResponse, PodcastError> {
    let mut restarts = 0;

    loop {
        match poll_status(client, correlation_id, policy).await {
            Ok(Some(response)) => return Ok(response),
            Ok(None) => {
                tracing::error!(correlation_id, "Polling attempts exhausted, podcast not available");
                return Err(PodcastError::Exhausted);
            }
            Err(PodcastError::Http { status, body }) if (500..600).contains(&status) => {
                restarts += 1;
                if restarts >= policy.max_restarts {
                    tracing::error!(correlation_id, "Restart budget exhausted after repeated 5xx");
                    return Err(PodcastError::Exhausted);
                }
                tracing::warn!(
                    correlation_id,
                    status,
                    restarts,
                    max_restarts = policy.max_restarts,
                    body = %body,
                    "5xx from podcast service, restarting poll round",
                );
                tokio::time::sleep(policy.restart_pause).await;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Generate a podcast for `prompt`, replaying a cached response when
/// one exists.
///
/// The cache key is derived from a djb2 hash of the prompt, so repeated
/// runs with the same prompt skip the (minutes-long) remote generation.
/// An unreadable cache entry is ignored, not fatal. Cache write
/// failures are logged and the fresh response is returned anyway.
pub async fn create_and_wait(
    client: &PodcastClient,
    cache: &DiskCache,
    prompt: &str,
    policy: &RetryPolicy,
) -> Result<PodcastResponse, PodcastError> {
    let cache_key = format!("full_podcast_{}.json", djb2(prompt));

    if let Some(bytes) = cache.read(&cache_key).await {
        match serde_json::from_slice::<PodcastResponse>(&bytes) {
            Ok(response) => {
                tracing::info!(cache_key, "Replaying cached podcast response");
                return Ok(response);
            }
            Err(e) => {
                tracing::warn!(cache_key, error = %e, "Ignoring unreadable cache entry");
            }
        }
    }

    let correlation_id = client.create(prompt).await?;
    let response = wait_for_podcast(client, &correlation_id, policy).await?;

    match serde_json::to_vec(&response) {
        Ok(bytes) => {
            if let Err(e) = cache.write(&cache_key, &bytes).await {
                tracing::warn!(cache_key, error = %e, "Failed to write podcast cache entry");
            }
        }
        Err(e) => {
            tracing::warn!(cache_key, error = %e, "Failed to serialize podcast response for cache");
        }
    }

    Ok(response)
}
