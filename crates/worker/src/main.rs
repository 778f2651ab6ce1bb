//! Pipeline worker: one full run per invocation.
//!
//! Takes a prompt (argv or `PROMPT`), generates the bilingual podcast,
//! stages per-clip assets, requests renders, waits for completion, and
//! concatenates the clips into the final episode video.

use std::sync::Arc;

use anyhow::Context;
use clipcast_events::bus::EventBus;
use clipcast_events::feed::FeedListener;
use clipcast_events::tracker::CorrelationTracker;
use clipcast_pipeline::content::ContentProcessor;
use clipcast_pipeline::manager::VideoManager;
use clipcast_video::client::RenderClient;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;

use config::WorkerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "clipcast_worker=debug,clipcast=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let prompt = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("PROMPT").ok())
        .context("Usage: clipcast-worker <prompt> (or set PROMPT)")?;

    let config = WorkerConfig::from_env();
    tracing::info!(strategy = ?config.strategy, "Worker starting");

    let processor = ContentProcessor::new(config.content());
    if !processor.check_health().await {
        anyhow::bail!("Podcast service is unhealthy, aborting");
    }

    // One tracker and one feed subscription per run; the listener only
    // actually connects when the feed strategy is selected.
    let tracker = Arc::new(CorrelationTracker::new());
    let bus = Arc::new(EventBus::default());
    let listener = Arc::new(FeedListener::new(config.feed(), tracker, Arc::clone(&bus)));
    let manager = VideoManager::new(
        RenderClient::new(config.render_url.clone()),
        listener,
        bus,
        config.poll(),
    );

    let response = processor.generate(&prompt).await?;
    let clips = processor.extract_clips(&response);
    if clips.is_empty() {
        anyhow::bail!("Podcast response contained no clips");
    }
    tracing::info!(count = clips.len(), "Clips extracted");

    let specs = processor.compile_specs(&clips).await?;
    manager
        .process(&specs, &config.final_output, config.strategy)
        .await?;

    tracing::info!(output = %config.final_output.display(), "Episode rendered");
    Ok(())
}
