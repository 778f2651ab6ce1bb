use std::path::PathBuf;
use std::time::Duration;

use clipcast_events::feed::FeedConfig;
use clipcast_images::download::WaitConfig;
use clipcast_pipeline::content::ContentConfig;
use clipcast_pipeline::manager::CompletionStrategy;
use clipcast_podcast::poll::RetryPolicy;
use clipcast_video::poller::PollConfig;

/// Worker configuration loaded from environment variables.
///
/// All fields have defaults suitable for a local service stack; in
/// production, override via environment variables.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Podcast service base URL.
    pub podcast_url: String,
    /// Image service base URL.
    pub image_url: String,
    /// Render service job collection URL.
    pub render_url: String,
    /// Completion feed WebSocket URL.
    pub feed_url: String,
    /// Completion feed channel name.
    pub feed_channel: String,
    /// How render completion is awaited.
    pub strategy: CompletionStrategy,
    /// Render polling rounds before per-clip timeout.
    pub poll_max_attempts: u32,
    /// Pause between render polling rounds.
    pub poll_delay: Duration,
    /// Images gathered per clip topic.
    pub images_per_clip: u32,
    /// Directory for cached podcast responses.
    pub cache_dir: PathBuf,
    /// Directory for staged assets and rendered clips.
    pub assets_dir: PathBuf,
    /// Background music mixed into every clip.
    pub music_path: PathBuf,
    /// Where the concatenated episode video is written.
    pub final_output: PathBuf,
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.into())
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => raw
            .parse()
            .unwrap_or_else(|_| panic!("{key} must be a valid value, got {raw:?}")),
        Err(_) => default,
    }
}

impl WorkerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                  | Default                                        |
    /// |--------------------------|------------------------------------------------|
    /// | `PODCAST_SERVICE_URL`    | `http://localhost:8080`                        |
    /// | `IMAGE_SERVICE_URL`      | `http://localhost:8081`                        |
    /// | `RENDER_SERVICE_URL`     | `http://localhost:8082/api/v1/video-creation`  |
    /// | `COMPLETION_FEED_URL`    | `ws://localhost:9100`                          |
    /// | `COMPLETION_FEED_CHANNEL`| `video-completion-topic`                       |
    /// | `COMPLETION_STRATEGY`    | `poll` (`feed` enables the push feed)          |
    /// | `POLL_MAX_ATTEMPTS`      | `180`                                          |
    /// | `POLL_DELAY_SECS`        | `5`                                            |
    /// | `IMAGES_PER_CLIP`        | `12`                                           |
    /// | `CACHE_DIR`              | `.cache/clipcast`                              |
    /// | `ASSETS_DIR`             | `.clipcast/assets`                             |
    /// | `MUSIC_PATH`             | `assets/background.mp3`                        |
    /// | `FINAL_OUTPUT`           | `episode.mp4`                                  |
    pub fn from_env() -> Self {
        let strategy = match env_or("COMPLETION_STRATEGY", "poll").as_str() {
            "feed" => CompletionStrategy::Feed,
            _ => CompletionStrategy::Poll,
        };

        Self {
            podcast_url: env_or("PODCAST_SERVICE_URL", "http://localhost:8080"),
            image_url: env_or("IMAGE_SERVICE_URL", "http://localhost:8081"),
            render_url: env_or(
                "RENDER_SERVICE_URL",
                "http://localhost:8082/api/v1/video-creation",
            ),
            feed_url: env_or("COMPLETION_FEED_URL", "ws://localhost:9100"),
            feed_channel: env_or("COMPLETION_FEED_CHANNEL", "video-completion-topic"),
            strategy,
            poll_max_attempts: env_parse("POLL_MAX_ATTEMPTS", 180),
            poll_delay: Duration::from_secs(env_parse("POLL_DELAY_SECS", 5)),
            images_per_clip: env_parse("IMAGES_PER_CLIP", 12),
            cache_dir: PathBuf::from(env_or("CACHE_DIR", ".cache/clipcast")),
            assets_dir: PathBuf::from(env_or("ASSETS_DIR", ".clipcast/assets")),
            music_path: PathBuf::from(env_or("MUSIC_PATH", "assets/background.mp3")),
            final_output: PathBuf::from(env_or("FINAL_OUTPUT", "episode.mp4")),
        }
    }

    /// Content-stage view of this config.
    pub fn content(&self) -> ContentConfig {
        ContentConfig {
            podcast_url: self.podcast_url.clone(),
            image_url: self.image_url.clone(),
            images_per_clip: self.images_per_clip,
            cache_dir: self.cache_dir.clone(),
            assets_dir: self.assets_dir.clone(),
            music_path: self.music_path.clone(),
            retry: RetryPolicy::default(),
            image_wait: WaitConfig::default(),
        }
    }

    /// Completion-feed view of this config.
    pub fn feed(&self) -> FeedConfig {
        FeedConfig {
            url: self.feed_url.clone(),
            channel: self.feed_channel.clone(),
        }
    }

    /// Render-polling view of this config.
    pub fn poll(&self) -> PollConfig {
        PollConfig {
            max_attempts: self.poll_max_attempts,
            delay: self.poll_delay,
        }
    }
}
