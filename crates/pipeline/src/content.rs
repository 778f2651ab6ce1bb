//! Prompt → render specs.
//!
//! Drives the podcast service for script + audio, stages per-clip
//! assets on disk (speech audio, topic images), normalizes word
//! timings, and assembles one [`RenderSpec`] per clip.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use clipcast_core::cache::DiskCache;
use clipcast_core::words::normalize_words;
use clipcast_images::client::ImageClient;
use clipcast_images::download::{download_all, WaitConfig};
use clipcast_podcast::client::PodcastClient;
use clipcast_podcast::poll::{create_and_wait, RetryPolicy};
use clipcast_podcast::types::{PodcastClip, PodcastResponse};
use clipcast_video::spec::{RenderSpec, TextStyle};

use crate::error::PipelineError;

/// Frame rate for slideshow-style clips (static images + subtitles).
const CLIP_FPS: u32 = 2;

/// Output geometry for rendered clips.
const CLIP_VIDEO_SIZE: (u32, u32) = (1920, 1080);

/// Everything the content stage needs to reach its collaborators.
#[derive(Debug, Clone)]
pub struct ContentConfig {
    /// Podcast service base URL.
    pub podcast_url: String,
    /// Image service base URL.
    pub image_url: String,
    /// Images gathered per clip topic.
    pub images_per_clip: u32,
    /// Directory for cached podcast responses.
    pub cache_dir: PathBuf,
    /// Directory where staged assets and rendered clips are written.
    pub assets_dir: PathBuf,
    /// Background music mixed into every clip.
    pub music_path: PathBuf,
    /// Podcast polling policy.
    pub retry: RetryPolicy,
    /// Image count-polling policy.
    pub image_wait: WaitConfig,
}

/// Turns one prompt into a batch of fully-resolved render specs.
pub struct ContentProcessor {
    config: ContentConfig,
    podcast: PodcastClient,
    cache: DiskCache,
    /// Image paths already downloaded per query; clips sharing a topic
    /// reuse the same files instead of re-running the search session.
    downloaded_images: Mutex<HashMap<String, Vec<PathBuf>>>,
}

impl ContentProcessor {
    pub fn new(config: ContentConfig) -> Self {
        let podcast = PodcastClient::new(config.podcast_url.clone());
        let cache = DiskCache::new(config.cache_dir.clone());
        Self {
            config,
            podcast,
            cache,
            downloaded_images: Mutex::new(HashMap::new()),
        }
    }

    /// Gate a run on the podcast service being reachable.
    pub async fn check_health(&self) -> bool {
        let healthy = self.podcast.check_health().await;
        if !healthy {
            tracing::error!("Podcast service health check failed");
        }
        healthy
    }

    /// Generate (or replay from cache) the full podcast for a prompt.
    pub async fn generate(&self, prompt: &str) -> Result<PodcastResponse, PipelineError> {
        tracing::info!(prompt, "Generating podcast content");
        let response =
            create_and_wait(&self.podcast, &self.cache, prompt, &self.config.retry).await?;
        Ok(response)
    }

    /// Pull the clip list out of a finished podcast response.
    pub fn extract_clips(&self, response: &PodcastResponse) -> Vec<PodcastClip> {
        response
            .choices
            .as_deref()
            .and_then(|choices| choices.first())
            .map(|choice| choice.message.audio.trimmed.clone())
            .unwrap_or_default()
    }

    /// Download (or reuse) the image set for a clip topic, staging the
    /// files under the assets directory.
    pub async fn fetch_images(&self, query: &str) -> Result<Vec<PathBuf>, PipelineError> {
        if let Some(paths) = self.downloaded_images.lock().unwrap_or_else(|e| e.into_inner()).get(query) {
            tracing::debug!(query, "Reusing previously downloaded images");
            return Ok(paths.clone());
        }

        tracing::info!(query, "Fetching images");
        let client = ImageClient::new(
            self.config.image_url.clone(),
            query.to_string(),
            self.config.images_per_clip,
        );
        let buffers = download_all(&client, &self.config.image_wait).await?;

        let slug = query.split_whitespace().collect::<Vec<_>>().join("_");
        let image_dir = self.config.assets_dir.join("images");
        tokio::fs::create_dir_all(&image_dir).await?;

        let mut paths = Vec::with_capacity(buffers.len());
        for (index, buffer) in buffers.iter().enumerate() {
            let path = image_dir.join(format!("{slug}_{index}.jpg"));
            tokio::fs::write(&path, buffer).await?;
            paths.push(path);
        }

        self.downloaded_images
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(query.to_string(), paths.clone());
        Ok(paths)
    }

    /// Stage one clip's assets and build its render spec.
    ///
    /// Writes the clip's speech audio to disk, normalizes the word
    /// timings, and gathers topic images. The clip duration comes from
    /// the last word's end, falling back to the clip boundary.
    pub async fn render_spec_for_clip(
        &self,
        clip: &PodcastClip,
        clip_index: usize,
    ) -> Result<RenderSpec, PipelineError> {
        tracing::debug!(clip_index, query = %clip.query, "Assembling render spec");

        tokio::fs::create_dir_all(&self.config.assets_dir).await?;

        let speech_path = self.config.assets_dir.join(format!("speech-{clip_index}.aac"));
        tokio::fs::write(&speech_path, clip.decode_audio()?).await?;

        let words = normalize_words(clip.segments.iter().map(|s| s.words.clone()))?;
        let duration = words.last().map_or(clip.end_time, |w| w.end);

        let image_paths = self.fetch_images(&clip.query).await?;
        let output_path = self.config.assets_dir.join(format!("clip-{clip_index}.mp4"));

        Ok(RenderSpec {
            start_time: clip.start_time,
            end_time: clip.end_time,
            speech_path,
            music_path: self.config.music_path.clone(),
            image_paths,
            words,
            video_size: CLIP_VIDEO_SIZE,
            text_style: TextStyle::default(),
            fps: CLIP_FPS,
            duration,
            output_path,
        })
    }

    /// Build render specs for every clip, in order.
    pub async fn compile_specs(
        &self,
        clips: &[PodcastClip],
    ) -> Result<Vec<RenderSpec>, PipelineError> {
        tracing::info!(count = clips.len(), "Compiling render specs");
        let mut specs = Vec::with_capacity(clips.len());
        for (index, clip) in clips.iter().enumerate() {
            specs.push(self.render_spec_for_clip(clip, index + 1).await?);
        }
        Ok(specs)
    }

    /// Directory staged assets are written to.
    pub fn assets_dir(&self) -> &Path {
        &self.config.assets_dir
    }
}
