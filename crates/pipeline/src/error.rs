use clipcast_core::error::CoreError;
use clipcast_core::ffmpeg::FfmpegError;
use clipcast_images::client::ImageError;
use clipcast_podcast::client::PodcastError;
use clipcast_video::client::RenderError;

/// Any failure that aborts a pipeline run.
///
/// Per-clip polling hiccups never surface here — they travel through
/// the poll observer. This enum is for structural failures: submission
/// rejected, podcast unavailable, assets unusable, concat failed.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Podcast(#[from] PodcastError),

    #[error(transparent)]
    Image(#[from] ImageError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Concat(#[from] FfmpegError),

    #[error("Failed to decode clip audio: {0}")]
    AudioDecode(#[from] base64::DecodeError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
