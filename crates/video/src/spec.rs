//! Render job description and pre-submission validation.

use std::path::{Path, PathBuf};

use clipcast_core::words::WordTiming;
use serde::Serialize;

/// Default output geometry (width, height).
pub const DEFAULT_VIDEO_SIZE: (u32, u32) = (2560, 1440);

/// Default frame rate for rendered clips.
pub const DEFAULT_FPS: u32 = 24;

/// Subtitle overlay colors, serialized verbatim into the upload.
#[derive(Debug, Clone, Serialize)]
pub struct TextStyle {
    pub font_color: String,
    pub background_color: String,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            font_color: "white".into(),
            background_color: "black".into(),
        }
    }
}

/// A fully-resolved render request: every referenced asset must already
/// exist on disk when the spec is submitted.
#[derive(Debug, Clone)]
pub struct RenderSpec {
    pub start_time: f64,
    pub end_time: f64,
    pub speech_path: PathBuf,
    pub music_path: PathBuf,
    pub image_paths: Vec<PathBuf>,
    /// Word-level subtitle timings.
    pub words: Vec<WordTiming>,
    pub video_size: (u32, u32),
    pub text_style: TextStyle,
    pub fps: u32,
    /// Clip duration in seconds.
    pub duration: f64,
    /// Where the rendered clip is written once retrieved.
    pub output_path: PathBuf,
}

/// Structural problems with a render spec, caught before any network
/// activity.
#[derive(Debug, thiserror::Error)]
pub enum SpecError {
    #[error("No image files provided")]
    NoImages,

    #[error("Asset file is missing: {0}")]
    MissingAsset(String),

    #[error("Asset file is empty: {0}")]
    EmptyAsset(String),
}

fn check_asset(path: &Path) -> Result<(), SpecError> {
    let meta = std::fs::metadata(path)
        .map_err(|_| SpecError::MissingAsset(path.to_string_lossy().to_string()))?;
    if meta.len() == 0 {
        return Err(SpecError::EmptyAsset(path.to_string_lossy().to_string()));
    }
    Ok(())
}

impl RenderSpec {
    /// Verify every referenced asset exists and is non-empty.
    pub fn validate(&self) -> Result<(), SpecError> {
        if self.image_paths.is_empty() {
            return Err(SpecError::NoImages);
        }
        check_asset(&self.speech_path)?;
        check_asset(&self.music_path)?;
        for image in &self.image_paths {
            check_asset(image)?;
        }
        Ok(())
    }
}
