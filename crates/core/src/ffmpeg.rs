//! FFmpeg/FFprobe command wrappers for the final assembly step.
//!
//! Rendered clips come back from the render service as finished MP4
//! files; the only local video work is concatenating them (stream copy
//! via the concat demuxer) and probing the result.

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Error type for FFmpeg/FFprobe operations.
#[derive(Debug, thiserror::Error)]
pub enum FfmpegError {
    #[error("ffmpeg/ffprobe binary not found: {0}")]
    NotFound(std::io::Error),

    #[error("ffmpeg/ffprobe execution failed (exit code {exit_code:?}): {stderr}")]
    ExecutionFailed {
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("failed to parse ffprobe output: {0}")]
    ParseError(String),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("clip file not found: {0}")]
    ClipNotFound(String),
}

// ---------------------------------------------------------------------------
// Concatenation
// ---------------------------------------------------------------------------

/// Build the concat-demuxer list file content for a set of clip paths.
///
/// One `file '<path>'` line per clip, in the given order.
pub fn build_concat_list(inputs: &[PathBuf]) -> String {
    inputs
        .iter()
        .map(|p| format!("file '{}'", p.display()))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Concatenate already-rendered clips into a single output file.
///
/// Writes a temporary `concat_list.txt` next to the output, runs
/// `ffmpeg -f concat -safe 0 -i <list> -c copy <output>`, and removes
/// the list file on success. Inputs are stream-copied, not re-encoded.
pub async fn concat_clips(inputs: &[PathBuf], output: &Path) -> Result<(), FfmpegError> {
    for input in inputs {
        if !input.exists() {
            return Err(FfmpegError::ClipNotFound(
                input.to_string_lossy().to_string(),
            ));
        }
    }

    let list_path = output
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .join("concat_list.txt");
    tokio::fs::write(&list_path, build_concat_list(inputs)).await?;

    tracing::debug!(
        clips = inputs.len(),
        output = %output.display(),
        "Running ffmpeg concat",
    );

    let result = tokio::process::Command::new("ffmpeg")
        .args(["-y", "-f", "concat", "-safe", "0", "-i"])
        .arg(&list_path)
        .args(["-c", "copy"])
        .arg(output)
        .output()
        .await
        .map_err(FfmpegError::NotFound)?;

    if !result.status.success() {
        // The list file is left behind for debugging failed runs.
        return Err(FfmpegError::ExecutionFailed {
            exit_code: result.status.code(),
            stderr: String::from_utf8_lossy(&result.stderr).to_string(),
        });
    }

    tokio::fs::remove_file(&list_path).await?;
    tracing::info!(output = %output.display(), "Concatenation complete");
    Ok(())
}

// ---------------------------------------------------------------------------
// Probing
// ---------------------------------------------------------------------------

/// Format-level subset of ffprobe's JSON output.
#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    format: FfprobeFormat,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

/// Parse the container duration (seconds) out of ffprobe JSON.
fn parse_duration_json(json: &str) -> Result<f64, FfmpegError> {
    let probe: FfprobeOutput =
        serde_json::from_str(json).map_err(|e| FfmpegError::ParseError(format!("{e}: {json}")))?;
    probe
        .format
        .duration
        .as_deref()
        .and_then(|d| d.parse::<f64>().ok())
        .ok_or_else(|| FfmpegError::ParseError("missing format.duration".into()))
}

/// Run `ffprobe` on a file and return its duration in seconds.
pub async fn probe_duration(path: &Path) -> Result<f64, FfmpegError> {
    if !path.exists() {
        return Err(FfmpegError::ClipNotFound(path.to_string_lossy().to_string()));
    }

    let output = tokio::process::Command::new("ffprobe")
        .args(["-v", "quiet", "-print_format", "json", "-show_format"])
        .arg(path)
        .output()
        .await
        .map_err(FfmpegError::NotFound)?;

    if !output.status.success() {
        return Err(FfmpegError::ExecutionFailed {
            exit_code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        });
    }

    parse_duration_json(&String::from_utf8_lossy(&output.stdout))
}
