//! REST client for the render service HTTP endpoints.
//!
//! Submission is a multipart upload of the clip's assets plus
//! JSON-encoded metadata fields. Status is a single GET whose
//! content type distinguishes a finished artifact (`video/mp4`) from
//! an in-progress JSON body carrying a `progress` percentage.

use std::path::Path;

use async_trait::async_trait;
use clipcast_core::types::CorrelationId;
use serde::Deserialize;

use crate::spec::{RenderSpec, SpecError};

/// Content type that marks a status response as the finished artifact.
pub const VIDEO_CONTENT_TYPE: &str = "video/mp4";

/// Errors from the render service layer.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The service rejected a submission.
    #[error("Render submission rejected ({status}): {body}")]
    Submit { status: u16, body: String },

    /// A status query returned an error status code. Transient: the
    /// index stays eligible for the next polling round.
    #[error("Render status query failed ({status}): {body}")]
    Status { status: u16, body: String },

    /// The spec referenced unusable assets.
    #[error("Invalid render spec: {0}")]
    Spec(#[from] SpecError),

    /// Reading assets or writing the artifact failed locally.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Polling attempts were exhausted for a job.
    #[error("Polling timed out")]
    Timeout,

    /// A job signalled completion but its artifact is not ready.
    #[error("Artifact for {correlation_id} is not ready")]
    NotReady { correlation_id: CorrelationId },

    /// Correlation-id and output-path counts differ. Structural;
    /// raised before any network activity.
    #[error("Batch mismatch: {ids} correlation ids vs {outputs} output paths")]
    BatchMismatch { ids: usize, outputs: usize },
}

/// Outcome of one status query.
#[derive(Debug, Clone)]
pub enum RenderStatus {
    /// The artifact is finished; the body bytes are the clip.
    Ready(Vec<u8>),
    /// Still rendering, with the last reported percentage (0–100).
    InProgress { progress: f64 },
}

/// Response returned by the submission endpoint.
#[derive(Debug, Deserialize)]
struct SubmitResponse {
    correlation_id: String,
}

/// In-progress JSON status body. `progress` defaults to 0 when the
/// field is absent.
#[derive(Debug, Deserialize)]
struct ProgressBody {
    #[serde(default)]
    progress: f64,
}

/// Where the poller asks about job state. The production impl is
/// [`RenderClient`]; tests script their own.
#[async_trait]
pub trait RenderBackend: Send + Sync {
    async fn fetch_status(&self, correlation_id: &str) -> Result<RenderStatus, RenderError>;
}

/// HTTP client for one render service instance.
pub struct RenderClient {
    client: reqwest::Client,
    base_url: String,
}

impl RenderClient {
    /// Create a new client for a render service instance.
    ///
    /// * `base_url` - job collection URL, e.g.
    ///   `http://host:9000/api/v1/video-creation`.
    pub fn new(base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
        }
    }

    /// Create a client reusing an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, base_url: String) -> Self {
        Self { client, base_url }
    }

    fn job_url(&self, correlation_id: &str) -> String {
        format!("{}/{}", self.base_url, correlation_id)
    }

    /// Load one asset file into a multipart part.
    async fn file_part(path: &Path) -> Result<reqwest::multipart::Part, RenderError> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "asset".into());
        Ok(reqwest::multipart::Part::bytes(bytes).file_name(file_name))
    }

    /// Assemble the multipart upload for a render spec.
    async fn build_form(spec: &RenderSpec) -> Result<reqwest::multipart::Form, RenderError> {
        let mut form = reqwest::multipart::Form::new()
            .part("speech_file", Self::file_part(&spec.speech_path).await?)
            .part("music_file", Self::file_part(&spec.music_path).await?);

        for image in &spec.image_paths {
            form = form.part("image_files", Self::file_part(image).await?);
        }

        let text_data = serde_json::to_string(&spec.words)
            .expect("word timings always serialize");
        let video_size = serde_json::to_string(&[spec.video_size.0, spec.video_size.1])
            .expect("video size always serializes");
        let text_config = serde_json::to_string(&spec.text_style)
            .expect("text style always serializes");

        Ok(form
            .text("text_data", text_data)
            .text("video_size", video_size)
            .text("text_config", text_config)
            .text("fps", spec.fps.to_string())
            .text("duration", spec.duration.to_string())
            .text("start_time", spec.start_time.to_string())
            .text("end_time", spec.end_time.to_string()))
    }

    /// Submit one render job. Single-shot: no retries live here.
    ///
    /// Validates the spec's assets, uploads them, and returns the
    /// service-assigned correlation id.
    pub async fn submit(&self, spec: &RenderSpec) -> Result<CorrelationId, RenderError> {
        spec.validate()?;

        let form = Self::build_form(spec).await?;
        let response = self
            .client
            .post(&self.base_url)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RenderError::Submit {
                status: status.as_u16(),
                body,
            });
        }

        let submitted: SubmitResponse = response.json().await?;
        tracing::info!(
            correlation_id = %submitted.correlation_id,
            output = %spec.output_path.display(),
            "Render job submitted",
        );
        Ok(submitted.correlation_id)
    }

    /// Submit a batch of render jobs sequentially, preserving order.
    ///
    /// The first failure aborts the whole call — no partial id list is
    /// ever returned.
    pub async fn submit_all(&self, specs: &[RenderSpec]) -> Result<Vec<CorrelationId>, RenderError> {
        let mut correlation_ids = Vec::with_capacity(specs.len());
        for (index, spec) in specs.iter().enumerate() {
            tracing::debug!(index, total = specs.len(), "Submitting render job");
            correlation_ids.push(self.submit(spec).await?);
        }
        tracing::info!(count = correlation_ids.len(), "Render batch submitted");
        Ok(correlation_ids)
    }

    /// Retrieve a ready artifact and write it to `output`.
    ///
    /// Intended for the feed path, where completion was already
    /// signalled; a still-in-progress answer is an error here.
    pub async fn download_artifact(
        &self,
        correlation_id: &str,
        output: &Path,
    ) -> Result<(), RenderError> {
        match self.fetch_status(correlation_id).await? {
            RenderStatus::Ready(bytes) => {
                tokio::fs::write(output, &bytes).await?;
                tracing::info!(
                    correlation_id,
                    output = %output.display(),
                    "Rendered clip written",
                );
                Ok(())
            }
            RenderStatus::InProgress { .. } => Err(RenderError::NotReady {
                correlation_id: correlation_id.to_string(),
            }),
        }
    }
}

#[async_trait]
impl RenderBackend for RenderClient {
    /// Query one job. Readiness is keyed purely off the `video/mp4`
    /// content type; a JSON body is an in-progress report whose missing
    /// or out-of-range `progress` collapses to the 0–100 range.
    async fn fetch_status(&self, correlation_id: &str) -> Result<RenderStatus, RenderError> {
        let response = self.client.get(self.job_url(correlation_id)).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RenderError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();

        let bytes = response.bytes().await?;

        if content_type == VIDEO_CONTENT_TYPE {
            return Ok(RenderStatus::Ready(bytes.to_vec()));
        }

        let progress = if content_type.starts_with("application/json") {
            serde_json::from_slice::<ProgressBody>(&bytes)
                .map(|b| b.progress)
                .unwrap_or(0.0)
        } else {
            0.0
        };

        Ok(RenderStatus::InProgress {
            progress: progress.clamp(0.0, 100.0),
        })
    }
}
