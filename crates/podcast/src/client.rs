//! REST client for the podcast service HTTP endpoints.

use serde::Deserialize;

use crate::types::PodcastResponse;

/// HTTP client for one podcast service instance.
pub struct PodcastClient {
    client: reqwest::Client,
    base_url: String,
}

/// Response returned by `POST /api/podcasts` after a job is accepted.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateResponse {
    correlation_id: Option<String>,
}

/// Errors from the podcast service layer.
#[derive(Debug, thiserror::Error)]
pub enum PodcastError {
    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The service returned an error status code.
    #[error("Podcast service error ({status}): {body}")]
    Http { status: u16, body: String },

    /// A response body did not match the expected shape.
    #[error("Failed to decode podcast response: {0}")]
    Decode(String),

    /// A 2xx create response without a correlation id.
    #[error("Podcast service did not return a correlation id")]
    MissingCorrelationId,

    /// Polling attempts (including restarts) were exhausted.
    #[error("Podcast was not ready after all polling attempts")]
    Exhausted,
}

impl PodcastClient {
    /// Create a new client for a podcast service instance.
    ///
    /// * `base_url` - Base HTTP URL, e.g. `http://host:8080`.
    pub fn new(base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
        }
    }

    /// Create a client reusing an existing [`reqwest::Client`]
    /// (useful for connection pooling across service clients).
    pub fn with_client(client: reqwest::Client, base_url: String) -> Self {
        Self { client, base_url }
    }

    /// Probe `GET /healthz`. Any failure — transport or status — reads
    /// as unhealthy; this is a gate, not an error path.
    pub async fn check_health(&self) -> bool {
        let url = format!("{}/healthz", self.base_url);
        match self.client.get(&url).send().await {
            Ok(response) if response.status().is_success() => {
                tracing::debug!("Podcast service is healthy");
                true
            }
            Ok(response) => {
                tracing::error!(status = %response.status(), "Podcast health check failed");
                false
            }
            Err(e) => {
                tracing::error!(error = %e, "Podcast health check unreachable");
                false
            }
        }
    }

    /// Submit a generation job. Returns the service-assigned
    /// correlation id.
    pub async fn create(&self, prompt: &str) -> Result<String, PodcastError> {
        let response = self
            .client
            .post(format!("{}/api/podcasts", self.base_url))
            .json(&serde_json::json!({ "prompt": prompt }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PodcastError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let created: CreateResponse = response.json().await?;
        let correlation_id = created
            .correlation_id
            .ok_or(PodcastError::MissingCorrelationId)?;

        tracing::info!(correlation_id = %correlation_id, "Podcast generation started");
        Ok(correlation_id)
    }

    /// Fetch the current job state.
    ///
    /// 4xx bodies are decoded — the service reports job state through
    /// them. Only 5xx surfaces as [`PodcastError::Http`], which the
    /// two-tier poll treats as restartable.
    pub async fn status(&self, correlation_id: &str) -> Result<PodcastResponse, PodcastError> {
        let response = self
            .client
            .get(format!("{}/api/podcasts/{}", self.base_url, correlation_id))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if status.is_server_error() {
            return Err(PodcastError::Http {
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&body).map_err(|e| PodcastError::Decode(format!("{e}: {body}")))
    }
}
