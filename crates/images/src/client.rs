//! REST client for the image-search service HTTP endpoints.

use serde::Deserialize;

/// HTTP client for one image-search session (one query).
pub struct ImageClient {
    client: reqwest::Client,
    base_url: String,
    query: String,
    limit: u32,
}

/// Response returned by `POST /quick-search` when a session starts.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchResponse {
    conversation_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CountResponse {
    count: u32,
}

/// Body the service answers with when an image is not yet stored.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UnavailableResponse {
    #[serde(default)]
    file_key: Option<String>,
}

/// Errors from the image service layer.
#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The service returned a non-2xx status code.
    #[error("Image service error ({status}): {body}")]
    Http { status: u16, body: String },

    /// The image exists in the index but its file is not retrievable.
    #[error("Image unavailable (file key: {file_key})")]
    Unavailable { file_key: String },

    /// The search session never produced enough images.
    #[error("Timed out waiting for images after {attempts} attempts")]
    Timeout { attempts: u32 },

    /// The configured base URL cannot be used to build endpoints.
    #[error("Invalid image service URL: {0}")]
    InvalidUrl(String),
}

impl ImageClient {
    /// Create a client for one search query.
    ///
    /// * `query` - search terms; also the session key on the service.
    /// * `limit` - how many images the session should gather.
    pub fn new(base_url: String, query: String, limit: u32) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
            query,
            limit,
        }
    }

    /// Create a client reusing an existing [`reqwest::Client`].
    pub fn with_client(
        client: reqwest::Client,
        base_url: String,
        query: String,
        limit: u32,
    ) -> Self {
        Self {
            client,
            base_url,
            query,
            limit,
        }
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Build an endpoint URL with percent-encoded path segments.
    fn endpoint(&self, segments: &[&str]) -> Result<reqwest::Url, ImageError> {
        let mut url = reqwest::Url::parse(&self.base_url)
            .map_err(|e| ImageError::InvalidUrl(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| ImageError::InvalidUrl("base URL cannot be a base".into()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Start a gathering session for this client's query.
    ///
    /// Returns the service-side session (conversation) id.
    pub async fn start_search(&self) -> Result<String, ImageError> {
        let response = self
            .client
            .post(self.endpoint(&["quick-search"])?)
            .json(&serde_json::json!({
                "query": self.query,
                "output": "image",
                "limit": self.limit.to_string(),
                "index": "0",
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ImageError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let search: SearchResponse = response.json().await?;
        tracing::debug!(
            query = %self.query,
            session_id = %search.conversation_id,
            "Image search session started",
        );
        Ok(search.conversation_id)
    }

    /// How many images the session has gathered so far.
    pub async fn image_count(&self) -> Result<u32, ImageError> {
        let response = self
            .client
            .get(self.endpoint(&["image-count", &self.query])?)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ImageError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let count: CountResponse = response.json().await?;
        Ok(count.count)
    }

    /// Fetch one gathered image by index.
    ///
    /// The service answers a JSON body (instead of image bytes) when
    /// the file is not retrievable; that is surfaced as
    /// [`ImageError::Unavailable`].
    pub async fn fetch_image(&self, index: u32) -> Result<Vec<u8>, ImageError> {
        let index_param = index.to_string();
        let response = self
            .client
            .get(self.endpoint(&["get-image"])?)
            .query(&[
                ("query", self.query.as_str()),
                ("output", "image"),
                ("index", index_param.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ImageError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let is_json = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.contains("application/json"));

        let bytes = response.bytes().await?;
        if is_json {
            let unavailable: UnavailableResponse =
                serde_json::from_slice(&bytes).unwrap_or(UnavailableResponse { file_key: None });
            return Err(ImageError::Unavailable {
                file_key: unavailable.file_key.unwrap_or_else(|| "<unknown>".into()),
            });
        }

        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_percent_encodes_the_query() {
        let client = ImageClient::new(
            "http://localhost:9000".into(),
            "madrid at night".into(),
            12,
        );
        let url = client.endpoint(&["image-count", client.query()]).unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:9000/image-count/madrid%20at%20night"
        );
    }

    #[test]
    fn endpoint_rejects_unusable_base_url() {
        let client = ImageClient::new("not a url".into(), "q".into(), 1);
        assert!(matches!(
            client.endpoint(&["quick-search"]),
            Err(ImageError::InvalidUrl(_))
        ));
    }

    #[test]
    fn unavailable_error_display_carries_file_key() {
        let err = ImageError::Unavailable {
            file_key: "bucket/abc.jpg".into(),
        };
        assert_eq!(err.to_string(), "Image unavailable (file key: bucket/abc.jpg)");
    }
}
