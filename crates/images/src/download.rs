//! Bounded count polling and tolerant batch download.

use std::time::Duration;

use crate::client::{ImageClient, ImageError};

/// Tuning for [`wait_for_images`].
#[derive(Debug, Clone)]
pub struct WaitConfig {
    /// Count queries before giving up.
    pub retries: u32,
    /// Pause between count queries.
    pub interval: Duration,
    /// Minimum number of gathered images to wait for.
    pub min_count: u32,
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            retries: 5 * 60,
            interval: Duration::from_secs(1),
            min_count: 1,
        }
    }
}

/// Poll the count endpoint until at least `min_count` images exist.
///
/// Returns the observed count, or [`ImageError::Timeout`] after
/// `retries` queries.
pub async fn wait_for_images(client: &ImageClient, config: &WaitConfig) -> Result<u32, ImageError> {
    for attempt in 0..config.retries {
        let count = client.image_count().await?;
        if count >= config.min_count {
            tracing::debug!(query = %client.query(), count, "Enough images gathered");
            return Ok(count);
        }
        tracing::debug!(
            query = %client.query(),
            attempt = attempt + 1,
            count,
            min_count = config.min_count,
            "Not enough images yet",
        );
        tokio::time::sleep(config.interval).await;
    }

    Err(ImageError::Timeout {
        attempts: config.retries,
    })
}

/// Start a session, wait for the client's full limit to gather, then
/// fetch every image.
///
/// Individual fetch failures are logged and skipped — a missing image
/// must not sink the whole batch. The returned buffers preserve index
/// order of the successful fetches.
pub async fn download_all(
    client: &ImageClient,
    config: &WaitConfig,
) -> Result<Vec<Vec<u8>>, ImageError> {
    client.start_search().await?;

    let wait = WaitConfig {
        min_count: client.limit(),
        ..config.clone()
    };
    wait_for_images(client, &wait).await?;

    let count = client.image_count().await?;
    let total = client.limit().min(count);

    let mut images = Vec::with_capacity(total as usize);
    for index in 0..total {
        match client.fetch_image(index).await {
            Ok(bytes) => images.push(bytes),
            Err(e) => {
                tracing::warn!(
                    query = %client.query(),
                    index,
                    error = %e,
                    "Skipping image that failed to download",
                );
            }
        }
    }

    tracing::info!(
        query = %client.query(),
        downloaded = images.len(),
        requested = total,
        "Image batch downloaded",
    );
    Ok(images)
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    use axum::extract::{Query, State};
    use axum::http::header;
    use axum::response::IntoResponse;
    use axum::routing::{get, post};
    use axum::{Json, Router};

    /// Mock image service: the count endpoint grows by one per query,
    /// and `get-image` answers JSON-unavailable for index 1.
    async fn spawn_service() -> String {
        let hits = Arc::new(AtomicU32::new(0));

        async fn count(State(hits): State<Arc<AtomicU32>>) -> Json<serde_json::Value> {
            let n = hits.fetch_add(1, Ordering::SeqCst) + 1;
            Json(serde_json::json!({ "count": n }))
        }

        async fn image(
            Query(params): Query<std::collections::HashMap<String, String>>,
        ) -> axum::response::Response {
            if params.get("index").map(String::as_str) == Some("1") {
                return (
                    [(header::CONTENT_TYPE, "application/json")],
                    r#"{"fileKey":"missing.jpg"}"#,
                )
                    .into_response();
            }
            ([(header::CONTENT_TYPE, "image/jpeg")], vec![0xFFu8, 0xD8]).into_response()
        }

        let app = Router::new()
            .route(
                "/quick-search",
                post(|| async { Json(serde_json::json!({ "conversationId": "conv-1" })) }),
            )
            .route("/image-count/{query}", get(count))
            .route("/get-image", get(image))
            .with_state(hits);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        format!("http://{addr}")
    }

    fn fast_wait(retries: u32) -> WaitConfig {
        WaitConfig {
            retries,
            interval: Duration::from_millis(5),
            min_count: 1,
        }
    }

    #[tokio::test]
    async fn wait_returns_once_count_is_reached() {
        let url = spawn_service().await;
        let client = ImageClient::new(url, "city lights".into(), 3);

        let config = WaitConfig {
            min_count: 3,
            ..fast_wait(10)
        };
        let count = wait_for_images(&client, &config).await.unwrap();
        assert!(count >= 3);
    }

    #[tokio::test]
    async fn wait_times_out_when_count_stalls() {
        let url = spawn_service().await;
        let client = ImageClient::new(url, "city lights".into(), 3);

        // The mock grows by one per query; demanding 100 within 2
        // retries cannot succeed.
        let config = WaitConfig {
            min_count: 100,
            ..fast_wait(2)
        };
        let result = wait_for_images(&client, &config).await;
        assert!(matches!(result, Err(ImageError::Timeout { attempts: 2 })));
    }

    #[tokio::test]
    async fn download_all_skips_unavailable_images() {
        let url = spawn_service().await;
        let client = ImageClient::new(url, "city lights".into(), 3);

        let images = download_all(&client, &fast_wait(20)).await.unwrap();
        // Index 1 answers JSON-unavailable and is skipped.
        assert_eq!(images.len(), 2);
        assert!(images.iter().all(|img| img == &vec![0xFFu8, 0xD8]));
    }

    #[tokio::test]
    async fn fetch_image_surfaces_unavailable_file_key() {
        let url = spawn_service().await;
        let client = ImageClient::new(url, "city lights".into(), 3);

        let result = client.fetch_image(1).await;
        match result {
            Err(ImageError::Unavailable { file_key }) => assert_eq!(file_key, "missing.jpg"),
            other => panic!("Expected Unavailable, got {other:?}"),
        }
    }
}
