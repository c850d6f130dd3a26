//! Best-effort product image caching
//!
//! Copies a resolved record's image into the local blob store, keyed by
//! barcode. Runs as a fire-and-forget task with its own error boundary;
//! failure never affects the primary cache write.

use std::sync::Arc;
use std::time::Duration;

use crate::cache::store::BlobStore;

pub struct ImageCacher {
    http_client: Option<reqwest::Client>,
    blobs: Arc<BlobStore>,
}

impl ImageCacher {
    pub fn new(user_agent: &str, timeout: Duration, blobs: Arc<BlobStore>) -> Self {
        let http_client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .ok();

        Self { http_client, blobs }
    }

    /// Download and store the image for the given barcode. Already-cached
    /// images are not re-fetched.
    pub async fn cache_image(&self, barcode: &str, image_url: &str) {
        let Some(client) = &self.http_client else {
            return;
        };

        if self.blobs.has_blob(barcode).await {
            return;
        }

        let bytes = match client.get(image_url).send().await {
            Ok(response) if response.status().is_success() => match response.bytes().await {
                Ok(bytes) => bytes,
                Err(e) => {
                    tracing::debug!(barcode, error = %e, "Image body read failed");
                    return;
                }
            },
            Ok(response) => {
                tracing::debug!(barcode, status = %response.status(), "Image fetch failed");
                return;
            }
            Err(e) => {
                tracing::debug!(barcode, error = %e, "Image fetch failed");
                return;
            }
        };

        if let Err(e) = self.blobs.put_blob(barcode, &bytes).await {
            tracing::debug!(barcode, error = %e, "Image blob write failed");
        } else {
            tracing::debug!(barcode, size = bytes.len(), "Cached product image");
        }
    }
}
