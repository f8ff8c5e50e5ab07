//! Loads a source object and encodes it for transport.

use crate::models::image::EncodedImage;
use crate::services::storage::ObjectStorage;
use std::sync::Arc;

#[derive(Clone)]
pub struct ObjectFetcher {
    storage: Arc<dyn ObjectStorage>,
}

impl ObjectFetcher {
    pub fn new(storage: Arc<dyn ObjectStorage>) -> Self {
        Self { storage }
    }

    /// Fail-soft: any storage error is logged and reported as `None`.
    pub async fn fetch_encoded(&self, bucket: &str, key: &str) -> Option<EncodedImage> {
        match self.storage.get_object(bucket, key).await {
            Ok(body) => {
                let encoded = EncodedImage::encode(&body);
                tracing::info!(
                    bucket = %bucket,
                    key = %key,
                    size_bytes = body.len(),
                    encoded_len = encoded.len(),
                    "fetched source object"
                );
                Some(encoded)
            }
            Err(err) => {
                tracing::error!(
                    bucket = %bucket,
                    key = %key,
                    error = %err,
                    "failed to fetch source object"
                );
                None
            }
        }
    }
}
