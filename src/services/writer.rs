//! Persists converted bytes into a destination bucket.

use crate::services::storage::ObjectStorage;
use bytes::Bytes;
use std::sync::Arc;

#[derive(Clone)]
pub struct ObjectWriter {
    storage: Arc<dyn ObjectStorage>,
}

impl ObjectWriter {
    pub fn new(storage: Arc<dyn ObjectStorage>) -> Self {
        Self { storage }
    }

    /// Fail-soft upload. Returns whether the object was stored; errors are
    /// logged here and never raised.
    pub async fn write_object(&self, bucket: &str, key: &str, body: Bytes) -> bool {
        let size = body.len();
        match self.storage.put_object(bucket, key, body).await {
            Ok(()) => {
                tracing::info!(bucket = %bucket, key = %key, size_bytes = size, "stored converted object");
                true
            }
            Err(err) => {
                tracing::error!(
                    bucket = %bucket,
                    key = %key,
                    error = %err,
                    "failed to store converted object"
                );
                false
            }
        }
    }
}
