//! S3 backend built on `object_store`.
//!
//! `AmazonS3` is bound to a single bucket, so one store is built per bucket
//! on first use and reused afterwards. Credentials come from the standard
//! AWS environment variables.

use super::{ObjectStorage, StorageBackend, StorageError, StorageResult};
use async_trait::async_trait;
use bytes::Bytes;
use object_store::Error as ObjectStoreError;
use object_store::aws::{AmazonS3, AmazonS3Builder};
use object_store::path::Path;
use object_store::{ObjectStoreExt, PutPayload};
use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
    time::Instant,
};

pub struct S3ObjectStorage {
    region: String,
    endpoint_url: Option<String>,
    stores: RwLock<HashMap<String, Arc<AmazonS3>>>,
}

impl S3ObjectStorage {
    /// `endpoint_url` targets S3-compatible providers (e.g. MinIO at `http://localhost:9000`).
    pub fn new(region: String, endpoint_url: Option<String>) -> Self {
        Self {
            region,
            endpoint_url,
            stores: RwLock::new(HashMap::new()),
        }
    }

    fn build_store(&self, bucket: &str) -> StorageResult<AmazonS3> {
        let mut builder = AmazonS3Builder::from_env()
            .with_region(self.region.clone())
            .with_bucket_name(bucket);

        if let Some(endpoint) = &self.endpoint_url {
            builder = builder
                .with_endpoint(endpoint.clone())
                .with_allow_http(endpoint.starts_with("http://"));
        }

        builder
            .build()
            .map_err(|e| StorageError::Config(e.to_string()))
    }

    fn store_for(&self, bucket: &str) -> StorageResult<Arc<AmazonS3>> {
        let cached = self
            .stores
            .read()
            .map_err(|_| StorageError::Backend("store cache lock poisoned".into()))?
            .get(bucket)
            .cloned();
        if let Some(store) = cached {
            return Ok(store);
        }

        let store = Arc::new(self.build_store(bucket)?);
        let mut stores = self
            .stores
            .write()
            .map_err(|_| StorageError::Backend("store cache lock poisoned".into()))?;
        Ok(stores.entry(bucket.to_string()).or_insert(store).clone())
    }
}

/// Map an event key to an S3 path without re-encoding it.
fn object_location(key: &str) -> StorageResult<Path> {
    Path::parse(key).map_err(|_| StorageError::InvalidObjectKey)
}

#[async_trait]
impl ObjectStorage for S3ObjectStorage {
    async fn get_object(&self, bucket: &str, key: &str) -> StorageResult<Bytes> {
        let store = self.store_for(bucket)?;
        let location = object_location(key)?;
        let start = Instant::now();

        let result = store.get(&location).await.map_err(|e| match e {
            ObjectStoreError::NotFound { .. } => StorageError::ObjectNotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            },
            other => StorageError::Backend(other.to_string()),
        })?;

        let body = result
            .bytes()
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        tracing::debug!(
            bucket = %bucket,
            key = %key,
            size_bytes = body.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 get successful"
        );
        Ok(body)
    }

    async fn put_object(&self, bucket: &str, key: &str, body: Bytes) -> StorageResult<()> {
        let store = self.store_for(bucket)?;
        let location = object_location(key)?;
        let size = body.len();
        let start = Instant::now();

        store
            .put(&location, PutPayload::from(body))
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        tracing::debug!(
            bucket = %bucket,
            key = %key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 put successful"
        );
        Ok(())
    }

    /// The backend holds no bucket until an event names one, so readiness only
    /// checks that a store can be configured from the environment.
    async fn probe(&self) -> StorageResult<()> {
        self.build_store("readiness-probe").map(|_| ())
    }

    fn backend(&self) -> StorageBackend {
        StorageBackend::S3
    }
}
