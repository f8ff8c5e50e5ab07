//! Object storage abstraction used by the fetcher and the writer.
//!
//! Two backends exist: a local disk layout for development and tests, and
//! S3 through `object_store`. Both are built once at startup and shared
//! behind an `Arc<dyn ObjectStorage>`.

pub mod local;
pub mod s3;

use crate::config::AppConfig;
use async_trait::async_trait;
use bytes::Bytes;
use clap::ValueEnum;
use serde::Serialize;
use std::{io, sync::Arc};
use thiserror::Error;

pub use local::LocalObjectStorage;
pub use s3::S3ObjectStorage;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("bucket `{name}` invalid: {reason}")]
    InvalidBucketName { name: String, reason: String },
    #[error("object `{key}` not found in bucket `{bucket}`")]
    ObjectNotFound { bucket: String, key: String },
    #[error("invalid object key")]
    InvalidObjectKey,
    #[error("storage backend error: {0}")]
    Backend(String),
    #[error("storage configuration error: {0}")]
    Config(String),
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Local,
    S3,
}

/// Bucket-addressed get/put. Implementations must be safe to share across
/// invocations and across the concurrent conversion branches.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Read an object's full body.
    async fn get_object(&self, bucket: &str, key: &str) -> StorageResult<Bytes>;

    /// Store `body` verbatim under `bucket`/`key`, replacing any existing object.
    async fn put_object(&self, bucket: &str, key: &str, body: Bytes) -> StorageResult<()>;

    /// Cheap reachability check used by the readiness endpoint.
    async fn probe(&self) -> StorageResult<()>;

    fn backend(&self) -> StorageBackend;
}

/// Build the configured backend.
pub async fn create_storage(cfg: &AppConfig) -> StorageResult<Arc<dyn ObjectStorage>> {
    match cfg.storage_backend {
        StorageBackend::Local => {
            let storage = LocalObjectStorage::new(&cfg.storage_dir);
            storage.probe().await?;
            tracing::info!("Using local object storage at {}", cfg.storage_dir);
            Ok(Arc::new(storage))
        }
        StorageBackend::S3 => {
            let storage = S3ObjectStorage::new(cfg.s3_region.clone(), cfg.s3_endpoint.clone());
            tracing::info!(
                region = %cfg.s3_region,
                endpoint = ?cfg.s3_endpoint,
                "Using S3 object storage"
            );
            Ok(Arc::new(storage))
        }
    }
}
