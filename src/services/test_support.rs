//! In-memory storage and a stub converter that record every call.

use crate::models::image::{EncodedImage, TargetFormat};
use crate::services::converter::{ConversionError, Converter};
use crate::services::storage::{ObjectStorage, StorageBackend, StorageError, StorageResult};
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

type ObjectId = (String, String);

#[derive(Default)]
pub struct RecordingStorage {
    objects: Mutex<HashMap<ObjectId, Vec<u8>>>,
    gets: Mutex<Vec<ObjectId>>,
    puts: Mutex<Vec<(String, String, Vec<u8>)>>,
    put_attempts: Mutex<Vec<ObjectId>>,
    fail_gets: AtomicBool,
    failing_put_buckets: Mutex<HashSet<String>>,
}

impl RecordingStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Place an object without recording a call.
    pub fn seed(&self, bucket: &str, key: &str, body: &[u8]) {
        self.objects
            .lock()
            .unwrap()
            .insert((bucket.to_string(), key.to_string()), body.to_vec());
    }

    pub fn fail_gets(&self) {
        self.fail_gets.store(true, Ordering::SeqCst);
    }

    pub fn fail_puts_to(&self, bucket: &str) {
        self.failing_put_buckets
            .lock()
            .unwrap()
            .insert(bucket.to_string());
    }

    pub fn gets(&self) -> Vec<ObjectId> {
        self.gets.lock().unwrap().clone()
    }

    /// Successful puts, sorted so concurrent branches compare deterministically.
    pub fn puts(&self) -> Vec<(String, String, Vec<u8>)> {
        let mut puts = self.puts.lock().unwrap().clone();
        puts.sort();
        puts
    }

    pub fn put_attempts(&self) -> usize {
        self.put_attempts.lock().unwrap().len()
    }
}

#[async_trait]
impl ObjectStorage for RecordingStorage {
    async fn get_object(&self, bucket: &str, key: &str) -> StorageResult<Bytes> {
        let id = (bucket.to_string(), key.to_string());
        self.gets.lock().unwrap().push(id.clone());

        if self.fail_gets.load(Ordering::SeqCst) {
            return Err(StorageError::Backend("access denied".into()));
        }

        self.objects
            .lock()
            .unwrap()
            .get(&id)
            .map(|body| Bytes::from(body.clone()))
            .ok_or_else(|| StorageError::ObjectNotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            })
    }

    async fn put_object(&self, bucket: &str, key: &str, body: Bytes) -> StorageResult<()> {
        self.put_attempts
            .lock()
            .unwrap()
            .push((bucket.to_string(), key.to_string()));

        if self.failing_put_buckets.lock().unwrap().contains(bucket) {
            return Err(StorageError::Backend("bucket unavailable".into()));
        }

        self.puts
            .lock()
            .unwrap()
            .push((bucket.to_string(), key.to_string(), body.to_vec()));
        self.seed(bucket, key, &body);
        Ok(())
    }

    async fn probe(&self) -> StorageResult<()> {
        Ok(())
    }

    fn backend(&self) -> StorageBackend {
        StorageBackend::Local
    }
}

/// Converter returning a fixed payload or failure per target format.
#[derive(Default)]
pub struct StubConverter {
    results: HashMap<TargetFormat, Result<Vec<u8>, String>>,
    calls: Mutex<Vec<(TargetFormat, EncodedImage)>>,
}

impl StubConverter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn succeed(mut self, target: TargetFormat, payload: &[u8]) -> Self {
        self.results.insert(target, Ok(payload.to_vec()));
        self
    }

    pub fn fail(mut self, target: TargetFormat, message: &str) -> Self {
        self.results.insert(target, Err(message.to_string()));
        self
    }

    pub fn calls(&self) -> Vec<(TargetFormat, EncodedImage)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Converter for StubConverter {
    async fn convert(
        &self,
        target: TargetFormat,
        source: &EncodedImage,
    ) -> Result<Bytes, ConversionError> {
        self.calls.lock().unwrap().push((target, source.clone()));

        match self.results.get(&target) {
            Some(Ok(payload)) => Ok(Bytes::from(payload.clone())),
            Some(Err(message)) => Err(ConversionError::MalformedResponse(message.clone())),
            None => Err(ConversionError::MissingFile),
        }
    }
}
