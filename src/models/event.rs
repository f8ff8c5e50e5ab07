//! Object-created notification as delivered by the storage trigger.

use serde::Deserialize;

/// Full notification envelope. Only the first record is ever processed.
#[derive(Debug, Clone, Deserialize)]
pub struct NotificationEvent {
    #[serde(rename = "Records", default)]
    pub records: Vec<NotificationRecord>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NotificationRecord {
    pub s3: StorageEntity,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageEntity {
    pub bucket: BucketEntity,
    pub object: ObjectEntity,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BucketEntity {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ObjectEntity {
    pub key: String,
}

/// The bucket/key pair a single pipeline run works on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageEvent {
    pub bucket_name: String,
    pub object_key: String,
}

impl StorageEvent {
    pub fn new(bucket_name: impl Into<String>, object_key: impl Into<String>) -> Self {
        Self {
            bucket_name: bucket_name.into(),
            object_key: object_key.into(),
        }
    }
}

impl NotificationEvent {
    /// Extract the first record; additional records are ignored.
    pub fn first_record(&self) -> Option<StorageEvent> {
        if self.records.len() > 1 {
            tracing::debug!(
                ignored = self.records.len() - 1,
                "notification carries extra records; only the first is processed"
            );
        }

        self.records.first().map(|record| {
            StorageEvent::new(
                record.s3.bucket.name.clone(),
                record.s3.object.key.clone(),
            )
        })
    }
}
