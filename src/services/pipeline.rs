//! Runs one storage event through validation, fetch and the two
//! conversion branches:
//!
//! `Idle → Validated → Fetched → {Converting-PNG, Converting-GIF} → Done`
//!
//! Every failure is contained where it happens. The PNG and GIF branches run
//! concurrently and never observe each other's outcome, and every path ends
//! in `Done`, which the trigger sees as `{"statusCode": 200}`.

use crate::models::event::{NotificationEvent, StorageEvent};
use crate::models::image::{EncodedImage, TargetFormat};
use crate::models::report::{BranchOutcome, PipelineOutcome, PipelineReport, SkipReason};
use crate::services::converter::Converter;
use crate::services::fetcher::ObjectFetcher;
use crate::services::identifier::{derive_identifier, is_convertible_source};
use crate::services::storage::ObjectStorage;
use crate::services::writer::ObjectWriter;
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use tracing::{Instrument, info, warn};
use uuid::Uuid;

/// Destination bucket per target format. Fixed at startup.
#[derive(Debug, Clone, Serialize)]
pub struct DestinationBinding {
    pub png_bucket: String,
    pub gif_bucket: String,
}

impl DestinationBinding {
    pub fn new(png_bucket: impl Into<String>, gif_bucket: impl Into<String>) -> Self {
        Self {
            png_bucket: png_bucket.into(),
            gif_bucket: gif_bucket.into(),
        }
    }

    pub fn bucket_for(&self, target: TargetFormat) -> &str {
        match target {
            TargetFormat::Png => &self.png_bucket,
            TargetFormat::Gif => &self.gif_bucket,
        }
    }
}

/// Cheap to clone; all collaborators are shared handles.
#[derive(Clone)]
pub struct Pipeline {
    fetcher: ObjectFetcher,
    writer: ObjectWriter,
    converter: Arc<dyn Converter>,
    destinations: Arc<DestinationBinding>,
}

impl Pipeline {
    pub fn new(
        storage: Arc<dyn ObjectStorage>,
        converter: Arc<dyn Converter>,
        destinations: DestinationBinding,
    ) -> Self {
        Self {
            fetcher: ObjectFetcher::new(storage.clone()),
            writer: ObjectWriter::new(storage),
            converter,
            destinations: Arc::new(destinations),
        }
    }

    pub fn destinations(&self) -> &DestinationBinding {
        &self.destinations
    }

    /// Handle a raw notification. Only its first record is processed.
    pub async fn handle_notification(&self, notification: &NotificationEvent) -> PipelineReport {
        match notification.first_record() {
            Some(event) => self.run(&event).await,
            None => {
                warn!("notification carries no records; nothing to do");
                let now = Utc::now();
                PipelineReport {
                    invocation_id: Uuid::new_v4(),
                    bucket: None,
                    key: None,
                    started_at: now,
                    finished_at: now,
                    outcome: PipelineOutcome::Skipped {
                        reason: SkipReason::NoRecord,
                    },
                }
            }
        }
    }

    pub async fn run(&self, event: &StorageEvent) -> PipelineReport {
        let invocation_id = Uuid::new_v4();
        let span = tracing::info_span!(
            "pipeline",
            %invocation_id,
            bucket = %event.bucket_name,
            key = %event.object_key
        );

        let started_at = Utc::now();
        let outcome = self.process(event).instrument(span).await;

        PipelineReport {
            invocation_id,
            bucket: Some(event.bucket_name.clone()),
            key: Some(event.object_key.clone()),
            started_at,
            finished_at: Utc::now(),
            outcome,
        }
    }

    async fn process(&self, event: &StorageEvent) -> PipelineOutcome {
        if !is_convertible_source(&event.object_key) {
            info!("object is not a convertible source; skipping");
            return PipelineOutcome::Skipped {
                reason: SkipReason::NotConvertible,
            };
        }

        let identifier = derive_identifier(&event.object_key);
        tracing::debug!(
            base_name = %identifier.base_name,
            source_format = %identifier.source_format,
            "derived output identifier"
        );

        let Some(source) = self
            .fetcher
            .fetch_encoded(&event.bucket_name, &event.object_key)
            .await
        else {
            return PipelineOutcome::FetchFailed;
        };

        let (png, gif) = futures::join!(
            self.convert_and_store(TargetFormat::Png, &identifier.base_name, &source),
            self.convert_and_store(TargetFormat::Gif, &identifier.base_name, &source),
        );

        info!(
            png_stored = png.is_stored(),
            gif_stored = gif.is_stored(),
            "pipeline finished"
        );
        PipelineOutcome::Converted { png, gif }
    }

    /// One conversion branch: convert, then write into the format's bucket.
    async fn convert_and_store(
        &self,
        target: TargetFormat,
        base_name: &str,
        source: &EncodedImage,
    ) -> BranchOutcome {
        let bucket = self.destinations.bucket_for(target);
        let key = target.output_key(base_name);

        let body = match self.converter.convert(target, source).await {
            Ok(body) => body,
            Err(err) => {
                tracing::error!(format = %target, error = %err, "conversion failed");
                return BranchOutcome::ConversionFailed {
                    error: err.to_string(),
                };
            }
        };

        let size_bytes = body.len();
        if self.writer.write_object(bucket, &key, body).await {
            BranchOutcome::Stored {
                bucket: bucket.to_string(),
                key,
                size_bytes,
            }
        } else {
            BranchOutcome::WriteFailed {
                bucket: bucket.to_string(),
                key,
            }
        }
    }
}
