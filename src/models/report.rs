//! Trigger response and the structured per-invocation report.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// What the trigger sees. Always `{"statusCode": 200}` once an event was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TriggerResponse {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
}

impl TriggerResponse {
    pub fn handled() -> Self {
        Self { status_code: 200 }
    }
}

/// Detailed record of one pipeline run. Never changes the trigger response.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub invocation_id: Uuid,
    pub bucket: Option<String>,
    pub key: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub outcome: PipelineOutcome,
}

impl PipelineReport {
    pub fn trigger_response(&self) -> TriggerResponse {
        TriggerResponse::handled()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PipelineOutcome {
    Skipped { reason: SkipReason },
    FetchFailed,
    Converted { png: BranchOutcome, gif: BranchOutcome },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    NoRecord,
    NotConvertible,
}

/// Result of one convert-and-write branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BranchOutcome {
    Stored {
        bucket: String,
        key: String,
        size_bytes: usize,
    },
    ConversionFailed {
        error: String,
    },
    WriteFailed {
        bucket: String,
        key: String,
    },
}

impl BranchOutcome {
    pub fn is_stored(&self) -> bool {
        matches!(self, BranchOutcome::Stored { .. })
    }
}
