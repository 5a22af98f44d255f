//! Processing batches as seen by the release workflow
//!
//! The processing ledger owns these records; the release engine only reads
//! them to validate initiation and to snapshot lineage.

use crate::{FacilityId, ProcessingBatchId, ProductType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The processing step that produced a batch
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingType {
    Drying,
    Curing,
    Trimming,
    Packaging,
}

impl std::fmt::Display for ProcessingType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Drying => "drying",
            Self::Curing => "curing",
            Self::Trimming => "trimming",
            Self::Packaging => "packaging",
        };
        f.write_str(s)
    }
}

/// Lifecycle of a processing batch. Never reverts once `completed`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingBatchStatus {
    Planned,
    InProgress,
    Completed,
    ReadyForRelease,
    Released,
}

impl ProcessingBatchStatus {
    pub fn is_releasable(&self) -> bool {
        matches!(self, Self::Completed | Self::ReadyForRelease)
    }
}

impl std::fmt::Display for ProcessingBatchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Planned => "planned",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::ReadyForRelease => "ready_for_release",
            Self::Released => "released",
        };
        f.write_str(s)
    }
}

/// A finished processing record
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProcessingBatch {
    pub id: ProcessingBatchId,
    pub processing_batch_number: String,
    pub facility_id: FacilityId,
    pub processing_type: ProcessingType,
    pub product_type: ProductType,
    pub status: ProcessingBatchStatus,
    /// Output weight in grams
    pub output_weight: f64,
    #[serde(default)]
    pub source_batch_number: Option<String>,
    #[serde(default)]
    pub strain_name: Option<String>,
    #[serde(default)]
    pub room_name: Option<String>,
    #[serde(default)]
    pub actual_completion_date: Option<DateTime<Utc>>,
}

impl ProcessingBatch {
    pub fn is_releasable(&self) -> bool {
        self.status.is_releasable()
    }
}
