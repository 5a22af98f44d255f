//! Read-side views over releases

use crate::{
    AuditEntry, BatchRelease, CheckpointStatus, FacilityId, ProcessingBatch, ReleaseId,
    ReleaseLineage, ReleaseStatus, ReleaseTemplate, TemplateId,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Selects releases for listing
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ReleaseFilter {
    pub facility_id: Option<FacilityId>,
    pub status: Option<ReleaseStatus>,
}

impl ReleaseFilter {
    pub fn facility(facility_id: FacilityId) -> Self {
        Self {
            facility_id: Some(facility_id),
            status: None,
        }
    }

    pub fn with_status(mut self, status: ReleaseStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn matches(&self, release: &BatchRelease) -> bool {
        self.facility_id.map_or(true, |f| release.facility_id == f)
            && self.status.map_or(true, |s| release.status == s)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointProgress {
    pub total_checkpoints: usize,
    /// Passed or skipped
    pub completed_checkpoints: usize,
    pub failed_checkpoints: usize,
}

impl CheckpointProgress {
    pub fn of(release: &BatchRelease) -> Self {
        let mut progress = Self {
            total_checkpoints: release.checkpoints.len(),
            ..Self::default()
        };
        for checkpoint in &release.checkpoints {
            match checkpoint.status {
                CheckpointStatus::Passed | CheckpointStatus::Skipped => {
                    progress.completed_checkpoints += 1
                }
                CheckpointStatus::Failed => progress.failed_checkpoints += 1,
                CheckpointStatus::Pending => {}
            }
        }
        progress
    }
}

/// One row of the release listing
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReleaseSummary {
    pub id: ReleaseId,
    pub release_number: String,
    pub status: ReleaseStatus,
    pub facility_id: FacilityId,
    pub template_id: TemplateId,
    pub lineage: ReleaseLineage,
    pub initiated_at: DateTime<Utc>,
    pub target_completion_date: DateTime<Utc>,
    pub actual_completion_date: Option<DateTime<Utc>>,
    pub checkpoint_progress: CheckpointProgress,
}

impl From<&BatchRelease> for ReleaseSummary {
    fn from(release: &BatchRelease) -> Self {
        Self {
            id: release.id,
            release_number: release.release_number.clone(),
            status: release.status,
            facility_id: release.facility_id,
            template_id: release.template_id,
            lineage: release.lineage.clone(),
            initiated_at: release.initiated_at,
            target_completion_date: release.target_completion_date,
            actual_completion_date: release.actual_completion_date,
            checkpoint_progress: CheckpointProgress::of(release),
        }
    }
}

/// A release with everything it references
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReleaseDetail {
    #[serde(flatten)]
    pub release: BatchRelease,
    pub template: ReleaseTemplate,
    pub processing_batch: ProcessingBatch,
    pub audit_log: Vec<AuditEntry>,
}

/// Time range for stats aggregation, counted back from now
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsWindow {
    pub days: u32,
}

impl StatsWindow {
    pub fn days(days: u32) -> Self {
        Self { days }
    }

    pub fn contains(&self, now: DateTime<Utc>, at: DateTime<Utc>) -> bool {
        let start = now - chrono::Duration::days(i64::from(self.days));
        at >= start && at <= now
    }
}

impl Default for StatsWindow {
    fn default() -> Self {
        Self { days: 30 }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StatusStats {
    pub status: ReleaseStatus,
    pub count: usize,
    /// None when no release of this status has a terminal timestamp
    pub avg_duration_hours: Option<f64>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReleaseStats {
    pub by_status: Vec<StatusStats>,
    pub total_releases: usize,
    pub avg_checkpoint_completion_hours: Option<f64>,
    pub time_range_days: u32,
}
