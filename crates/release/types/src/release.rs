//! The batch release aggregate
//!
//! A `BatchRelease` exclusively owns its checkpoint results, approvals and
//! attached documents. Its status is a pure function of those collections
//! plus the manual hold/reject records (see [`BatchRelease::derived_status`]).

use crate::{
    ApprovalId, ApprovalStatus, CheckpointResultId, CheckpointStatus, CheckpointType,
    ComplianceDocument, FacilityId, ProcessingBatchId, ProcessingType, ProductType, ReleaseId,
    ReleaseStatus, Role, TemplateId, UserId,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lineage captured from the batch and template at initiation
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReleaseLineage {
    pub processing_batch_number: String,
    pub processing_type: ProcessingType,
    pub product_type: ProductType,
    pub strain_name: Option<String>,
    pub room_name: Option<String>,
    pub template_name: String,
    pub template_version: u32,
    /// Batch output weight at initiation, in grams
    pub expected_weight: f64,
}

/// Present while a release is on hold
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HoldRecord {
    pub reason: String,
    pub held_by: UserId,
    pub held_at: DateTime<Utc>,
    /// Status the release had when it was held; informational, resume
    /// recomputes the status from checkpoints and approvals.
    pub prior_status: ReleaseStatus,
}

/// Present once a release was rejected by hand
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RejectionRecord {
    pub reason: String,
    pub rejected_by: UserId,
    pub rejected_at: DateTime<Utc>,
}

/// Outcome of one checkpoint inside a release
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CheckpointResult {
    pub id: CheckpointResultId,
    pub release_id: ReleaseId,
    pub checkpoint_type: CheckpointType,
    pub name: String,
    pub order_sequence: u32,
    pub required: bool,
    pub status: CheckpointStatus,
    pub inspector: Option<UserId>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Structured payload whose schema depends on the checkpoint type
    pub inspection_data: Option<serde_json::Value>,
    pub notes: Option<String>,
}

impl CheckpointResult {
    pub fn is_started(&self) -> bool {
        self.started_at.is_some()
    }
}

/// A role-gated sign-off inside a release
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Approval {
    pub id: ApprovalId,
    pub release_id: ReleaseId,
    pub approval_level: String,
    pub required_role: Role,
    pub approver: Option<UserId>,
    pub status: ApprovalStatus,
    pub order_sequence: u32,
    pub requested_at: Option<DateTime<Utc>>,
    pub responded_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

/// The release aggregate
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BatchRelease {
    pub id: ReleaseId,
    pub release_number: String,
    pub facility_id: FacilityId,
    pub template_id: TemplateId,
    pub processing_batch_id: ProcessingBatchId,
    pub lineage: ReleaseLineage,
    /// Cached copy of [`BatchRelease::derived_status`], refreshed on every commit
    pub status: ReleaseStatus,
    pub initiated_by: UserId,
    pub initiated_at: DateTime<Utc>,
    pub target_completion_date: DateTime<Utc>,
    /// Set only by a successful finalize
    pub actual_completion_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub checkpoints: Vec<CheckpointResult>,
    pub approvals: Vec<Approval>,
    pub documents: Vec<ComplianceDocument>,
    pub hold: Option<HoldRecord>,
    pub rejection: Option<RejectionRecord>,
    /// First time the release became approved
    pub approved_at: Option<DateTime<Utc>>,
    /// Time the release became terminal
    pub closed_at: Option<DateTime<Utc>>,
    pub actual_weight: Option<f64>,
    pub weight_variance_pct: Option<f64>,
    pub released_by: Option<UserId>,
    /// Bumped by every accepted mutation
    pub version: u64,
    /// Hash of the newest audit entry of this release
    pub audit_head: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl BatchRelease {
    // ── Lookups ─────────────────────────────────────────────────────────

    pub fn checkpoint(&self, id: CheckpointResultId) -> Option<&CheckpointResult> {
        self.checkpoints.iter().find(|c| c.id == id)
    }

    pub fn checkpoint_mut(&mut self, id: CheckpointResultId) -> Option<&mut CheckpointResult> {
        self.checkpoints.iter_mut().find(|c| c.id == id)
    }

    pub fn approval(&self, id: ApprovalId) -> Option<&Approval> {
        self.approvals.iter().find(|a| a.id == id)
    }

    pub fn approval_mut(&mut self, id: ApprovalId) -> Option<&mut Approval> {
        self.approvals.iter_mut().find(|a| a.id == id)
    }

    /// The lowest-order required checkpoint below `order` that is neither
    /// passed nor skipped, if any.
    pub fn gating_blocker(&self, order: u32) -> Option<&CheckpointResult> {
        self.checkpoints
            .iter()
            .filter(|c| c.required && c.order_sequence < order && !c.status.is_resolved())
            .min_by_key(|c| c.order_sequence)
    }

    // ── Status derivation ───────────────────────────────────────────────

    /// Whether any checkpoint or approval has been touched
    pub fn has_activity(&self) -> bool {
        self.checkpoints
            .iter()
            .any(|c| c.is_started() || c.status.is_decided())
            || self
                .approvals
                .iter()
                .any(|a| a.requested_at.is_some() || a.status.is_decided())
    }

    pub fn is_held(&self) -> bool {
        self.hold.is_some()
    }

    /// Status as a pure function of the aggregate's contents.
    ///
    /// Finalization wins over everything, then rejection (manual, a failed
    /// required checkpoint or any rejected approval), then an explicit hold.
    /// Otherwise a release is approved once every required checkpoint is
    /// passed or skipped and every approval is granted, in progress once
    /// anything has been touched, and pending before that.
    pub fn derived_status(&self) -> ReleaseStatus {
        if self.actual_completion_date.is_some() {
            return ReleaseStatus::Released;
        }

        let required_failed = self
            .checkpoints
            .iter()
            .any(|c| c.required && c.status == CheckpointStatus::Failed);
        let approval_rejected = self
            .approvals
            .iter()
            .any(|a| a.status == ApprovalStatus::Rejected);
        if self.rejection.is_some() || required_failed || approval_rejected {
            return ReleaseStatus::Rejected;
        }

        if self.hold.is_some() {
            return ReleaseStatus::OnHold;
        }

        if !self.has_activity() {
            return ReleaseStatus::Pending;
        }

        let checkpoints_clear = self
            .checkpoints
            .iter()
            .filter(|c| c.required)
            .all(|c| c.status.is_resolved());
        let approvals_granted = self
            .approvals
            .iter()
            .all(|a| a.status == ApprovalStatus::Approved);

        if checkpoints_clear && approvals_granted {
            ReleaseStatus::Approved
        } else {
            ReleaseStatus::InProgress
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.derived_status().is_terminal()
    }
}
