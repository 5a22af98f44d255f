//! Audit entries
//!
//! Every accepted mutation of a release produces exactly one entry. Entries
//! of a release form a hash chain: each carries the hash of its predecessor
//! and a blake3 hash over its own canonical JSON form.

use crate::{AuditEntryId, ReleaseError, ReleaseId, ReleaseResult, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Enumerated audit actions
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    ReleaseInitiated,
    CheckpointStarted,
    CheckpointCompleted,
    ApprovalRequested,
    ApprovalResponded,
    ReleaseHeld,
    ReleaseResumed,
    ReleaseRejected,
    ReleaseCompleted,
    DocumentGenerated,
    EntryCorrected,
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::ReleaseInitiated => "release_initiated",
            Self::CheckpointStarted => "checkpoint_started",
            Self::CheckpointCompleted => "checkpoint_completed",
            Self::ApprovalRequested => "approval_requested",
            Self::ApprovalResponded => "approval_responded",
            Self::ReleaseHeld => "release_held",
            Self::ReleaseResumed => "release_resumed",
            Self::ReleaseRejected => "release_rejected",
            Self::ReleaseCompleted => "release_completed",
            Self::DocumentGenerated => "document_generated",
            Self::EntryCorrected => "entry_corrected",
        };
        f.write_str(s)
    }
}

/// The kind of record an audit entry touched
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEntityType {
    BatchRelease,
    CheckpointResult,
    Approval,
    ComplianceDocument,
    AuditEntry,
}

/// Reference to the touched record
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntity {
    pub entity_type: AuditEntityType,
    pub entity_id: u64,
}

impl AuditEntity {
    pub fn release(id: ReleaseId) -> Self {
        Self {
            entity_type: AuditEntityType::BatchRelease,
            entity_id: id.value(),
        }
    }

    pub fn new(entity_type: AuditEntityType, entity_id: u64) -> Self {
        Self {
            entity_type,
            entity_id,
        }
    }
}

/// One immutable audit record
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: AuditEntryId,
    pub release_id: ReleaseId,
    pub actor: UserId,
    pub action: AuditAction,
    #[serde(flatten)]
    pub entity: AuditEntity,
    pub old_values: Option<serde_json::Value>,
    pub new_values: Option<serde_json::Value>,
    pub notes: Option<String>,
    /// Entry this one corrects
    pub corrects: Option<AuditEntryId>,
    pub timestamp: DateTime<Utc>,
    pub previous_hash: Option<String>,
    pub hash: String,
}

impl AuditEntry {
    /// Build an unsealed entry. The engine seals it against the release's
    /// audit head right before committing.
    pub fn new(
        id: AuditEntryId,
        release_id: ReleaseId,
        actor: UserId,
        action: AuditAction,
        entity: AuditEntity,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            release_id,
            actor,
            action,
            entity,
            old_values: None,
            new_values: None,
            notes: None,
            corrects: None,
            timestamp,
            previous_hash: None,
            hash: String::new(),
        }
    }

    pub fn with_old_values(mut self, values: serde_json::Value) -> Self {
        self.old_values = Some(values);
        self
    }

    pub fn with_new_values(mut self, values: serde_json::Value) -> Self {
        self.new_values = Some(values);
        self
    }

    pub fn with_notes(mut self, notes: Option<String>) -> Self {
        self.notes = notes;
        self
    }

    pub fn correcting(mut self, entry: AuditEntryId) -> Self {
        self.corrects = Some(entry);
        self
    }

    /// Link to the previous entry and compute this entry's hash
    pub fn seal(mut self, previous_hash: Option<String>) -> ReleaseResult<Self> {
        self.previous_hash = previous_hash;
        self.hash = self.compute_hash()?;
        Ok(self)
    }

    /// Whether the stored hash matches the entry's contents
    pub fn verify(&self) -> bool {
        matches!(self.compute_hash(), Ok(hash) if hash == self.hash)
    }

    fn compute_hash(&self) -> ReleaseResult<String> {
        let serializable = serde_json::json!({
            "id": self.id,
            "release_id": self.release_id,
            "actor": self.actor,
            "action": self.action,
            "entity_type": self.entity.entity_type,
            "entity_id": self.entity.entity_id,
            "old_values": self.old_values,
            "new_values": self.new_values,
            "notes": self.notes,
            "corrects": self.corrects,
            "timestamp": self.timestamp,
            "previous_hash": self.previous_hash,
        });
        let serialized = serde_json::to_vec(&serializable)
            .map_err(|e| ReleaseError::Validation(format!("unhashable audit entry: {}", e)))?;
        Ok(blake3::hash(&serialized).to_hex().to_string())
    }
}
