//! Typed mutation commands
//!
//! Each command names exactly the fields a caller may set and rejects any
//! other field at deserialization time. Identifiers of the release and its
//! children travel separately (in the HTTP path, or as engine arguments).

use crate::{
    ApprovalDecision, AuditEntryId, ProcessingBatchId, ReleaseError, ReleaseResult, TemplateId,
    UserId,
};
use serde::{Deserialize, Serialize};

fn require_text(field: &str, value: &str) -> ReleaseResult<()> {
    if value.trim().is_empty() {
        return Err(ReleaseError::Validation(format!("{} must not be empty", field)));
    }
    Ok(())
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InitiateRelease {
    pub template_id: TemplateId,
    pub processing_batch_id: ProcessingBatchId,
    pub initiated_by: UserId,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StartCheckpoint {
    pub inspector: UserId,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CompleteCheckpoint {
    pub inspector: UserId,
    pub passed: bool,
    #[serde(default)]
    pub inspection_data: Option<serde_json::Value>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl CompleteCheckpoint {
    pub fn passed(inspector: UserId) -> Self {
        Self {
            inspector,
            passed: true,
            inspection_data: None,
            notes: None,
        }
    }

    pub fn failed(inspector: UserId, notes: impl Into<String>) -> Self {
        Self {
            inspector,
            passed: false,
            inspection_data: None,
            notes: Some(notes.into()),
        }
    }

    pub fn with_inspection_data(mut self, data: serde_json::Value) -> Self {
        self.inspection_data = Some(data);
        self
    }

    pub fn validate(&self) -> ReleaseResult<()> {
        match &self.inspection_data {
            None | Some(serde_json::Value::Object(_)) => Ok(()),
            Some(_) => Err(ReleaseError::Validation(
                "inspection_data must be a JSON object".into(),
            )),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SkipCheckpoint {
    pub actor: UserId,
    pub reason: String,
}

impl SkipCheckpoint {
    pub fn validate(&self) -> ReleaseResult<()> {
        require_text("reason", &self.reason)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RequestApproval {
    pub actor: UserId,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RecordApprovalDecision {
    pub approver: UserId,
    pub decision: ApprovalDecision,
    #[serde(default)]
    pub notes: Option<String>,
}

impl RecordApprovalDecision {
    pub fn approve(approver: UserId) -> Self {
        Self {
            approver,
            decision: ApprovalDecision::Approved,
            notes: None,
        }
    }

    pub fn reject(approver: UserId, notes: impl Into<String>) -> Self {
        Self {
            approver,
            decision: ApprovalDecision::Rejected,
            notes: Some(notes.into()),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HoldRelease {
    pub actor: UserId,
    pub reason: String,
}

impl HoldRelease {
    pub fn validate(&self) -> ReleaseResult<()> {
        require_text("reason", &self.reason)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResumeRelease {
    pub actor: UserId,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RejectRelease {
    pub actor: UserId,
    pub reason: String,
}

impl RejectRelease {
    pub fn validate(&self) -> ReleaseResult<()> {
        require_text("reason", &self.reason)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FinalizeRelease {
    pub actor: UserId,
    /// Measured output weight in grams
    pub actual_weight: f64,
    #[serde(default)]
    pub notes: Option<String>,
}

impl FinalizeRelease {
    pub fn new(actor: UserId, actual_weight: f64) -> Self {
        Self {
            actor,
            actual_weight,
            notes: None,
        }
    }

    pub fn validate(&self) -> ReleaseResult<()> {
        if !self.actual_weight.is_finite() || self.actual_weight <= 0.0 {
            return Err(ReleaseError::Validation(format!(
                "actual_weight must be a positive number, got {}",
                self.actual_weight
            )));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RecordCorrection {
    pub actor: UserId,
    pub corrects: AuditEntryId,
    pub notes: String,
}

impl RecordCorrection {
    pub fn validate(&self) -> ReleaseResult<()> {
        require_text("notes", &self.notes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_fields_rejected() {
        let json = serde_json::json!({
            "approver": 4,
            "decision": "approved",
            "status": "released"
        });
        assert!(serde_json::from_value::<RecordApprovalDecision>(json).is_err());
    }

    #[test]
    fn test_finalize_weight_validation() {
        assert!(FinalizeRelease::new(UserId(1), 1398.5).validate().is_ok());
        assert!(FinalizeRelease::new(UserId(1), 0.0).validate().is_err());
        assert!(FinalizeRelease::new(UserId(1), -3.0).validate().is_err());
        assert!(FinalizeRelease::new(UserId(1), f64::NAN).validate().is_err());
    }

    #[test]
    fn test_inspection_data_must_be_object() {
        let cmd = CompleteCheckpoint::passed(UserId(1)).with_inspection_data(serde_json::json!(3));
        assert!(matches!(cmd.validate(), Err(ReleaseError::Validation(_))));

        let cmd = CompleteCheckpoint::passed(UserId(1))
            .with_inspection_data(serde_json::json!({"moisture_pct": 11.2}));
        assert!(cmd.validate().is_ok());
    }

    #[test]
    fn test_blank_reasons_rejected() {
        let hold = HoldRelease {
            actor: UserId(1),
            reason: "   ".into(),
        };
        assert!(hold.validate().is_err());
    }
}
