//! Release templates: the reusable shape of a release workflow
//!
//! A template lists the checkpoints an inspector must work through, in
//! order, and the approvals that must be collected. Templates are immutable
//! once registered; a change is published as a new template that
//! supersedes the old one, so historical releases keep their binding.

use crate::{FacilityId, ReleaseError, ReleaseResult, Role, TemplateId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The finished product category a template applies to
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductType {
    Flower,
    PreRoll,
    Concentrate,
    Edible,
    Topical,
    Tincture,
}

impl ProductType {
    /// Product types that may never ship without a lab result
    pub fn mandates_lab_testing(&self) -> bool {
        matches!(
            self,
            Self::Flower | Self::PreRoll | Self::Concentrate | Self::Edible
        )
    }
}

impl std::fmt::Display for ProductType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Flower => "flower",
            Self::PreRoll => "pre_roll",
            Self::Concentrate => "concentrate",
            Self::Edible => "edible",
            Self::Topical => "topical",
            Self::Tincture => "tincture",
        };
        f.write_str(s)
    }
}

/// Kind of inspection performed at a checkpoint
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckpointType {
    VisualInspection,
    WeightVerification,
    LabTesting,
    MoistureTesting,
    PackagingInspection,
    DocumentationReview,
}

/// One checkpoint in a template
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CheckpointSpec {
    pub checkpoint_type: CheckpointType,
    pub name: String,
    /// 1-based position; unique within the template
    pub order_sequence: u32,
    /// Required checkpoints gate later ones and must pass for approval
    #[serde(default = "default_required")]
    pub required: bool,
}

fn default_required() -> bool {
    true
}

impl CheckpointSpec {
    pub fn new(checkpoint_type: CheckpointType, name: impl Into<String>, order: u32) -> Self {
        Self {
            checkpoint_type,
            name: name.into(),
            order_sequence: order,
            required: true,
        }
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }
}

/// One approval in a template
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApprovalSpec {
    /// The role an approver must hold
    pub role: Role,
    /// Display name of the approval level, e.g. "QA Manager"
    #[serde(default)]
    pub level: String,
    pub order_sequence: u32,
}

impl ApprovalSpec {
    pub fn new(role: impl Into<String>, order: u32) -> Self {
        let role = Role::new(role);
        Self {
            level: role.as_str().to_string(),
            role,
            order_sequence: order,
        }
    }

    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }
}

/// An unregistered template, as submitted by a caller
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TemplateDraft {
    pub facility_id: FacilityId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub product_type: ProductType,
    /// Opt-in lab requirement for product types that do not mandate it
    #[serde(default)]
    pub requires_lab_testing: bool,
    pub checkpoints: Vec<CheckpointSpec>,
    #[serde(default)]
    pub approvals: Vec<ApprovalSpec>,
    pub estimated_duration_hours: u32,
}

impl TemplateDraft {
    pub fn new(facility_id: FacilityId, name: impl Into<String>, product_type: ProductType) -> Self {
        Self {
            facility_id,
            name: name.into(),
            description: String::new(),
            product_type,
            requires_lab_testing: false,
            checkpoints: Vec::new(),
            approvals: Vec::new(),
            estimated_duration_hours: 48,
        }
    }

    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = desc.into();
        self
    }

    pub fn with_checkpoint(mut self, checkpoint: CheckpointSpec) -> Self {
        self.checkpoints.push(checkpoint);
        self
    }

    pub fn with_approval(mut self, approval: ApprovalSpec) -> Self {
        self.approvals.push(approval);
        self
    }

    pub fn with_estimated_duration(mut self, hours: u32) -> Self {
        self.estimated_duration_hours = hours;
        self
    }

    pub fn requiring_lab_testing(mut self) -> Self {
        self.requires_lab_testing = true;
        self
    }

    fn lab_testing_mandated(&self) -> bool {
        self.requires_lab_testing || self.product_type.mandates_lab_testing()
    }

    /// Validate the template for structural correctness
    pub fn validate(&self) -> ReleaseResult<()> {
        if self.name.trim().is_empty() {
            return Err(ReleaseError::InvalidTemplate(
                "Template name must not be empty".into(),
            ));
        }
        if self.estimated_duration_hours == 0 {
            return Err(ReleaseError::InvalidTemplate(
                "Estimated duration must be at least one hour".into(),
            ));
        }
        if self.estimated_duration_hours > MAX_ESTIMATED_DURATION_HOURS {
            return Err(ReleaseError::InvalidTemplate(format!(
                "Estimated duration of {} hours exceeds the maximum of {}",
                self.estimated_duration_hours, MAX_ESTIMATED_DURATION_HOURS
            )));
        }
        if let Some(cp) = self.checkpoints.iter().find(|c| c.name.trim().is_empty()) {
            return Err(ReleaseError::InvalidTemplate(format!(
                "Checkpoint #{} has no name",
                cp.order_sequence
            )));
        }
        if let Some(ap) = self.approvals.iter().find(|a| a.role.as_str().trim().is_empty()) {
            return Err(ReleaseError::InvalidTemplate(format!(
                "Approval #{} has no role",
                ap.order_sequence
            )));
        }

        check_contiguous(
            "checkpoint",
            self.checkpoints.iter().map(|c| c.order_sequence),
        )?;
        check_contiguous("approval", self.approvals.iter().map(|a| a.order_sequence))?;

        if self.lab_testing_mandated() && !self.checkpoints.iter().any(|c| c.required) {
            return Err(ReleaseError::InvalidTemplate(format!(
                "Product type '{}' mandates lab testing but no checkpoint is required",
                self.product_type
            )));
        }

        Ok(())
    }
}

/// Longest estimated duration a template may declare: one leap year
pub const MAX_ESTIMATED_DURATION_HOURS: u32 = 366 * 24;

/// Order sequences must be exactly {1..N}
fn check_contiguous(label: &str, orders: impl Iterator<Item = u32>) -> ReleaseResult<()> {
    let mut orders: Vec<u32> = orders.collect();
    orders.sort_unstable();
    for (idx, order) in orders.iter().enumerate() {
        let expected = idx as u32 + 1;
        if *order != expected {
            return Err(ReleaseError::InvalidTemplate(format!(
                "{} order sequences must be contiguous from 1: expected {}, found {}",
                label, expected, order
            )));
        }
    }
    Ok(())
}

/// A registered, immutable release template
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReleaseTemplate {
    pub id: TemplateId,
    pub facility_id: FacilityId,
    pub name: String,
    pub description: String,
    pub product_type: ProductType,
    pub requires_lab_testing: bool,
    /// Checkpoint specs sorted by order sequence
    pub checkpoints: Vec<CheckpointSpec>,
    /// Approval specs sorted by order sequence
    pub approvals: Vec<ApprovalSpec>,
    pub estimated_duration_hours: u32,
    /// 1 for a first publication, incremented by every republish
    pub version: u32,
    /// The template this one replaces
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supersedes: Option<TemplateId>,
    pub created_at: DateTime<Utc>,
}

impl ReleaseTemplate {
    /// Freeze a validated draft into a registered template
    pub fn publish(
        id: TemplateId,
        draft: TemplateDraft,
        version: u32,
        supersedes: Option<TemplateId>,
        created_at: DateTime<Utc>,
    ) -> ReleaseResult<Self> {
        draft.validate()?;
        let mut checkpoints = draft.checkpoints;
        checkpoints.sort_by_key(|c| c.order_sequence);
        let mut approvals = draft.approvals;
        approvals.sort_by_key(|a| a.order_sequence);

        Ok(Self {
            id,
            facility_id: draft.facility_id,
            name: draft.name,
            description: draft.description,
            product_type: draft.product_type,
            requires_lab_testing: draft.requires_lab_testing,
            checkpoints,
            approvals,
            estimated_duration_hours: draft.estimated_duration_hours,
            version,
            supersedes,
            created_at,
        })
    }

    pub fn required_checkpoint_count(&self) -> usize {
        self.checkpoints.iter().filter(|c| c.required).count()
    }

    pub fn estimated_duration(&self) -> chrono::Duration {
        chrono::Duration::hours(i64::from(self.estimated_duration_hours))
    }
}
