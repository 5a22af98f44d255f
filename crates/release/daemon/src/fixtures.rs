//! Seed data for the in-memory collaborators
//!
//! A fixtures file is plain JSON:
//!
//! ```json
//! {
//!   "templates": [ { "facility_id": 1, "name": "...", "product_type": "flower", ... } ],
//!   "batches":   [ { "id": 4, "processing_batch_number": "DRY-2501-0002", ... } ],
//!   "roles":     [ { "user_id": 2, "role": "qa_manager" } ]
//! }
//! ```

use anyhow::Context;
use chrono::{TimeZone, Utc};
use release_engine::{InMemoryProcessingLedger, ReleaseEngine, RoleDirectory};
use release_types::*;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One user → role assignment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleAssignment {
    pub user_id: UserId,
    pub role: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Fixtures {
    #[serde(default)]
    pub templates: Vec<TemplateDraft>,
    #[serde(default)]
    pub batches: Vec<ProcessingBatch>,
    #[serde(default)]
    pub roles: Vec<RoleAssignment>,
}

/// What a fixture load produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedSummary {
    pub templates: usize,
    pub batches: usize,
    pub roles: usize,
}

impl Fixtures {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading fixtures file {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("parsing fixtures file {}", path.display()))
    }

    /// Register templates with the engine and fill the ledger and directory
    pub fn apply(
        &self,
        engine: &ReleaseEngine,
        ledger: &InMemoryProcessingLedger,
        roles: &RoleDirectory,
    ) -> anyhow::Result<SeedSummary> {
        for draft in &self.templates {
            let template = engine
                .register_template(draft.clone())
                .with_context(|| format!("registering template '{}'", draft.name))?;
            tracing::debug!(template_id = %template.id, name = %template.name, "Seeded template");
        }
        for batch in &self.batches {
            ledger.insert(batch.clone());
        }
        for assignment in &self.roles {
            roles.assign(assignment.user_id, assignment.role.clone());
        }

        Ok(SeedSummary {
            templates: self.templates.len(),
            batches: self.batches.len(),
            roles: self.roles.len(),
        })
    }

    /// Demo facility 1: three templates, four processing batches, four users
    pub fn demo() -> Self {
        let facility = FacilityId(1);
        let qa = || ApprovalSpec::new("qa_manager", 1).with_level("QA Manager");
        let compliance =
            || ApprovalSpec::new("compliance_officer", 2).with_level("Compliance Officer");

        let standard = TemplateDraft::new(facility, "Standard Flower Release", ProductType::Flower)
            .with_description("Standard quality control workflow for flower products")
            .with_checkpoint(CheckpointSpec::new(
                CheckpointType::VisualInspection,
                "Visual Inspection",
                1,
            ))
            .with_checkpoint(CheckpointSpec::new(
                CheckpointType::WeightVerification,
                "Weight Verification",
                2,
            ))
            .with_checkpoint(CheckpointSpec::new(CheckpointType::LabTesting, "Lab Testing", 3))
            .with_checkpoint(CheckpointSpec::new(
                CheckpointType::PackagingInspection,
                "Packaging Inspection",
                4,
            ))
            .with_approval(qa())
            .with_approval(compliance())
            .with_estimated_duration(48);

        let premium = TemplateDraft::new(facility, "Premium Flower Release", ProductType::Flower)
            .with_description("Enhanced quality control workflow for premium flower products")
            .with_checkpoint(CheckpointSpec::new(
                CheckpointType::VisualInspection,
                "Visual Inspection",
                1,
            ))
            .with_checkpoint(
                CheckpointSpec::new(CheckpointType::MoistureTesting, "Moisture Testing", 2)
                    .optional(),
            )
            .with_checkpoint(CheckpointSpec::new(
                CheckpointType::WeightVerification,
                "Weight Verification",
                3,
            ))
            .with_checkpoint(CheckpointSpec::new(CheckpointType::LabTesting, "Lab Testing", 4))
            .with_checkpoint(CheckpointSpec::new(
                CheckpointType::PackagingInspection,
                "Packaging Inspection",
                5,
            ))
            .with_checkpoint(CheckpointSpec::new(
                CheckpointType::DocumentationReview,
                "Documentation Review",
                6,
            ))
            .with_approval(qa())
            .with_approval(compliance())
            .with_estimated_duration(72);

        let concentrate = TemplateDraft::new(facility, "Concentrate Release", ProductType::Concentrate)
            .with_description("Quality control workflow for concentrate products")
            .with_checkpoint(CheckpointSpec::new(
                CheckpointType::VisualInspection,
                "Visual Inspection",
                1,
            ))
            .with_checkpoint(CheckpointSpec::new(
                CheckpointType::WeightVerification,
                "Weight Verification",
                2,
            ))
            .with_checkpoint(CheckpointSpec::new(CheckpointType::LabTesting, "Lab Testing", 3))
            .with_approval(qa())
            .with_estimated_duration(36);

        let batch = |id: u64,
                     number: &str,
                     processing_type: ProcessingType,
                     status: ProcessingBatchStatus,
                     weight: f64,
                     strain: &str,
                     day: u32| ProcessingBatch {
            id: ProcessingBatchId(id),
            processing_batch_number: number.to_string(),
            facility_id: facility,
            processing_type,
            product_type: ProductType::Flower,
            status,
            output_weight: weight,
            source_batch_number: Some(format!("B-2024-{:03}", id)),
            strain_name: Some(strain.to_string()),
            room_name: Some("Drying Room A".to_string()),
            actual_completion_date: Utc.with_ymd_and_hms(2025, 1, day, 17, 0, 0).single(),
        };

        Self {
            templates: vec![standard, premium, concentrate],
            batches: vec![
                batch(
                    3,
                    "TRM-2501-0001",
                    ProcessingType::Trimming,
                    ProcessingBatchStatus::ReadyForRelease,
                    1400.0,
                    "Blue Dream",
                    28,
                ),
                batch(
                    4,
                    "DRY-2501-0002",
                    ProcessingType::Drying,
                    ProcessingBatchStatus::Completed,
                    1875.0,
                    "Purple Haze",
                    29,
                ),
                batch(
                    5,
                    "CUR-2501-0002",
                    ProcessingType::Curing,
                    ProcessingBatchStatus::Completed,
                    1650.0,
                    "Sour Diesel",
                    27,
                ),
                batch(
                    6,
                    "DRY-2501-0003",
                    ProcessingType::Drying,
                    ProcessingBatchStatus::InProgress,
                    2100.0,
                    "OG Kush",
                    30,
                ),
            ],
            roles: vec![
                RoleAssignment {
                    user_id: UserId(1),
                    role: "facility_manager".to_string(),
                },
                RoleAssignment {
                    user_id: UserId(2),
                    role: "qa_manager".to_string(),
                },
                RoleAssignment {
                    user_id: UserId(3),
                    role: "compliance_officer".to_string(),
                },
                RoleAssignment {
                    user_id: UserId(4),
                    role: "inspector".to_string(),
                },
            ],
        }
    }
}
