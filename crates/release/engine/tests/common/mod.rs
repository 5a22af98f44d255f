#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use release_engine::{
    DocumentQueue, InMemoryProcessingLedger, ManualClock, ReleaseEngine, RoleDirectory,
    TemplateRegistry,
};
use release_store::{
    AuditStore, InMemoryReleaseStore, QueryWindow, ReleaseCommit, ReleaseRepository, ReleaseStore,
    StorageError, StorageResult,
};
use release_types::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub const MANAGER: UserId = UserId(1);
pub const QA: UserId = UserId(10);
pub const COMPLIANCE: UserId = UserId(11);
pub const INSPECTOR: UserId = UserId(20);

pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 28, 9, 0, 0).unwrap()
}

pub fn batch(id: u64, status: ProcessingBatchStatus, product_type: ProductType) -> ProcessingBatch {
    ProcessingBatch {
        id: ProcessingBatchId(id),
        processing_batch_number: format!("TRM-2501-{:04}", id),
        facility_id: FacilityId(1),
        processing_type: ProcessingType::Trimming,
        product_type,
        status,
        output_weight: 1400.0,
        source_batch_number: Some(format!("B-2024-{:03}", id)),
        strain_name: Some("Blue Dream".to_string()),
        room_name: Some("Drying Room A".to_string()),
        actual_completion_date: Some(start_time()),
    }
}

pub struct Harness {
    pub engine: Arc<ReleaseEngine>,
    pub clock: Arc<ManualClock>,
    pub store: Arc<dyn ReleaseRepository>,
}

impl Harness {
    pub fn new() -> Self {
        Self::build(Arc::new(InMemoryReleaseStore::new()), None)
    }

    pub fn with_store(store: Arc<dyn ReleaseRepository>) -> Self {
        Self::build(store, None)
    }

    pub fn with_documents(queue: DocumentQueue) -> Self {
        Self::build(Arc::new(InMemoryReleaseStore::new()), Some(queue))
    }

    fn build(store: Arc<dyn ReleaseRepository>, queue: Option<DocumentQueue>) -> Self {
        let clock = Arc::new(ManualClock::new(start_time()));
        let templates = Arc::new(TemplateRegistry::new(clock.clone()));
        let ledger = Arc::new(InMemoryProcessingLedger::with_batches(
            (1..=6)
                .map(|id| batch(id, ProcessingBatchStatus::Completed, ProductType::Flower))
                .chain([
                    batch(7, ProcessingBatchStatus::InProgress, ProductType::Flower),
                    batch(8, ProcessingBatchStatus::ReadyForRelease, ProductType::Concentrate),
                ]),
        ));
        let roles = Arc::new(RoleDirectory::with_assignments([
            (QA, "qa_manager"),
            (COMPLIANCE, "compliance_officer"),
            (INSPECTOR, "inspector"),
            (MANAGER, "facility_manager"),
        ]));

        let mut engine =
            ReleaseEngine::new(store.clone(), templates, ledger, roles).with_clock(clock.clone());
        if let Some(queue) = queue {
            engine = engine.with_document_queue(queue);
        }

        Self {
            engine: Arc::new(engine),
            clock,
            store,
        }
    }

    /// Two required checkpoints, one qa_manager approval
    pub fn scenario_template(&self) -> ReleaseTemplate {
        self.engine
            .register_template(
                TemplateDraft::new(FacilityId(1), "Standard Flower Release", ProductType::Flower)
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
                    .with_approval(ApprovalSpec::new("qa_manager", 1).with_level("QA Manager")),
            )
            .unwrap()
    }

    /// Two required checkpoints, qa_manager and compliance_officer approvals
    pub fn dual_approval_template(&self) -> ReleaseTemplate {
        self.engine
            .register_template(
                TemplateDraft::new(FacilityId(1), "Premium Flower Release", ProductType::Flower)
                    .with_checkpoint(CheckpointSpec::new(
                        CheckpointType::VisualInspection,
                        "Visual Inspection",
                        1,
                    ))
                    .with_checkpoint(CheckpointSpec::new(
                        CheckpointType::LabTesting,
                        "Lab Testing",
                        2,
                    ))
                    .with_approval(ApprovalSpec::new("qa_manager", 1).with_level("QA Manager"))
                    .with_approval(
                        ApprovalSpec::new("compliance_officer", 2)
                            .with_level("Compliance Officer"),
                    )
                    .with_estimated_duration(72),
            )
            .unwrap()
    }

    /// Required, optional, required
    pub fn optional_template(&self) -> ReleaseTemplate {
        self.engine
            .register_template(
                TemplateDraft::new(FacilityId(1), "Flower With Moisture", ProductType::Flower)
                    .with_checkpoint(CheckpointSpec::new(
                        CheckpointType::VisualInspection,
                        "Visual Inspection",
                        1,
                    ))
                    .with_checkpoint(
                        CheckpointSpec::new(CheckpointType::MoistureTesting, "Moisture", 2)
                            .optional(),
                    )
                    .with_checkpoint(CheckpointSpec::new(
                        CheckpointType::PackagingInspection,
                        "Packaging",
                        3,
                    ))
                    .with_approval(ApprovalSpec::new("qa_manager", 1)),
            )
            .unwrap()
    }

    pub async fn initiate(&self, template: &ReleaseTemplate, batch: u64) -> BatchRelease {
        self.engine
            .initiate_release(InitiateRelease {
                template_id: template.id,
                processing_batch_id: ProcessingBatchId(batch),
                initiated_by: MANAGER,
                notes: None,
            })
            .await
            .unwrap()
    }

    pub async fn pass(&self, release: &BatchRelease, index: usize) -> ReleaseResult<BatchRelease> {
        self.engine
            .complete_checkpoint(
                release.id,
                release.checkpoints[index].id,
                CompleteCheckpoint::passed(INSPECTOR),
            )
            .await
    }

    pub async fn approve(
        &self,
        release: &BatchRelease,
        index: usize,
        approver: UserId,
    ) -> ReleaseResult<BatchRelease> {
        self.engine
            .record_approval_decision(
                release.id,
                release.approvals[index].id,
                RecordApprovalDecision::approve(approver),
            )
            .await
    }

    /// Drive a scenario release to `approved`
    pub async fn approved_release(&self, batch: u64) -> BatchRelease {
        let template = self.scenario_template();
        let release = self.initiate(&template, batch).await;
        self.pass(&release, 0).await.unwrap();
        self.pass(&release, 1).await.unwrap();
        self.approve(&release, 0, QA).await.unwrap()
    }

    pub async fn audit_count(&self, release: ReleaseId) -> usize {
        self.engine.audit_log().count(release).await.unwrap()
    }
}

/// Wraps the in-memory store and fails commits on demand
#[derive(Default)]
pub struct FlakyStore {
    inner: InMemoryReleaseStore,
    fail_commits: AtomicBool,
}

impl FlakyStore {
    pub fn set_failing(&self, failing: bool) {
        self.fail_commits.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl ReleaseStore for FlakyStore {
    async fn commit(&self, commit: ReleaseCommit) -> StorageResult<()> {
        if self.fail_commits.load(Ordering::SeqCst) {
            return Err(StorageError::Backend("connection reset".to_string()));
        }
        self.inner.commit(commit).await
    }

    async fn get_release(&self, id: ReleaseId) -> StorageResult<Option<BatchRelease>> {
        self.inner.get_release(id).await
    }

    async fn list_releases(
        &self,
        filter: &ReleaseFilter,
        window: QueryWindow,
    ) -> StorageResult<Vec<BatchRelease>> {
        self.inner.list_releases(filter, window).await
    }

    async fn find_active_for_batch(
        &self,
        batch: ProcessingBatchId,
    ) -> StorageResult<Option<BatchRelease>> {
        self.inner.find_active_for_batch(batch).await
    }

    async fn release_number_exists(&self, release_number: &str) -> StorageResult<bool> {
        self.inner.release_number_exists(release_number).await
    }
}

#[async_trait]
impl AuditStore for FlakyStore {
    async fn list_audit(
        &self,
        release: ReleaseId,
        window: QueryWindow,
    ) -> StorageResult<Vec<AuditEntry>> {
        self.inner.list_audit(release, window).await
    }

    async fn get_audit(
        &self,
        release: ReleaseId,
        entry: AuditEntryId,
    ) -> StorageResult<Option<AuditEntry>> {
        self.inner.get_audit(release, entry).await
    }

    async fn count_audit(&self, release: ReleaseId) -> StorageResult<usize> {
        self.inner.count_audit(release).await
    }
}
