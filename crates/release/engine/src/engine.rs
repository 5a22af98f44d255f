//! Release engine: the core workflow service
//!
//! Every mutating operation follows the same shape:
//! 1. Resolve collaborators (roles, batches) before taking any lock.
//! 2. Lock the release, load its snapshot and apply guards in a fixed order.
//! 3. Mutate a copy, settle its status and seal one audit entry.
//! 4. Commit snapshot and entry together under an optimistic version check.
//!
//! A rejected operation leaves the stored release and its trail untouched.

use crate::audit_log::AuditLog;
use crate::clock::{Clock, SystemClock};
use crate::collaborators::{ProcessingLedger, RoleProvider};
use crate::config::EngineConfig;
use crate::documents::{DocumentJob, DocumentQueue};
use crate::ids::{IdAllocator, ReleaseNumberFormatter};
use crate::locks::LockTable;
use crate::state_machine::{self, Transition};
use crate::stats;
use crate::template_registry::TemplateRegistry;
use chrono::{DateTime, Utc};
use release_store::{QueryWindow, ReleaseCommit, ReleaseRepository};
use release_types::*;
use serde_json::{json, Map, Value};
use std::sync::Arc;

/// Description of one accepted mutation, turned into an audit entry
struct Mutation {
    action: AuditAction,
    entity: AuditEntity,
    old_values: Map<String, Value>,
    new_values: Map<String, Value>,
    notes: Option<String>,
    corrects: Option<AuditEntryId>,
}

impl Mutation {
    fn new(action: AuditAction, entity: AuditEntity) -> Self {
        Self {
            action,
            entity,
            old_values: Map::new(),
            new_values: Map::new(),
            notes: None,
            corrects: None,
        }
    }

    fn old(mut self, key: &str, value: Value) -> Self {
        self.old_values.insert(key.to_string(), value);
        self
    }

    fn new_value(mut self, key: &str, value: Value) -> Self {
        self.new_values.insert(key.to_string(), value);
        self
    }

    fn notes(mut self, notes: Option<String>) -> Self {
        self.notes = notes;
        self
    }
}

fn checkpoint_entity(id: CheckpointResultId) -> AuditEntity {
    AuditEntity::new(AuditEntityType::CheckpointResult, id.value())
}

fn approval_entity(id: ApprovalId) -> AuditEntity {
    AuditEntity::new(AuditEntityType::Approval, id.value())
}

fn checkpoint_mut(
    release: &mut BatchRelease,
    id: CheckpointResultId,
) -> ReleaseResult<&mut CheckpointResult> {
    let release_id = release.id;
    release
        .checkpoint_mut(id)
        .ok_or(ReleaseError::CheckpointNotFound {
            release: release_id,
            checkpoint: id,
        })
}

fn approval_mut(release: &mut BatchRelease, id: ApprovalId) -> ReleaseResult<&mut Approval> {
    let release_id = release.id;
    release.approval_mut(id).ok_or(ReleaseError::ApprovalNotFound {
        release: release_id,
        approval: id,
    })
}

/// Weight deviation from the batch output weight, in percent
fn weight_variance_pct(expected: f64, actual: f64) -> Option<f64> {
    if expected > 0.0 {
        Some((((actual - expected) / expected) * 10_000.0).round() / 100.0)
    } else {
        None
    }
}

/// The batch release workflow engine
pub struct ReleaseEngine {
    store: Arc<dyn ReleaseRepository>,
    templates: Arc<TemplateRegistry>,
    ledger: Arc<dyn ProcessingLedger>,
    roles: Arc<dyn RoleProvider>,
    clock: Arc<dyn Clock>,
    ids: IdAllocator,
    numbers: ReleaseNumberFormatter,
    release_locks: LockTable<ReleaseId>,
    batch_locks: LockTable<ProcessingBatchId>,
    audit: AuditLog,
    documents: Option<DocumentQueue>,
    config: EngineConfig,
}

impl ReleaseEngine {
    pub fn new(
        store: Arc<dyn ReleaseRepository>,
        templates: Arc<TemplateRegistry>,
        ledger: Arc<dyn ProcessingLedger>,
        roles: Arc<dyn RoleProvider>,
    ) -> Self {
        let config = EngineConfig::default();
        Self {
            audit: AuditLog::new(store.clone(), config.audit_page_size),
            numbers: ReleaseNumberFormatter::new(config.release_number_prefix.clone()),
            store,
            templates,
            ledger,
            roles,
            clock: Arc::new(SystemClock),
            ids: IdAllocator::new(),
            release_locks: LockTable::new(),
            batch_locks: LockTable::new(),
            documents: None,
            config,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.numbers = ReleaseNumberFormatter::new(config.release_number_prefix.clone());
        self.audit = AuditLog::new(self.store.clone(), config.audit_page_size);
        self.config = config;
        self
    }

    /// Enqueue document generation after every successful finalize
    pub fn with_document_queue(mut self, queue: DocumentQueue) -> Self {
        self.documents = Some(queue);
        self
    }

    pub fn templates(&self) -> &Arc<TemplateRegistry> {
        &self.templates
    }

    pub fn audit_log(&self) -> &AuditLog {
        &self.audit
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    // ── Templates ───────────────────────────────────────────────────────

    pub fn register_template(&self, draft: TemplateDraft) -> ReleaseResult<ReleaseTemplate> {
        self.templates.register(draft)
    }

    pub fn republish_template(
        &self,
        previous: TemplateId,
        draft: TemplateDraft,
    ) -> ReleaseResult<ReleaseTemplate> {
        self.templates.republish(previous, draft)
    }

    pub fn list_templates(&self, facility_id: FacilityId) -> Vec<ReleaseTemplate> {
        self.templates.list(facility_id)
    }

    // ── Initiation ──────────────────────────────────────────────────────

    /// Create a release for a finished processing batch
    pub async fn initiate_release(&self, cmd: InitiateRelease) -> ReleaseResult<BatchRelease> {
        let template = self.templates.resolve(cmd.template_id)?;
        let batch = self
            .ledger
            .get_processing_batch(cmd.processing_batch_id)
            .await?;

        if !batch.is_releasable() {
            return Err(ReleaseError::BatchNotReleasable {
                batch: batch.id,
                status: batch.status.to_string(),
            });
        }
        if batch.facility_id != template.facility_id {
            return Err(ReleaseError::Validation(format!(
                "template {} belongs to facility {}, batch {} to facility {}",
                template.id, template.facility_id, batch.id, batch.facility_id
            )));
        }
        if batch.product_type != template.product_type {
            return Err(ReleaseError::Validation(format!(
                "template {} is for {} products, batch {} holds {}",
                template.id, template.product_type, batch.id, batch.product_type
            )));
        }

        let guard = self.batch_locks.lock(batch.id).await;
        let created = self.create_release(&template, &batch, cmd).await;
        drop(guard);
        self.batch_locks.prune();
        created
    }

    /// Runs under the batch lock
    async fn create_release(
        &self,
        template: &ReleaseTemplate,
        batch: &ProcessingBatch,
        cmd: InitiateRelease,
    ) -> ReleaseResult<BatchRelease> {
        if let Some(active) = self.store.find_active_for_batch(batch.id).await? {
            return Err(ReleaseError::DuplicateActiveRelease {
                batch: batch.id,
                release: active.id,
            });
        }

        let now = self.clock.now();
        let target_completion_date = now
            .checked_add_signed(template.estimated_duration())
            .ok_or_else(|| {
                ReleaseError::Validation(format!(
                    "target completion date out of range: {} plus {} hours",
                    now, template.estimated_duration_hours
                ))
            })?;
        let release_number = self.numbers.next(now, self.store.as_ref()).await?;
        let release_id = self.ids.release();

        let checkpoints = template
            .checkpoints
            .iter()
            .map(|spec| CheckpointResult {
                id: self.ids.checkpoint(),
                release_id,
                checkpoint_type: spec.checkpoint_type,
                name: spec.name.clone(),
                order_sequence: spec.order_sequence,
                required: spec.required,
                status: CheckpointStatus::Pending,
                inspector: None,
                started_at: None,
                completed_at: None,
                inspection_data: None,
                notes: None,
            })
            .collect();
        let approvals = template
            .approvals
            .iter()
            .map(|spec| Approval {
                id: self.ids.approval(),
                release_id,
                approval_level: spec.level.clone(),
                required_role: spec.role.clone(),
                approver: None,
                status: ApprovalStatus::Pending,
                order_sequence: spec.order_sequence,
                requested_at: None,
                responded_at: None,
                notes: None,
            })
            .collect();

        let mut release = BatchRelease {
            id: release_id,
            release_number,
            facility_id: batch.facility_id,
            template_id: template.id,
            processing_batch_id: batch.id,
            lineage: ReleaseLineage {
                processing_batch_number: batch.processing_batch_number.clone(),
                processing_type: batch.processing_type,
                product_type: batch.product_type,
                strain_name: batch.strain_name.clone(),
                room_name: batch.room_name.clone(),
                template_name: template.name.clone(),
                template_version: template.version,
                expected_weight: batch.output_weight,
            },
            status: ReleaseStatus::Pending,
            initiated_by: cmd.initiated_by,
            initiated_at: now,
            target_completion_date,
            actual_completion_date: None,
            notes: cmd.notes.clone(),
            checkpoints,
            approvals,
            documents: Vec::new(),
            hold: None,
            rejection: None,
            approved_at: None,
            closed_at: None,
            actual_weight: None,
            weight_variance_pct: None,
            released_by: None,
            version: 1,
            audit_head: None,
            updated_at: now,
        };

        let mutation = Mutation::new(AuditAction::ReleaseInitiated, AuditEntity::release(release_id))
            .new_value("status", json!(ReleaseStatus::Pending))
            .new_value("release_number", json!(release.release_number))
            .new_value("template_id", json!(template.id))
            .new_value("processing_batch_id", json!(batch.id))
            .notes(cmd.notes);
        let unchanged = Transition {
            from: ReleaseStatus::Pending,
            to: ReleaseStatus::Pending,
        };
        let entry = self.build_entry(release_id, None, cmd.initiated_by, mutation, unchanged, now)?;
        release.audit_head = Some(entry.hash.clone());

        self.store
            .commit(ReleaseCommit::create(release.clone(), entry))
            .await?;

        tracing::info!(
            release_id = %release.id,
            release_number = %release.release_number,
            processing_batch_id = %batch.id,
            template_id = %template.id,
            "Batch release initiated"
        );
        Ok(release)
    }

    // ── Checkpoints ─────────────────────────────────────────────────────

    /// Record that an inspector began a checkpoint
    pub async fn start_checkpoint(
        &self,
        release_id: ReleaseId,
        checkpoint_id: CheckpointResultId,
        cmd: StartCheckpoint,
    ) -> ReleaseResult<BatchRelease> {
        self.mutate(release_id, cmd.inspector, move |release, now| {
            let checkpoint = state_machine::open_checkpoint(release, checkpoint_id)?;
            if checkpoint.is_started() {
                return Err(ReleaseError::Validation(format!(
                    "checkpoint {} already started",
                    checkpoint_id
                )));
            }
            state_machine::ensure_in_order(release, checkpoint)?;

            let checkpoint = checkpoint_mut(release, checkpoint_id)?;
            checkpoint.started_at = Some(now);
            checkpoint.inspector = Some(cmd.inspector);

            Ok(
                Mutation::new(AuditAction::CheckpointStarted, checkpoint_entity(checkpoint_id))
                    .old("started_at", Value::Null)
                    .new_value("started_at", json!(now))
                    .new_value("inspector", json!(cmd.inspector)),
            )
        })
        .await
    }

    /// Pass or fail a checkpoint
    pub async fn complete_checkpoint(
        &self,
        release_id: ReleaseId,
        checkpoint_id: CheckpointResultId,
        cmd: CompleteCheckpoint,
    ) -> ReleaseResult<BatchRelease> {
        cmd.validate()?;
        self.mutate(release_id, cmd.inspector, move |release, now| {
            let checkpoint = state_machine::open_checkpoint(release, checkpoint_id)?;
            state_machine::ensure_in_order(release, checkpoint)?;

            let status = if cmd.passed {
                CheckpointStatus::Passed
            } else {
                CheckpointStatus::Failed
            };
            let checkpoint = checkpoint_mut(release, checkpoint_id)?;
            checkpoint.started_at.get_or_insert(now);
            checkpoint.inspector = Some(cmd.inspector);
            checkpoint.status = status;
            checkpoint.completed_at = Some(now);
            checkpoint.inspection_data = cmd.inspection_data.clone();
            checkpoint.notes = cmd.notes.clone();

            Ok(
                Mutation::new(AuditAction::CheckpointCompleted, checkpoint_entity(checkpoint_id))
                    .old("status", json!(CheckpointStatus::Pending))
                    .new_value("status", json!(status))
                    .new_value("inspector", json!(cmd.inspector))
                    .new_value("inspection_data", json!(cmd.inspection_data))
                    .notes(cmd.notes),
            )
        })
        .await
    }

    /// Skip an optional checkpoint
    pub async fn skip_checkpoint(
        &self,
        release_id: ReleaseId,
        checkpoint_id: CheckpointResultId,
        cmd: SkipCheckpoint,
    ) -> ReleaseResult<BatchRelease> {
        cmd.validate()?;
        self.mutate(release_id, cmd.actor, move |release, now| {
            let checkpoint = state_machine::open_checkpoint(release, checkpoint_id)?;
            if checkpoint.required {
                return Err(ReleaseError::Validation(format!(
                    "checkpoint {} is required and cannot be skipped",
                    checkpoint_id
                )));
            }
            state_machine::ensure_in_order(release, checkpoint)?;

            let checkpoint = checkpoint_mut(release, checkpoint_id)?;
            checkpoint.status = CheckpointStatus::Skipped;
            checkpoint.inspector = Some(cmd.actor);
            checkpoint.completed_at = Some(now);
            checkpoint.notes = Some(cmd.reason.clone());

            Ok(
                Mutation::new(AuditAction::CheckpointCompleted, checkpoint_entity(checkpoint_id))
                    .old("status", json!(CheckpointStatus::Pending))
                    .new_value("status", json!(CheckpointStatus::Skipped))
                    .notes(Some(cmd.reason)),
            )
        })
        .await
    }

    // ── Approvals ───────────────────────────────────────────────────────

    /// Ask the holder of an approval's role for a decision
    pub async fn request_approval(
        &self,
        release_id: ReleaseId,
        approval_id: ApprovalId,
        cmd: RequestApproval,
    ) -> ReleaseResult<BatchRelease> {
        self.mutate(release_id, cmd.actor, move |release, now| {
            let approval = state_machine::open_approval(release, approval_id)?;
            if approval.requested_at.is_some() {
                return Err(ReleaseError::Validation(format!(
                    "approval {} already requested",
                    approval_id
                )));
            }

            let approval = approval_mut(release, approval_id)?;
            approval.requested_at = Some(now);
            let role = approval.required_role.clone();

            Ok(
                Mutation::new(AuditAction::ApprovalRequested, approval_entity(approval_id))
                    .new_value("requested_at", json!(now))
                    .new_value("required_role", json!(role)),
            )
        })
        .await
    }

    /// Approve or reject. A rejection closes the release at once.
    pub async fn record_approval_decision(
        &self,
        release_id: ReleaseId,
        approval_id: ApprovalId,
        cmd: RecordApprovalDecision,
    ) -> ReleaseResult<BatchRelease> {
        let role = self.roles.role_of(cmd.approver).await?;
        self.mutate(release_id, cmd.approver, move |release, now| {
            let approval = state_machine::open_approval(release, approval_id)?;
            state_machine::ensure_role(release, approval, &role)?;

            let status = ApprovalStatus::from(cmd.decision);
            let approval = approval_mut(release, approval_id)?;
            approval.status = status;
            approval.approver = Some(cmd.approver);
            approval.requested_at.get_or_insert(now);
            approval.responded_at = Some(now);
            approval.notes = cmd.notes.clone();

            Ok(
                Mutation::new(AuditAction::ApprovalResponded, approval_entity(approval_id))
                    .old("status", json!(ApprovalStatus::Pending))
                    .new_value("status", json!(status))
                    .new_value("approver", json!(cmd.approver))
                    .new_value("role", json!(role))
                    .notes(cmd.notes),
            )
        })
        .await
    }

    // ── Release-level actions ───────────────────────────────────────────

    pub async fn hold_release(
        &self,
        release_id: ReleaseId,
        cmd: HoldRelease,
    ) -> ReleaseResult<BatchRelease> {
        cmd.validate()?;
        self.mutate(release_id, cmd.actor, move |release, now| {
            state_machine::ensure_open(release)?;
            if release.is_held() {
                return Err(ReleaseError::Validation(format!(
                    "release {} is already on hold",
                    release.id
                )));
            }
            release.hold = Some(HoldRecord {
                reason: cmd.reason.clone(),
                held_by: cmd.actor,
                held_at: now,
                prior_status: release.status,
            });

            Ok(
                Mutation::new(AuditAction::ReleaseHeld, AuditEntity::release(release.id))
                    .notes(Some(cmd.reason)),
            )
        })
        .await
    }

    pub async fn resume_release(
        &self,
        release_id: ReleaseId,
        cmd: ResumeRelease,
    ) -> ReleaseResult<BatchRelease> {
        self.mutate(release_id, cmd.actor, move |release, _now| {
            state_machine::ensure_open(release)?;
            let hold = release.hold.take().ok_or_else(|| {
                ReleaseError::Validation(format!("release {} is not on hold", release.id))
            })?;

            Ok(
                Mutation::new(AuditAction::ReleaseResumed, AuditEntity::release(release.id))
                    .old("hold_reason", json!(hold.reason))
                    .old("held_by", json!(hold.held_by))
                    .notes(cmd.notes),
            )
        })
        .await
    }

    /// Manually reject a release from any non-terminal status
    pub async fn reject_release(
        &self,
        release_id: ReleaseId,
        cmd: RejectRelease,
    ) -> ReleaseResult<BatchRelease> {
        cmd.validate()?;
        self.mutate(release_id, cmd.actor, move |release, now| {
            state_machine::ensure_open(release)?;
            release.hold = None;
            release.rejection = Some(RejectionRecord {
                reason: cmd.reason.clone(),
                rejected_by: cmd.actor,
                rejected_at: now,
            });

            Ok(
                Mutation::new(AuditAction::ReleaseRejected, AuditEntity::release(release.id))
                    .notes(Some(cmd.reason)),
            )
        })
        .await
    }

    /// Release an approved batch for distribution
    pub async fn finalize_release(
        &self,
        release_id: ReleaseId,
        cmd: FinalizeRelease,
    ) -> ReleaseResult<BatchRelease> {
        let actor = cmd.actor;
        let released = self
            .mutate(release_id, actor, move |release, now| {
                state_machine::ensure_approved(release)?;
                cmd.validate()?;

                let variance =
                    weight_variance_pct(release.lineage.expected_weight, cmd.actual_weight);
                release.actual_weight = Some(cmd.actual_weight);
                release.weight_variance_pct = variance;
                release.actual_completion_date = Some(now);
                release.released_by = Some(cmd.actor);

                Ok(
                    Mutation::new(AuditAction::ReleaseCompleted, AuditEntity::release(release.id))
                        .new_value("actual_weight", json!(cmd.actual_weight))
                        .new_value("expected_weight", json!(release.lineage.expected_weight))
                        .new_value("weight_variance_pct", json!(variance))
                        .new_value("actual_completion_date", json!(now))
                        .notes(cmd.notes),
                )
            })
            .await?;

        if let Some(queue) = &self.documents {
            let queued = queue.enqueue(DocumentJob {
                release_id,
                requested_at: self.clock.now(),
            });
            tracing::debug!(release_id = %release_id, queued, "Document generation requested");
        }
        Ok(released)
    }

    /// Attach a generated document. Allowed in any status.
    pub async fn attach_document(
        &self,
        release_id: ReleaseId,
        actor: UserId,
        draft: DocumentDraft,
    ) -> ReleaseResult<BatchRelease> {
        let document_id = self.ids.document();
        self.mutate(release_id, actor, move |release, now| {
            if release.documents.iter().any(|d| d.kind == draft.kind) {
                return Err(ReleaseError::Validation(format!(
                    "release {} already has a {}",
                    release.id, draft.kind
                )));
            }
            let document = ComplianceDocument::from_draft(document_id, draft, now);
            let mutation = Mutation::new(
                AuditAction::DocumentGenerated,
                AuditEntity::new(AuditEntityType::ComplianceDocument, document_id.value()),
            )
            .new_value("kind", json!(document.kind))
            .new_value("title", json!(document.title))
            .new_value("content_hash", json!(document.content_hash));
            release.documents.push(document);
            Ok(mutation)
        })
        .await
    }

    /// Append a correction referencing an earlier entry of the same release
    pub async fn record_correction(
        &self,
        release_id: ReleaseId,
        cmd: RecordCorrection,
    ) -> ReleaseResult<BatchRelease> {
        cmd.validate()?;
        self.load(release_id).await?;
        let corrected = self.audit.get_entry(release_id, cmd.corrects).await?;

        self.mutate(release_id, cmd.actor, move |_release, _now| {
            let mut mutation = Mutation::new(
                AuditAction::EntryCorrected,
                AuditEntity::new(AuditEntityType::AuditEntry, corrected.id.value()),
            )
            .old("action", json!(corrected.action))
            .notes(Some(cmd.notes));
            mutation.corrects = Some(corrected.id);
            Ok(mutation)
        })
        .await
    }

    // ── Queries ─────────────────────────────────────────────────────────

    pub async fn get_release(&self, release_id: ReleaseId) -> ReleaseResult<BatchRelease> {
        self.load(release_id).await
    }

    /// A release with its template, processing batch and audit trail
    pub async fn get_release_detail(&self, release_id: ReleaseId) -> ReleaseResult<ReleaseDetail> {
        let release = self.load(release_id).await?;
        let template = self.templates.resolve(release.template_id)?;
        let processing_batch = self
            .ledger
            .get_processing_batch(release.processing_batch_id)
            .await?;
        let audit_log = self
            .audit
            .list_for_release(release_id)
            .await?
            .entries()
            .await?;

        Ok(ReleaseDetail {
            release,
            template,
            processing_batch,
            audit_log,
        })
    }

    /// Release summaries, newest first
    pub async fn list_releases(&self, filter: &ReleaseFilter) -> ReleaseResult<Vec<ReleaseSummary>> {
        let releases = self
            .store
            .list_releases(filter, QueryWindow::default())
            .await?;
        Ok(releases.iter().map(ReleaseSummary::from).collect())
    }

    /// Releasable batches of a facility without an open release
    pub async fn available_batches(
        &self,
        facility_id: FacilityId,
    ) -> ReleaseResult<Vec<ProcessingBatch>> {
        let batches = self.ledger.list_processing_batches(facility_id).await?;
        let mut available = Vec::new();
        for batch in batches.into_iter().filter(ProcessingBatch::is_releasable) {
            if self.store.find_active_for_batch(batch.id).await?.is_none() {
                available.push(batch);
            }
        }
        Ok(available)
    }

    /// Released releases still lacking at least one of `kinds`
    pub async fn releases_missing_documents(
        &self,
        kinds: &[DocumentKind],
    ) -> ReleaseResult<Vec<ReleaseId>> {
        let filter = ReleaseFilter {
            facility_id: None,
            status: Some(ReleaseStatus::Released),
        };
        let releases = self
            .store
            .list_releases(&filter, QueryWindow::default())
            .await?;
        Ok(releases
            .iter()
            .filter(|r| {
                kinds
                    .iter()
                    .any(|kind| !r.documents.iter().any(|d| d.kind == *kind))
            })
            .map(|r| r.id)
            .collect())
    }

    pub fn status_options(&self) -> Vec<StatusOption> {
        StatusOption::all()
    }

    /// Counts and durations by status for releases initiated in the window
    pub async fn stats_by_status(
        &self,
        facility_id: FacilityId,
        window: Option<StatsWindow>,
    ) -> ReleaseResult<ReleaseStats> {
        let window = window.unwrap_or(StatsWindow::days(self.config.stats_window_days));
        let releases = self
            .store
            .list_releases(&ReleaseFilter::facility(facility_id), QueryWindow::default())
            .await?;
        Ok(stats::aggregate(&releases, self.clock.now(), window))
    }

    // ── Internals ───────────────────────────────────────────────────────

    async fn load(&self, release_id: ReleaseId) -> ReleaseResult<BatchRelease> {
        self.store
            .get_release(release_id)
            .await?
            .ok_or(ReleaseError::ReleaseNotFound(release_id))
    }

    /// Apply one mutation under the release lock and commit it atomically
    async fn mutate<F>(
        &self,
        release_id: ReleaseId,
        actor: UserId,
        apply: F,
    ) -> ReleaseResult<BatchRelease>
    where
        F: FnOnce(&mut BatchRelease, DateTime<Utc>) -> ReleaseResult<Mutation> + Send,
    {
        let guard = self.release_locks.lock(release_id).await;
        let current = self.load(release_id).await?;
        // entries of one release never go back in time, even if the wall clock does
        let now = self.clock.now().max(current.updated_at);

        let mut next = current.clone();
        let mutation = match apply(&mut next, now) {
            Ok(mutation) => mutation,
            Err(e) => {
                tracing::debug!(release_id = %release_id, error = %e, "Release mutation refused");
                return Err(e);
            }
        };
        let action = mutation.action;
        let transition = state_machine::settle(&mut next, now);

        let entry = self.build_entry(
            release_id,
            current.audit_head.clone(),
            actor,
            mutation,
            transition,
            now,
        )?;
        next.version = current.version + 1;
        next.updated_at = now;
        next.audit_head = Some(entry.hash.clone());

        self.store
            .commit(ReleaseCommit::update(next.clone(), entry, current.version))
            .await?;
        drop(guard);

        tracing::info!(
            release_id = %release_id,
            action = %action,
            from = %transition.from,
            to = %transition.to,
            version = next.version,
            "Release mutation committed"
        );
        if transition.changed() && transition.to.is_terminal() {
            self.release_locks.prune();
        }
        Ok(next)
    }

    fn build_entry(
        &self,
        release_id: ReleaseId,
        previous_hash: Option<String>,
        actor: UserId,
        mutation: Mutation,
        transition: Transition,
        now: DateTime<Utc>,
    ) -> ReleaseResult<AuditEntry> {
        let Mutation {
            action,
            entity,
            mut old_values,
            mut new_values,
            notes,
            corrects,
        } = mutation;

        if transition.changed() {
            old_values.insert("release_status".to_string(), json!(transition.from));
            new_values.insert("release_status".to_string(), json!(transition.to));
        }

        let mut entry = AuditEntry::new(self.ids.audit_entry(), release_id, actor, action, entity, now)
            .with_notes(notes);
        if !old_values.is_empty() {
            entry = entry.with_old_values(Value::Object(old_values));
        }
        if !new_values.is_empty() {
            entry = entry.with_new_values(Value::Object(new_values));
        }
        if let Some(corrected) = corrects {
            entry = entry.correcting(corrected);
        }
        entry.seal(previous_hash)
    }
}
