//! Compliance document generation
//!
//! Finalizing a release enqueues a [`DocumentJob`] once the release lock is
//! gone. A [`DocumentWorker`] drains the queue, renders each document with
//! the registered generators and reports the result back to the engine,
//! which records it as an audited mutation of its own.
//!
//! The queue is only a fast path. The worker also sweeps for released
//! releases that still lack a document kind, on start, on every
//! `sweep_interval` and once more before it stops, so a job dropped on a
//! full queue or left behind at shutdown is picked up again.

use crate::engine::ReleaseEngine;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use release_types::{
    BatchRelease, ComplianceDocument, DocumentDraft, DocumentKind, ReleaseId, ReleaseResult,
    UserId,
};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;

/// Default period between sweeps for releases missing documents
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Request to render the documents of one release
#[derive(Clone, Debug, PartialEq)]
pub struct DocumentJob {
    pub release_id: ReleaseId,
    pub requested_at: DateTime<Utc>,
}

/// Sending half of the document queue
#[derive(Clone, Debug)]
pub struct DocumentQueue {
    tx: mpsc::Sender<DocumentJob>,
}

impl DocumentQueue {
    /// Returns false when the queue is full or the worker is gone. The
    /// worker's next sweep covers a job that was not queued.
    pub fn enqueue(&self, job: DocumentJob) -> bool {
        match self.tx.try_send(job) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    "Document job not queued, deferring to the next sweep"
                );
                false
            }
        }
    }
}

/// A bounded document queue and its receiving half
pub fn document_queue(capacity: usize) -> (DocumentQueue, mpsc::Receiver<DocumentJob>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (DocumentQueue { tx }, rx)
}

/// Renders one kind of document for a release
#[async_trait]
pub trait DocumentGenerator: Send + Sync {
    fn kind(&self) -> DocumentKind;

    async fn generate(&self, release: &BatchRelease) -> ReleaseResult<DocumentDraft>;
}

/// Certificate stating the lot passed release
#[derive(Clone, Copy, Debug, Default)]
pub struct ReleaseCertificateGenerator;

#[async_trait]
impl DocumentGenerator for ReleaseCertificateGenerator {
    fn kind(&self) -> DocumentKind {
        DocumentKind::ReleaseCertificate
    }

    async fn generate(&self, release: &BatchRelease) -> ReleaseResult<DocumentDraft> {
        let approvals: Vec<_> = release
            .approvals
            .iter()
            .map(|a| {
                serde_json::json!({
                    "approval_level": a.approval_level,
                    "role": a.required_role,
                    "approver": a.approver,
                    "status": a.status,
                    "responded_at": a.responded_at,
                })
            })
            .collect();

        Ok(DocumentDraft {
            kind: DocumentKind::ReleaseCertificate,
            title: format!("Release Certificate {}", release.release_number),
            body: serde_json::json!({
                "release_number": release.release_number,
                "facility_id": release.facility_id,
                "processing_batch_number": release.lineage.processing_batch_number,
                "processing_type": release.lineage.processing_type,
                "product_type": release.lineage.product_type,
                "strain_name": release.lineage.strain_name,
                "template_name": release.lineage.template_name,
                "template_version": release.lineage.template_version,
                "expected_weight": release.lineage.expected_weight,
                "actual_weight": release.actual_weight,
                "weight_variance_pct": release.weight_variance_pct,
                "initiated_at": release.initiated_at,
                "released_at": release.actual_completion_date,
                "released_by": release.released_by,
                "approvals": approvals,
            }),
        })
    }
}

/// Per-checkpoint outcomes of a release
#[derive(Clone, Copy, Debug, Default)]
pub struct InspectionSummaryGenerator;

#[async_trait]
impl DocumentGenerator for InspectionSummaryGenerator {
    fn kind(&self) -> DocumentKind {
        DocumentKind::InspectionSummary
    }

    async fn generate(&self, release: &BatchRelease) -> ReleaseResult<DocumentDraft> {
        let checkpoints: Vec<_> = release
            .checkpoints
            .iter()
            .map(|c| {
                serde_json::json!({
                    "order_sequence": c.order_sequence,
                    "name": c.name,
                    "checkpoint_type": c.checkpoint_type,
                    "required": c.required,
                    "status": c.status,
                    "inspector": c.inspector,
                    "completed_at": c.completed_at,
                    "inspection_data": c.inspection_data,
                    "notes": c.notes,
                })
            })
            .collect();

        Ok(DocumentDraft {
            kind: DocumentKind::InspectionSummary,
            title: format!("Inspection Summary {}", release.release_number),
            body: serde_json::json!({
                "release_number": release.release_number,
                "checkpoints": checkpoints,
            }),
        })
    }
}

/// Drains the document queue
pub struct DocumentWorker {
    engine: Arc<ReleaseEngine>,
    jobs: mpsc::Receiver<DocumentJob>,
    generators: Vec<Arc<dyn DocumentGenerator>>,
    actor: UserId,
    sweep_interval: Duration,
}

impl DocumentWorker {
    /// Worker with the certificate and inspection summary generators,
    /// reporting as the system user `0`
    pub fn new(engine: Arc<ReleaseEngine>, jobs: mpsc::Receiver<DocumentJob>) -> Self {
        Self {
            engine,
            jobs,
            generators: vec![
                Arc::new(ReleaseCertificateGenerator),
                Arc::new(InspectionSummaryGenerator),
            ],
            actor: UserId(0),
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
        }
    }

    pub fn with_generators(mut self, generators: Vec<Arc<dyn DocumentGenerator>>) -> Self {
        self.generators = generators;
        self
    }

    pub fn with_actor(mut self, actor: UserId) -> Self {
        self.actor = actor;
        self
    }

    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval.max(Duration::from_millis(1));
        self
    }

    /// Process jobs until every queue sender is dropped
    pub async fn run(self) {
        self.run_until(std::future::pending::<()>()).await
    }

    /// Process jobs and sweep until `shutdown` resolves or every queue
    /// sender is dropped, then drain what is still queued
    pub async fn run_until<F>(mut self, shutdown: F)
    where
        F: Future<Output = ()> + Send,
    {
        tracing::info!(
            generators = self.generators.len(),
            sweep_interval_ms = self.sweep_interval.as_millis() as u64,
            "Document worker started"
        );

        // the first tick fires at once
        let mut sweep = tokio::time::interval(self.sweep_interval);
        sweep.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = sweep.tick() => {
                    self.sweep().await;
                }
                job = self.jobs.recv() => match job {
                    Some(job) => self.handle(&job).await,
                    None => break,
                },
            }
        }

        self.jobs.close();
        let mut drained = 0usize;
        while let Ok(job) = self.jobs.try_recv() {
            self.handle(&job).await;
            drained += 1;
        }
        let swept = self.sweep().await;
        tracing::info!(drained, swept, "Document worker stopped");
    }

    async fn handle(&self, job: &DocumentJob) {
        if let Err(e) = self.process(job).await {
            tracing::warn!(release_id = %job.release_id, error = %e, "Document job failed");
        }
    }

    /// Attach missing documents to every released release. Returns the
    /// number of documents attached.
    pub async fn sweep(&self) -> usize {
        let kinds: Vec<DocumentKind> = self.generators.iter().map(|g| g.kind()).collect();
        let pending = match self.engine.releases_missing_documents(&kinds).await {
            Ok(pending) => pending,
            Err(e) => {
                tracing::warn!(error = %e, "Document sweep failed");
                return 0;
            }
        };

        let mut attached = 0;
        for release_id in pending {
            let job = DocumentJob {
                release_id,
                requested_at: self.engine.clock().now(),
            };
            match self.process(&job).await {
                Ok(documents) => attached += documents.len(),
                Err(e) => {
                    tracing::warn!(release_id = %release_id, error = %e, "Document sweep job failed")
                }
            }
        }
        if attached > 0 {
            tracing::info!(attached, "Document sweep attached missing documents");
        }
        attached
    }

    /// Render and attach every document the release does not have yet
    pub async fn process(&self, job: &DocumentJob) -> ReleaseResult<Vec<ComplianceDocument>> {
        let release = self.engine.get_release(job.release_id).await?;
        let mut attached = Vec::new();

        for generator in &self.generators {
            if release.documents.iter().any(|d| d.kind == generator.kind()) {
                tracing::debug!(
                    release_id = %release.id,
                    kind = %generator.kind(),
                    "Document already attached"
                );
                continue;
            }
            let draft = generator.generate(&release).await?;
            let updated = self
                .engine
                .attach_document(release.id, self.actor, draft)
                .await?;
            if let Some(document) = updated.documents.last() {
                attached.push(document.clone());
            }
        }

        Ok(attached)
    }
}
