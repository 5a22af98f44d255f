use crate::StorageResult;
use async_trait::async_trait;
use release_types::{
    AuditEntry, AuditEntryId, BatchRelease, ProcessingBatchId, ReleaseFilter, ReleaseId,
};

/// Generic query window for paged reads.
///
/// A `limit` of zero means "no limit".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueryWindow {
    pub limit: usize,
    pub offset: usize,
}

impl QueryWindow {
    pub fn page(offset: usize, limit: usize) -> Self {
        Self { limit, offset }
    }
}

/// One atomic unit of work: the new release snapshot and the audit entry
/// describing the mutation that produced it.
#[derive(Debug, Clone)]
pub struct ReleaseCommit {
    pub release: BatchRelease,
    pub entry: AuditEntry,
    /// Version the caller read before mutating. `None` creates the release.
    pub expected_version: Option<u64>,
}

impl ReleaseCommit {
    pub fn create(release: BatchRelease, entry: AuditEntry) -> Self {
        Self {
            release,
            entry,
            expected_version: None,
        }
    }

    pub fn update(release: BatchRelease, entry: AuditEntry, expected_version: u64) -> Self {
        Self {
            release,
            entry,
            expected_version: Some(expected_version),
        }
    }
}

/// Storage interface for release aggregates.
#[async_trait]
pub trait ReleaseStore: Send + Sync {
    /// Persist a release snapshot together with its audit entry.
    ///
    /// Either both become visible or neither does. Fails with `Conflict`
    /// when the stored version differs from `expected_version`.
    async fn commit(&self, commit: ReleaseCommit) -> StorageResult<()>;

    /// Get one release by id.
    async fn get_release(&self, id: ReleaseId) -> StorageResult<Option<BatchRelease>>;

    /// List releases matching the filter, newest first.
    async fn list_releases(
        &self,
        filter: &ReleaseFilter,
        window: QueryWindow,
    ) -> StorageResult<Vec<BatchRelease>>;

    /// The non-terminal release of a processing batch, if one is open.
    async fn find_active_for_batch(
        &self,
        batch: ProcessingBatchId,
    ) -> StorageResult<Option<BatchRelease>>;

    /// Whether a release number is already taken.
    async fn release_number_exists(&self, release_number: &str) -> StorageResult<bool>;
}

/// Read interface for the append-only audit trail.
///
/// Entries are written only through [`ReleaseStore::commit`].
#[async_trait]
pub trait AuditStore: Send + Sync {
    /// Read entries of one release ordered by (timestamp, id) ascending.
    async fn list_audit(
        &self,
        release: ReleaseId,
        window: QueryWindow,
    ) -> StorageResult<Vec<AuditEntry>>;

    /// Get one entry of a release.
    async fn get_audit(
        &self,
        release: ReleaseId,
        entry: AuditEntryId,
    ) -> StorageResult<Option<AuditEntry>>;

    /// Number of entries recorded for a release.
    async fn count_audit(&self, release: ReleaseId) -> StorageResult<usize>;
}

/// Unified storage bundle used by the release engine.
pub trait ReleaseRepository: ReleaseStore + AuditStore + Send + Sync {}

impl<T> ReleaseRepository for T where T: ReleaseStore + AuditStore + Send + Sync {}
