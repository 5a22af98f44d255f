//! In-memory reference implementation of the release storage traits.
//!
//! Deterministic and test-friendly. All state sits behind a single lock so a
//! commit validates every precondition before touching anything.

use crate::traits::{AuditStore, QueryWindow, ReleaseCommit, ReleaseStore};
use crate::{StorageError, StorageResult};
use async_trait::async_trait;
use parking_lot::RwLock;
use release_types::{
    AuditEntry, AuditEntryId, BatchRelease, ProcessingBatchId, ReleaseFilter, ReleaseId,
};
use std::collections::{HashMap, HashSet};

#[derive(Default)]
struct Inner {
    releases: HashMap<ReleaseId, BatchRelease>,
    audits: HashMap<ReleaseId, Vec<AuditEntry>>,
    release_numbers: HashSet<String>,
}

/// In-memory release storage adapter.
#[derive(Default)]
pub struct InMemoryReleaseStore {
    inner: RwLock<Inner>,
}

impl InMemoryReleaseStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of audit entries across all releases
    pub fn audit_len(&self) -> usize {
        self.inner.read().audits.values().map(Vec::len).sum()
    }
}

impl Inner {
    fn check_commit(&self, commit: &ReleaseCommit) -> StorageResult<()> {
        self.check_version(commit)?;
        self.check_chain(commit)
    }

    fn check_version(&self, commit: &ReleaseCommit) -> StorageResult<()> {
        let release = &commit.release;
        match (commit.expected_version, self.releases.get(&release.id)) {
            (None, Some(_)) => Err(StorageError::Conflict(format!(
                "release {} already exists",
                release.id
            ))),
            (None, None) => {
                if self.release_numbers.contains(&release.release_number) {
                    return Err(StorageError::Conflict(format!(
                        "release number {} already taken",
                        release.release_number
                    )));
                }
                Ok(())
            }
            (Some(_), None) => Err(StorageError::NotFound(format!(
                "release {} not found",
                release.id
            ))),
            (Some(expected), Some(stored)) => {
                if stored.version != expected {
                    return Err(StorageError::Conflict(format!(
                        "release {} is at version {}, expected {}",
                        release.id, stored.version, expected
                    )));
                }
                if release.version != expected + 1 {
                    return Err(StorageError::InvariantViolation(format!(
                        "release {} must advance to version {}, got {}",
                        release.id,
                        expected + 1,
                        release.version
                    )));
                }
                if stored.release_number != release.release_number {
                    return Err(StorageError::InvariantViolation(format!(
                        "release number of {} is immutable",
                        release.id
                    )));
                }
                Ok(())
            }
        }
    }

    fn check_chain(&self, commit: &ReleaseCommit) -> StorageResult<()> {
        let release = &commit.release;
        let entry = &commit.entry;

        if entry.release_id != release.id {
            return Err(StorageError::InvalidInput(format!(
                "audit entry {} belongs to release {}, not {}",
                entry.id, entry.release_id, release.id
            )));
        }
        if release.audit_head.as_deref() != Some(entry.hash.as_str()) {
            return Err(StorageError::InvariantViolation(format!(
                "release {} audit head does not match entry {}",
                release.id, entry.id
            )));
        }

        let chain = self.audits.get(&release.id);
        if chain.map_or(false, |c| c.iter().any(|e| e.id == entry.id)) {
            return Err(StorageError::Conflict(format!(
                "audit entry {} already recorded",
                entry.id
            )));
        }
        let previous_hash = chain.and_then(|c| c.last()).map(|e| e.hash.as_str());
        if entry.previous_hash.as_deref() != previous_hash {
            return Err(StorageError::InvariantViolation(format!(
                "audit entry {} does not extend the chain of release {}",
                entry.id, release.id
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl ReleaseStore for InMemoryReleaseStore {
    async fn commit(&self, commit: ReleaseCommit) -> StorageResult<()> {
        let mut guard = self.inner.write();
        guard.check_commit(&commit)?;

        let ReleaseCommit { release, entry, .. } = commit;
        tracing::trace!(
            release_id = %release.id,
            version = release.version,
            action = %entry.action,
            "Committing release snapshot"
        );
        guard.release_numbers.insert(release.release_number.clone());
        guard.audits.entry(release.id).or_default().push(entry);
        guard.releases.insert(release.id, release);
        Ok(())
    }

    async fn get_release(&self, id: ReleaseId) -> StorageResult<Option<BatchRelease>> {
        Ok(self.inner.read().releases.get(&id).cloned())
    }

    async fn list_releases(
        &self,
        filter: &ReleaseFilter,
        window: QueryWindow,
    ) -> StorageResult<Vec<BatchRelease>> {
        let mut items: Vec<BatchRelease> = self
            .inner
            .read()
            .releases
            .values()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        items.sort_by(|a, b| {
            b.initiated_at
                .cmp(&a.initiated_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(apply_window(items, window))
    }

    async fn find_active_for_batch(
        &self,
        batch: ProcessingBatchId,
    ) -> StorageResult<Option<BatchRelease>> {
        Ok(self
            .inner
            .read()
            .releases
            .values()
            .find(|r| r.processing_batch_id == batch && !r.status.is_terminal())
            .cloned())
    }

    async fn release_number_exists(&self, release_number: &str) -> StorageResult<bool> {
        Ok(self.inner.read().release_numbers.contains(release_number))
    }
}

#[async_trait]
impl AuditStore for InMemoryReleaseStore {
    async fn list_audit(
        &self,
        release: ReleaseId,
        window: QueryWindow,
    ) -> StorageResult<Vec<AuditEntry>> {
        let mut items = self
            .inner
            .read()
            .audits
            .get(&release)
            .cloned()
            .unwrap_or_default();
        items.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then_with(|| a.id.cmp(&b.id)));
        Ok(apply_window(items, window))
    }

    async fn get_audit(
        &self,
        release: ReleaseId,
        entry: AuditEntryId,
    ) -> StorageResult<Option<AuditEntry>> {
        Ok(self
            .inner
            .read()
            .audits
            .get(&release)
            .and_then(|chain| chain.iter().find(|e| e.id == entry))
            .cloned())
    }

    async fn count_audit(&self, release: ReleaseId) -> StorageResult<usize> {
        Ok(self.inner.read().audits.get(&release).map_or(0, Vec::len))
    }
}

fn apply_window<T>(items: Vec<T>, window: QueryWindow) -> Vec<T> {
    let iter = items.into_iter().skip(window.offset);
    if window.limit == 0 {
        iter.collect()
    } else {
        iter.take(window.limit).collect()
    }
}
