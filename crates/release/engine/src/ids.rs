//! Identifier and release-number allocation
//!
//! Ids come from monotonic counters. Release numbers follow
//! `<prefix>-YYMM-NNNN` with a sequence that restarts every month and skips
//! numbers the store already knows.

use chrono::{DateTime, Datelike, Utc};
use parking_lot::Mutex;
use release_store::ReleaseStore;
use release_types::{
    ApprovalId, AuditEntryId, CheckpointResultId, DocumentId, ReleaseId, ReleaseResult,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// A monotonic counter starting at 1
#[derive(Debug)]
pub struct IdSequence {
    next: AtomicU64,
}

impl IdSequence {
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    pub fn starting_at(first: u64) -> Self {
        Self {
            next: AtomicU64::new(first),
        }
    }

    pub fn next(&self) -> u64 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }
}

impl Default for IdSequence {
    fn default() -> Self {
        Self::new()
    }
}

/// One sequence per identifier kind
#[derive(Debug, Default)]
pub struct IdAllocator {
    releases: IdSequence,
    checkpoints: IdSequence,
    approvals: IdSequence,
    audit_entries: IdSequence,
    documents: IdSequence,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn release(&self) -> ReleaseId {
        ReleaseId(self.releases.next())
    }

    pub fn checkpoint(&self) -> CheckpointResultId {
        CheckpointResultId(self.checkpoints.next())
    }

    pub fn approval(&self) -> ApprovalId {
        ApprovalId(self.approvals.next())
    }

    pub fn audit_entry(&self) -> AuditEntryId {
        AuditEntryId(self.audit_entries.next())
    }

    pub fn document(&self) -> DocumentId {
        DocumentId(self.documents.next())
    }
}

/// Formats collision-checked release numbers
#[derive(Debug)]
pub struct ReleaseNumberFormatter {
    prefix: String,
    /// Last sequence handed out per (year, month)
    counters: Mutex<HashMap<(i32, u32), u32>>,
}

impl ReleaseNumberFormatter {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            counters: Mutex::new(HashMap::new()),
        }
    }

    pub fn format(&self, at: DateTime<Utc>, sequence: u32) -> String {
        format!(
            "{}-{:02}{:02}-{:04}",
            self.prefix,
            at.year() % 100,
            at.month(),
            sequence
        )
    }

    fn bump(&self, at: DateTime<Utc>) -> u32 {
        let mut counters = self.counters.lock();
        let counter = counters.entry((at.year(), at.month())).or_insert(0);
        *counter += 1;
        *counter
    }

    /// Next free release number for the month of `at`
    pub async fn next<S>(&self, at: DateTime<Utc>, store: &S) -> ReleaseResult<String>
    where
        S: ReleaseStore + ?Sized,
    {
        loop {
            let candidate = self.format(at, self.bump(at));
            if !store.release_number_exists(&candidate).await? {
                return Ok(candidate);
            }
            tracing::debug!(release_number = %candidate, "Release number taken, skipping");
        }
    }
}

impl Default for ReleaseNumberFormatter {
    fn default() -> Self {
        Self::new("REL")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use release_store::InMemoryReleaseStore;

    #[test]
    fn test_sequences_are_monotonic() {
        let ids = IdAllocator::new();
        assert_eq!(ids.release(), ReleaseId(1));
        assert_eq!(ids.release(), ReleaseId(2));
        assert_eq!(ids.checkpoint(), CheckpointResultId(1));
    }

    #[test]
    fn test_format() {
        let formatter = ReleaseNumberFormatter::default();
        let at = Utc.with_ymd_and_hms(2025, 1, 28, 9, 0, 0).unwrap();
        assert_eq!(formatter.format(at, 7), "REL-2501-0007");
    }

    #[tokio::test]
    async fn test_sequence_restarts_each_month() {
        let store = InMemoryReleaseStore::new();
        let formatter = ReleaseNumberFormatter::default();
        let jan = Utc.with_ymd_and_hms(2025, 1, 28, 9, 0, 0).unwrap();
        let feb = Utc.with_ymd_and_hms(2025, 2, 1, 9, 0, 0).unwrap();

        assert_eq!(formatter.next(jan, &store).await.unwrap(), "REL-2501-0001");
        assert_eq!(formatter.next(jan, &store).await.unwrap(), "REL-2501-0002");
        assert_eq!(formatter.next(feb, &store).await.unwrap(), "REL-2502-0001");
    }
}
