//! Interfaces to the systems the engine reads from
//!
//! The processing ledger owns batches and the identity provider owns roles.
//! In-memory versions back the demo daemon and the tests.

use async_trait::async_trait;
use parking_lot::RwLock;
use release_types::{
    FacilityId, ProcessingBatch, ProcessingBatchId, ReleaseError, ReleaseResult, Role, UserId,
};
use std::collections::HashMap;

/// Read access to finished processing batches
#[async_trait]
pub trait ProcessingLedger: Send + Sync {
    /// Fails with `ProcessingBatchNotFound` for unknown ids
    async fn get_processing_batch(&self, id: ProcessingBatchId) -> ReleaseResult<ProcessingBatch>;

    async fn list_processing_batches(
        &self,
        facility_id: FacilityId,
    ) -> ReleaseResult<Vec<ProcessingBatch>>;
}

/// Resolves the role a user acts under
#[async_trait]
pub trait RoleProvider: Send + Sync {
    /// Fails with `UserNotFound` for unknown users
    async fn role_of(&self, user: UserId) -> ReleaseResult<Role>;
}

// ── In-memory implementations ───────────────────────────────────────────

#[derive(Debug, Default)]
pub struct InMemoryProcessingLedger {
    batches: RwLock<HashMap<ProcessingBatchId, ProcessingBatch>>,
}

impl InMemoryProcessingLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, batch: ProcessingBatch) {
        self.batches.write().insert(batch.id, batch);
    }

    pub fn with_batches(batches: impl IntoIterator<Item = ProcessingBatch>) -> Self {
        let ledger = Self::new();
        for batch in batches {
            ledger.insert(batch);
        }
        ledger
    }
}

#[async_trait]
impl ProcessingLedger for InMemoryProcessingLedger {
    async fn get_processing_batch(&self, id: ProcessingBatchId) -> ReleaseResult<ProcessingBatch> {
        self.batches
            .read()
            .get(&id)
            .cloned()
            .ok_or(ReleaseError::ProcessingBatchNotFound(id))
    }

    async fn list_processing_batches(
        &self,
        facility_id: FacilityId,
    ) -> ReleaseResult<Vec<ProcessingBatch>> {
        let mut batches: Vec<ProcessingBatch> = self
            .batches
            .read()
            .values()
            .filter(|b| b.facility_id == facility_id)
            .cloned()
            .collect();
        batches.sort_by_key(|b| b.id);
        Ok(batches)
    }
}

/// User → role assignments
#[derive(Debug, Default)]
pub struct RoleDirectory {
    roles: RwLock<HashMap<UserId, Role>>,
}

impl RoleDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn assign(&self, user: UserId, role: impl Into<String>) {
        self.roles.write().insert(user, Role::new(role));
    }

    pub fn with_assignments<R: Into<String>>(
        assignments: impl IntoIterator<Item = (UserId, R)>,
    ) -> Self {
        let directory = Self::new();
        for (user, role) in assignments {
            directory.assign(user, role);
        }
        directory
    }
}

#[async_trait]
impl RoleProvider for RoleDirectory {
    async fn role_of(&self, user: UserId) -> ReleaseResult<Role> {
        self.roles
            .read()
            .get(&user)
            .cloned()
            .ok_or(ReleaseError::UserNotFound(user))
    }
}
