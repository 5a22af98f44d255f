//! Audit log: read access to the per-release audit chains
//!
//! Entries are appended only by the engine's atomic commit. Reading goes
//! through an [`AuditTrail`], a restartable handle that pages through
//! storage lazily.

use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use release_store::{QueryWindow, ReleaseRepository};
use release_types::{AuditEntry, AuditEntryId, ReleaseError, ReleaseId, ReleaseResult};
use serde::Serialize;
use std::sync::Arc;

/// Outcome of re-walking a release's hash chain
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum ChainVerification {
    Intact { entries: usize },
    Broken { entry: AuditEntryId, reason: String },
}

impl ChainVerification {
    pub fn is_intact(&self) -> bool {
        matches!(self, Self::Intact { .. })
    }
}

/// Read side of the audit log
#[derive(Clone)]
pub struct AuditLog {
    store: Arc<dyn ReleaseRepository>,
    page_size: usize,
}

impl AuditLog {
    pub fn new(store: Arc<dyn ReleaseRepository>, page_size: usize) -> Self {
        Self {
            store,
            page_size: page_size.max(1),
        }
    }

    /// Trail of one release. Fails with `ReleaseNotFound` for unknown ids.
    pub async fn list_for_release(&self, release_id: ReleaseId) -> ReleaseResult<AuditTrail> {
        if self.store.get_release(release_id).await?.is_none() {
            return Err(ReleaseError::ReleaseNotFound(release_id));
        }
        Ok(AuditTrail {
            store: self.store.clone(),
            release_id,
            page_size: self.page_size,
        })
    }

    /// Number of entries recorded for a release
    pub async fn count(&self, release_id: ReleaseId) -> ReleaseResult<usize> {
        Ok(self.store.count_audit(release_id).await?)
    }

    pub async fn get_entry(
        &self,
        release_id: ReleaseId,
        entry: AuditEntryId,
    ) -> ReleaseResult<AuditEntry> {
        self.store
            .get_audit(release_id, entry)
            .await?
            .ok_or(ReleaseError::AuditEntryNotFound {
                release: release_id,
                entry,
            })
    }
}

/// Lazy, restartable view over the entries of one release
#[derive(Clone)]
pub struct AuditTrail {
    store: Arc<dyn ReleaseRepository>,
    release_id: ReleaseId,
    page_size: usize,
}

impl AuditTrail {
    pub fn release_id(&self) -> ReleaseId {
        self.release_id
    }

    /// Entries ordered by (timestamp, id). Each call starts from the first
    /// entry; pages are fetched as the stream is polled.
    pub fn stream(&self) -> BoxStream<'static, ReleaseResult<AuditEntry>> {
        let store = self.store.clone();
        let release_id = self.release_id;
        let page_size = self.page_size;

        stream::unfold(Some(0usize), move |offset| {
            let store = store.clone();
            async move {
                let offset = offset?;
                match store
                    .list_audit(release_id, QueryWindow::page(offset, page_size))
                    .await
                {
                    Ok(entries) => {
                        let next = if entries.len() < page_size {
                            None
                        } else {
                            Some(offset + entries.len())
                        };
                        Some((Ok(entries), next))
                    }
                    Err(e) => Some((Err(ReleaseError::from(e)), None)),
                }
            }
        })
        .map(|page| match page {
            Ok(entries) => entries.into_iter().map(Ok).collect::<Vec<_>>(),
            Err(e) => vec![Err(e)],
        })
        .flat_map(stream::iter)
        .boxed()
    }

    /// Drain the stream into a vector
    pub async fn entries(&self) -> ReleaseResult<Vec<AuditEntry>> {
        self.stream().try_collect().await
    }

    /// Recompute every hash and check each link to its predecessor
    pub async fn verify(&self) -> ReleaseResult<ChainVerification> {
        let mut previous: Option<String> = None;
        let mut count = 0;
        let mut entries = self.stream();

        while let Some(entry) = entries.next().await {
            let entry = entry?;
            if entry.previous_hash != previous {
                return Ok(ChainVerification::Broken {
                    entry: entry.id,
                    reason: "previous hash does not match predecessor".to_string(),
                });
            }
            if !entry.verify() {
                return Ok(ChainVerification::Broken {
                    entry: entry.id,
                    reason: "content does not match hash".to_string(),
                });
            }
            previous = Some(entry.hash);
            count += 1;
        }

        Ok(ChainVerification::Intact { entries: count })
    }
}

impl std::fmt::Debug for AuditTrail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditTrail")
            .field("release_id", &self.release_id)
            .field("page_size", &self.page_size)
            .finish()
    }
}
