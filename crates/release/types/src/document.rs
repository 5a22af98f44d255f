//! Compliance documents attached to a release

use crate::DocumentId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    /// Certificate that the lot passed release
    ReleaseCertificate,
    /// Per-checkpoint inspection outcomes
    InspectionSummary,
}

impl std::fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ReleaseCertificate => f.write_str("release_certificate"),
            Self::InspectionSummary => f.write_str("inspection_summary"),
        }
    }
}

/// Rendered document contents, before the engine assigns id and time
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DocumentDraft {
    pub kind: DocumentKind,
    pub title: String,
    pub body: serde_json::Value,
}

/// A generated document
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ComplianceDocument {
    pub id: DocumentId,
    pub kind: DocumentKind,
    pub title: String,
    pub body: serde_json::Value,
    /// blake3 hash of the serialized body
    pub content_hash: String,
    pub generated_at: DateTime<Utc>,
}

impl ComplianceDocument {
    pub fn new(
        id: DocumentId,
        kind: DocumentKind,
        title: impl Into<String>,
        body: serde_json::Value,
        generated_at: DateTime<Utc>,
    ) -> Self {
        let content_hash = blake3::hash(body.to_string().as_bytes())
            .to_hex()
            .to_string();
        Self {
            id,
            kind,
            title: title.into(),
            body,
            content_hash,
            generated_at,
        }
    }

    pub fn from_draft(id: DocumentId, draft: DocumentDraft, generated_at: DateTime<Utc>) -> Self {
        Self::new(id, draft.kind, draft.title, draft.body, generated_at)
    }

    pub fn verify(&self) -> bool {
        blake3::hash(self.body.to_string().as_bytes()).to_hex().as_str() == self.content_hash
    }
}
