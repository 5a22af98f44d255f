//! Identifiers
//!
//! All identifiers are numeric and allocated by a monotonic sequence, which
//! keeps fixtures and test expectations reproducible.

use serde::{Deserialize, Serialize};

macro_rules! numeric_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl $name {
            pub fn new(id: u64) -> Self {
                Self(id)
            }

            pub fn value(&self) -> u64 {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u64> for $name {
            fn from(id: u64) -> Self {
                Self(id)
            }
        }
    };
}

numeric_id!(
    /// Identifier of a registered release template
    TemplateId
);
numeric_id!(
    /// Identifier of a batch release
    ReleaseId
);
numeric_id!(
    /// Identifier of one checkpoint result inside a release
    CheckpointResultId
);
numeric_id!(
    /// Identifier of one approval inside a release
    ApprovalId
);
numeric_id!(
    /// Identifier of an audit entry
    AuditEntryId
);
numeric_id!(
    /// Identifier of a processing batch owned by the processing ledger
    ProcessingBatchId
);
numeric_id!(
    /// Identifier of a facility
    FacilityId
);
numeric_id!(
    /// Identifier of a user, as issued by the identity provider
    UserId
);
numeric_id!(
    /// Identifier of a generated compliance document
    DocumentId
);

/// A named role, e.g. `qa_manager` or `compliance_officer`
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Role(pub String);

impl Role {
    pub fn new(role: impl Into<String>) -> Self {
        Self(role.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
