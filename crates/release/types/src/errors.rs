use crate::{
    ApprovalId, AuditEntryId, CheckpointResultId, ProcessingBatchId, ReleaseId, ReleaseStatus,
    Role, TemplateId, UserId,
};
use serde::{Deserialize, Serialize};

/// Errors that can occur in release workflow operations
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ReleaseError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid template: {0}")]
    InvalidTemplate(String),

    #[error("Template not found: {0}")]
    TemplateNotFound(TemplateId),

    #[error("Release not found: {0}")]
    ReleaseNotFound(ReleaseId),

    #[error("Checkpoint {checkpoint} not found in release {release}")]
    CheckpointNotFound {
        release: ReleaseId,
        checkpoint: CheckpointResultId,
    },

    #[error("Approval {approval} not found in release {release}")]
    ApprovalNotFound {
        release: ReleaseId,
        approval: ApprovalId,
    },

    #[error("Processing batch not found: {0}")]
    ProcessingBatchNotFound(ProcessingBatchId),

    #[error("User not found: {0}")]
    UserNotFound(UserId),

    #[error("Audit entry {entry} not found in release {release}")]
    AuditEntryNotFound {
        release: ReleaseId,
        entry: AuditEntryId,
    },

    #[error("Processing batch {batch} is not releasable (status: {status})")]
    BatchNotReleasable {
        batch: ProcessingBatchId,
        status: String,
    },

    #[error("Processing batch {batch} already has active release {release}")]
    DuplicateActiveRelease {
        batch: ProcessingBatchId,
        release: ReleaseId,
    },

    #[error(
        "Checkpoint {checkpoint} of release {release} is out of order: required checkpoint #{blocking_order} is unresolved"
    )]
    OutOfOrder {
        release: ReleaseId,
        checkpoint: CheckpointResultId,
        blocking_order: u32,
    },

    #[error(
        "Approval {approval} of release {release} requires role '{required}', approver has '{actual}'"
    )]
    RoleMismatch {
        release: ReleaseId,
        approval: ApprovalId,
        required: Role,
        actual: Role,
    },

    #[error("{entity} of release {release} is already decided")]
    AlreadyDecided { release: ReleaseId, entity: String },

    #[error("Release {release} is closed (status: {status})")]
    ReleaseClosed {
        release: ReleaseId,
        status: ReleaseStatus,
    },

    #[error("Release {0} is on hold")]
    OnHold(ReleaseId),

    #[error("Release {release} is not approved (status: {status})")]
    NotApproved {
        release: ReleaseId,
        status: ReleaseStatus,
    },

    #[error("Service unavailable: {0}")]
    Unavailable(String),
}

impl ReleaseError {
    /// The taxonomy bucket this error belongs to
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::InvalidTemplate(_) => ErrorKind::InvalidTemplate,
            Self::TemplateNotFound(_)
            | Self::ReleaseNotFound(_)
            | Self::CheckpointNotFound { .. }
            | Self::ApprovalNotFound { .. }
            | Self::ProcessingBatchNotFound(_)
            | Self::UserNotFound(_)
            | Self::AuditEntryNotFound { .. } => ErrorKind::NotFound,
            Self::BatchNotReleasable { .. } => ErrorKind::BatchNotReleasable,
            Self::DuplicateActiveRelease { .. } => ErrorKind::DuplicateActiveRelease,
            Self::OutOfOrder { .. } => ErrorKind::OutOfOrder,
            Self::RoleMismatch { .. } => ErrorKind::RoleMismatch,
            Self::AlreadyDecided { .. } => ErrorKind::AlreadyDecided,
            Self::ReleaseClosed { .. } => ErrorKind::ReleaseClosed,
            Self::OnHold(_) => ErrorKind::OnHold,
            Self::NotApproved { .. } => ErrorKind::NotApproved,
            Self::Unavailable(_) => ErrorKind::Unavailable,
        }
    }

    /// Only infrastructure failures may be retried; business rules never are.
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Unavailable
    }
}

/// Coarse error taxonomy exposed to callers
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    InvalidTemplate,
    NotFound,
    BatchNotReleasable,
    DuplicateActiveRelease,
    OutOfOrder,
    RoleMismatch,
    AlreadyDecided,
    ReleaseClosed,
    OnHold,
    NotApproved,
    Unavailable,
}

impl ErrorKind {
    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation => "VALIDATION_ERROR",
            Self::InvalidTemplate => "INVALID_TEMPLATE",
            Self::NotFound => "NOT_FOUND",
            Self::BatchNotReleasable => "BATCH_NOT_RELEASABLE",
            Self::DuplicateActiveRelease => "DUPLICATE_ACTIVE_RELEASE",
            Self::OutOfOrder => "OUT_OF_ORDER",
            Self::RoleMismatch => "ROLE_MISMATCH",
            Self::AlreadyDecided => "ALREADY_DECIDED",
            Self::ReleaseClosed => "RELEASE_CLOSED",
            Self::OnHold => "ON_HOLD",
            Self::NotApproved => "NOT_APPROVED",
            Self::Unavailable => "UNAVAILABLE",
        }
    }
}

/// Result type alias for release operations
pub type ReleaseResult<T> = Result<T, ReleaseError>;
