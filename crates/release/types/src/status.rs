//! Status enumerations for releases, checkpoints and approvals

use serde::{Deserialize, Serialize};

/// Aggregate status of a batch release
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReleaseStatus {
    Pending,
    InProgress,
    OnHold,
    Approved,
    Released,
    Rejected,
}

impl ReleaseStatus {
    /// Canonical presentation order
    pub const ALL: [ReleaseStatus; 6] = [
        ReleaseStatus::Pending,
        ReleaseStatus::InProgress,
        ReleaseStatus::OnHold,
        ReleaseStatus::Approved,
        ReleaseStatus::Released,
        ReleaseStatus::Rejected,
    ];

    /// Released and rejected releases accept no further workflow mutation
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Released | Self::Rejected)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::OnHold => "on_hold",
            Self::Approved => "approved",
            Self::Released => "released",
            Self::Rejected => "rejected",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::InProgress => "In Progress",
            Self::OnHold => "On Hold",
            Self::Approved => "Approved",
            Self::Released => "Released",
            Self::Rejected => "Rejected",
        }
    }

    /// Badge color used by the release dashboards
    pub fn color(&self) -> &'static str {
        match self {
            Self::Pending => "#6B7280",
            Self::InProgress => "#F59E0B",
            Self::OnHold => "#EF4444",
            Self::Approved => "#10B981",
            Self::Released => "#059669",
            Self::Rejected => "#DC2626",
        }
    }
}

impl std::fmt::Display for ReleaseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ReleaseStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("unknown release status '{}'", s))
    }
}

/// One entry of the status options listing
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StatusOption {
    pub status: ReleaseStatus,
    pub name: String,
    pub color: String,
}

impl StatusOption {
    pub fn all() -> Vec<StatusOption> {
        ReleaseStatus::ALL
            .into_iter()
            .map(|status| StatusOption {
                status,
                name: status.display_name().to_string(),
                color: status.color().to_string(),
            })
            .collect()
    }
}

/// Status of a single checkpoint result
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckpointStatus {
    Pending,
    Passed,
    Failed,
    Skipped,
}

impl CheckpointStatus {
    pub fn is_decided(&self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// Passed or skipped checkpoints no longer gate later ones
    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Passed | Self::Skipped)
    }
}

impl std::fmt::Display for CheckpointStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Passed => "passed",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        };
        f.write_str(s)
    }
}

/// Status of a single approval
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
}

impl ApprovalStatus {
    pub fn is_decided(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl std::fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        };
        f.write_str(s)
    }
}

/// A decision submitted by an approver
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalDecision {
    Approved,
    Rejected,
}

impl From<ApprovalDecision> for ApprovalStatus {
    fn from(decision: ApprovalDecision) -> Self {
        match decision {
            ApprovalDecision::Approved => ApprovalStatus::Approved,
            ApprovalDecision::Rejected => ApprovalStatus::Rejected,
        }
    }
}
