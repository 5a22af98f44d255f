//! State machine: guards and status settlement for releases
//!
//! Status is never assigned. Each mutation edits checkpoints, approvals or
//! the hold/reject records, then [`settle`] recomputes the status and stamps
//! the timestamps that depend on entering a status.
//!
//! Guards run in a fixed order so callers always see the same error for the
//! same situation: release closed, release held, child missing, child
//! already decided, then the rule specific to the operation.

use chrono::{DateTime, Utc};
use release_types::{
    Approval, ApprovalId, BatchRelease, CheckpointResult, CheckpointResultId, ReleaseError,
    ReleaseResult, ReleaseStatus, Role,
};

/// A status change produced by one mutation
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Transition {
    pub from: ReleaseStatus,
    pub to: ReleaseStatus,
}

impl Transition {
    pub fn changed(&self) -> bool {
        self.from != self.to
    }
}

// ── Guards ──────────────────────────────────────────────────────────────

/// Terminal releases accept no workflow mutation
pub fn ensure_open(release: &BatchRelease) -> ReleaseResult<()> {
    if release.status.is_terminal() {
        return Err(ReleaseError::ReleaseClosed {
            release: release.id,
            status: release.status,
        });
    }
    Ok(())
}

/// Held releases accept no checkpoint or approval mutation
pub fn ensure_not_held(release: &BatchRelease) -> ReleaseResult<()> {
    if release.is_held() {
        return Err(ReleaseError::OnHold(release.id));
    }
    Ok(())
}

/// An undecided checkpoint of an open, unheld release
pub fn open_checkpoint(
    release: &BatchRelease,
    id: CheckpointResultId,
) -> ReleaseResult<&CheckpointResult> {
    ensure_open(release)?;
    ensure_not_held(release)?;
    let checkpoint = release
        .checkpoint(id)
        .ok_or(ReleaseError::CheckpointNotFound {
            release: release.id,
            checkpoint: id,
        })?;
    if checkpoint.status.is_decided() {
        return Err(ReleaseError::AlreadyDecided {
            release: release.id,
            entity: format!("checkpoint {} ({})", id, checkpoint.status),
        });
    }
    Ok(checkpoint)
}

/// Lower-order required checkpoints must be passed or skipped first
pub fn ensure_in_order(release: &BatchRelease, checkpoint: &CheckpointResult) -> ReleaseResult<()> {
    if let Some(blocker) = release.gating_blocker(checkpoint.order_sequence) {
        return Err(ReleaseError::OutOfOrder {
            release: release.id,
            checkpoint: checkpoint.id,
            blocking_order: blocker.order_sequence,
        });
    }
    Ok(())
}

/// An undecided approval of an open, unheld release
pub fn open_approval(release: &BatchRelease, id: ApprovalId) -> ReleaseResult<&Approval> {
    ensure_open(release)?;
    ensure_not_held(release)?;
    let approval = release.approval(id).ok_or(ReleaseError::ApprovalNotFound {
        release: release.id,
        approval: id,
    })?;
    if approval.status.is_decided() {
        return Err(ReleaseError::AlreadyDecided {
            release: release.id,
            entity: format!("approval {} ({})", id, approval.status),
        });
    }
    Ok(approval)
}

pub fn ensure_role(release: &BatchRelease, approval: &Approval, actual: &Role) -> ReleaseResult<()> {
    if &approval.required_role != actual {
        return Err(ReleaseError::RoleMismatch {
            release: release.id,
            approval: approval.id,
            required: approval.required_role.clone(),
            actual: actual.clone(),
        });
    }
    Ok(())
}

/// Finalize is legal only from `approved`
pub fn ensure_approved(release: &BatchRelease) -> ReleaseResult<()> {
    ensure_open(release)?;
    if release.status != ReleaseStatus::Approved {
        return Err(ReleaseError::NotApproved {
            release: release.id,
            status: release.status,
        });
    }
    Ok(())
}

// ── Settlement ──────────────────────────────────────────────────────────

/// Recompute the status of a mutated release
pub fn settle(release: &mut BatchRelease, now: DateTime<Utc>) -> Transition {
    let from = release.status;
    let to = release.derived_status();

    if to == ReleaseStatus::Approved && release.approved_at.is_none() {
        release.approved_at = Some(now);
    }
    if to.is_terminal() && release.closed_at.is_none() {
        release.closed_at = Some(now);
        // a terminal release cannot stay held
        release.hold = None;
    }
    release.status = to;
    Transition { from, to }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::sample_release;
    use release_types::{ApprovalStatus, CheckpointStatus, HoldRecord, UserId};

    #[test]
    fn test_guard_order_closed_before_missing() {
        let mut release = sample_release();
        release.status = ReleaseStatus::Rejected;
        let err = open_checkpoint(&release, CheckpointResultId(999)).unwrap_err();
        assert!(matches!(err, ReleaseError::ReleaseClosed { .. }));
    }

    #[test]
    fn test_guard_order_held_before_decided() {
        let mut release = sample_release();
        release.checkpoints[0].status = CheckpointStatus::Passed;
        release.hold = Some(HoldRecord {
            reason: "recount".into(),
            held_by: UserId(1),
            held_at: Utc::now(),
            prior_status: ReleaseStatus::InProgress,
        });
        let id = release.checkpoints[0].id;
        assert_eq!(
            open_checkpoint(&release, id).unwrap_err(),
            ReleaseError::OnHold(release.id)
        );
    }

    #[test]
    fn test_out_of_order_names_blocker() {
        let release = sample_release();
        let second = release.checkpoints[1].clone();
        let err = ensure_in_order(&release, &second).unwrap_err();
        assert!(matches!(
            err,
            ReleaseError::OutOfOrder {
                blocking_order: 1,
                ..
            }
        ));
    }

    #[test]
    fn test_settle_stamps_terminal_fields() {
        let mut release = sample_release();
        release.approvals[0].status = ApprovalStatus::Rejected;
        let now = Utc::now();
        let transition = settle(&mut release, now);
        assert_eq!(transition.to, ReleaseStatus::Rejected);
        assert!(transition.changed());
        assert_eq!(release.closed_at, Some(now));
        assert!(release.approved_at.is_none());
    }

    #[test]
    fn test_settle_keeps_first_approval_time() {
        let mut release = sample_release();
        for checkpoint in &mut release.checkpoints {
            checkpoint.status = CheckpointStatus::Passed;
        }
        release.approvals[0].status = ApprovalStatus::Approved;
        let first = Utc::now();
        settle(&mut release, first);
        assert_eq!(release.approved_at, Some(first));

        settle(&mut release, first + chrono::Duration::hours(1));
        assert_eq!(release.approved_at, Some(first));
    }
}
