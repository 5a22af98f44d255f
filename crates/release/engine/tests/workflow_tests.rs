mod common;

use chrono::{DateTime, Duration, Utc};
use common::*;
use release_types::*;

#[tokio::test]
async fn scenario_pending_to_released() {
    let h = Harness::new();
    let template = h.scenario_template();

    let release = h.initiate(&template, 1).await;
    assert_eq!(release.status, ReleaseStatus::Pending);
    assert_eq!(release.release_number, "REL-2501-0001");
    assert_eq!(release.checkpoints.len(), 2);
    assert_eq!(release.target_completion_date, start_time() + Duration::hours(48));
    assert!(release.actual_completion_date.is_none());

    h.clock.advance(Duration::hours(2));
    let r = h.pass(&release, 0).await.unwrap();
    assert_eq!(r.status, ReleaseStatus::InProgress);

    h.clock.advance(Duration::hours(2));
    let r = h.pass(&release, 1).await.unwrap();
    assert_eq!(r.status, ReleaseStatus::InProgress);

    let r = h.approve(&release, 0, QA).await.unwrap();
    assert_eq!(r.status, ReleaseStatus::Approved);
    assert!(r.approved_at.is_some());

    h.clock.advance(Duration::hours(1));
    let r = h
        .engine
        .finalize_release(release.id, FinalizeRelease::new(MANAGER, 1398.5))
        .await
        .unwrap();
    assert_eq!(r.status, ReleaseStatus::Released);
    assert_eq!(r.actual_completion_date, Some(start_time() + Duration::hours(5)));
    assert_eq!(r.actual_weight, Some(1398.5));
    assert_eq!(r.weight_variance_pct, Some(-0.11));
    assert_eq!(r.released_by, Some(MANAGER));

    // initiate + 2 checkpoints + approval + finalize
    assert_eq!(h.audit_count(release.id).await, 5);
}

#[tokio::test]
async fn checkpoint_two_before_one_is_out_of_order() {
    let h = Harness::new();
    let template = h.scenario_template();
    let release = h.initiate(&template, 1).await;

    let err = h.pass(&release, 1).await.unwrap_err();
    assert_eq!(
        err,
        ReleaseError::OutOfOrder {
            release: release.id,
            checkpoint: release.checkpoints[1].id,
            blocking_order: 1,
        }
    );
    assert_eq!(h.audit_count(release.id).await, 1);

    h.pass(&release, 0).await.unwrap();
    let r = h.pass(&release, 1).await.unwrap();
    assert_eq!(r.checkpoints[1].status, CheckpointStatus::Passed);
}

#[tokio::test]
async fn start_is_gated_and_stamps_inspector() {
    let h = Harness::new();
    let template = h.scenario_template();
    let release = h.initiate(&template, 1).await;

    let err = h
        .engine
        .start_checkpoint(
            release.id,
            release.checkpoints[1].id,
            StartCheckpoint {
                inspector: INSPECTOR,
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::OutOfOrder);

    let r = h
        .engine
        .start_checkpoint(
            release.id,
            release.checkpoints[0].id,
            StartCheckpoint {
                inspector: INSPECTOR,
            },
        )
        .await
        .unwrap();
    assert_eq!(r.status, ReleaseStatus::InProgress);
    assert_eq!(r.checkpoints[0].inspector, Some(INSPECTOR));
    assert_eq!(r.checkpoints[0].started_at, Some(start_time()));

    let again = h
        .engine
        .start_checkpoint(
            release.id,
            release.checkpoints[0].id,
            StartCheckpoint {
                inspector: INSPECTOR,
            },
        )
        .await;
    assert!(matches!(again, Err(ReleaseError::Validation(_))));

    h.clock.advance(Duration::minutes(90));
    let r = h.pass(&release, 0).await.unwrap();
    // completion keeps the recorded start
    assert_eq!(r.checkpoints[0].started_at, Some(start_time()));
    assert_eq!(
        r.checkpoints[0].completed_at,
        Some(start_time() + Duration::minutes(90))
    );
}

#[tokio::test]
async fn optional_checkpoints_skip_and_do_not_gate() {
    let h = Harness::new();
    let template = h.optional_template();
    let release = h.initiate(&template, 1).await;

    h.pass(&release, 0).await.unwrap();
    // optional #2 still pending, #3 is not blocked by it
    h.pass(&release, 2).await.unwrap();

    let err = h
        .engine
        .skip_checkpoint(
            release.id,
            release.checkpoints[0].id,
            SkipCheckpoint {
                actor: INSPECTOR,
                reason: "n/a".into(),
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AlreadyDecided);

    let r = h
        .engine
        .skip_checkpoint(
            release.id,
            release.checkpoints[1].id,
            SkipCheckpoint {
                actor: INSPECTOR,
                reason: "Moisture verified during curing".into(),
            },
        )
        .await
        .unwrap();
    assert_eq!(r.checkpoints[1].status, CheckpointStatus::Skipped);

    let r = h.approve(&release, 0, QA).await.unwrap();
    assert_eq!(r.status, ReleaseStatus::Approved);
}

#[tokio::test]
async fn required_checkpoint_cannot_be_skipped() {
    let h = Harness::new();
    let template = h.optional_template();
    let release = h.initiate(&template, 1).await;

    let err = h
        .engine
        .skip_checkpoint(
            release.id,
            release.checkpoints[0].id,
            SkipCheckpoint {
                actor: INSPECTOR,
                reason: "busy".into(),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ReleaseError::Validation(_)));
}

#[tokio::test]
async fn failed_optional_checkpoint_keeps_release_alive() {
    let h = Harness::new();
    let template = h.optional_template();
    let release = h.initiate(&template, 1).await;
    h.pass(&release, 0).await.unwrap();

    let r = h
        .engine
        .complete_checkpoint(
            release.id,
            release.checkpoints[1].id,
            CompleteCheckpoint::failed(INSPECTOR, "13.4% moisture"),
        )
        .await
        .unwrap();
    assert_eq!(r.status, ReleaseStatus::InProgress);
}

#[tokio::test]
async fn failed_required_checkpoint_rejects_release() {
    let h = Harness::new();
    let template = h.scenario_template();
    let release = h.initiate(&template, 1).await;

    let r = h
        .engine
        .complete_checkpoint(
            release.id,
            release.checkpoints[0].id,
            CompleteCheckpoint::failed(INSPECTOR, "Mold detected"),
        )
        .await
        .unwrap();
    assert_eq!(r.status, ReleaseStatus::Rejected);
    assert!(r.closed_at.is_some());

    let err = h.pass(&release, 1).await.unwrap_err();
    assert!(matches!(err, ReleaseError::ReleaseClosed { .. }));
}

#[tokio::test]
async fn rejected_approval_fails_fast() {
    let h = Harness::new();
    let template = h.dual_approval_template();
    let release = h.initiate(&template, 1).await;

    let r = h
        .engine
        .record_approval_decision(
            release.id,
            release.approvals[1].id,
            RecordApprovalDecision::reject(COMPLIANCE, "Missing COA"),
        )
        .await
        .unwrap();
    assert_eq!(r.status, ReleaseStatus::Rejected);

    let err = h.approve(&release, 0, QA).await.unwrap_err();
    assert_eq!(
        err,
        ReleaseError::ReleaseClosed {
            release: release.id,
            status: ReleaseStatus::Rejected,
        }
    );
}

#[tokio::test]
async fn approval_errors_follow_check_order() {
    let h = Harness::new();
    let template = h.dual_approval_template();
    let release = h.initiate(&template, 1).await;

    let err = h.approve(&release, 0, COMPLIANCE).await.unwrap_err();
    assert!(matches!(err, ReleaseError::RoleMismatch { .. }));

    h.approve(&release, 0, QA).await.unwrap();
    // already decided wins over the role check
    let err = h.approve(&release, 0, COMPLIANCE).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AlreadyDecided);

    let err = h
        .engine
        .record_approval_decision(
            release.id,
            ApprovalId(999),
            RecordApprovalDecision::approve(QA),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ReleaseError::ApprovalNotFound { .. }));

    let err = h
        .engine
        .record_approval_decision(
            release.id,
            release.approvals[1].id,
            RecordApprovalDecision::approve(UserId(404)),
        )
        .await
        .unwrap_err();
    assert_eq!(err, ReleaseError::UserNotFound(UserId(404)));
}

#[tokio::test]
async fn identical_resubmission_is_already_decided() {
    let h = Harness::new();
    let template = h.scenario_template();
    let release = h.initiate(&template, 1).await;
    h.pass(&release, 0).await.unwrap();

    let err = h.pass(&release, 0).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AlreadyDecided);
    assert_eq!(h.audit_count(release.id).await, 2);
}

#[tokio::test]
async fn request_approval_is_recorded_once() {
    let h = Harness::new();
    let template = h.scenario_template();
    let release = h.initiate(&template, 1).await;
    let cmd = RequestApproval { actor: MANAGER };

    let r = h
        .engine
        .request_approval(release.id, release.approvals[0].id, cmd.clone())
        .await
        .unwrap();
    assert_eq!(r.status, ReleaseStatus::InProgress);
    assert_eq!(r.approvals[0].requested_at, Some(start_time()));

    let err = h
        .engine
        .request_approval(release.id, release.approvals[0].id, cmd.clone())
        .await
        .unwrap_err();
    assert!(matches!(err, ReleaseError::Validation(_)));

    h.approve(&release, 0, QA).await.unwrap();
    let err = h
        .engine
        .request_approval(release.id, release.approvals[0].id, cmd)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AlreadyDecided);
}

#[tokio::test]
async fn finalize_requires_approved_and_succeeds_once() {
    let h = Harness::new();
    let template = h.scenario_template();
    let release = h.initiate(&template, 1).await;
    h.pass(&release, 0).await.unwrap();

    let err = h
        .engine
        .finalize_release(release.id, FinalizeRelease::new(MANAGER, 1398.5))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        ReleaseError::NotApproved {
            release: release.id,
            status: ReleaseStatus::InProgress,
        }
    );

    let release = h.approved_release(2).await;
    h.engine
        .finalize_release(release.id, FinalizeRelease::new(MANAGER, 1398.5))
        .await
        .unwrap();
    let err = h
        .engine
        .finalize_release(release.id, FinalizeRelease::new(MANAGER, 1398.5))
        .await
        .unwrap_err();
    assert!(matches!(err, ReleaseError::ReleaseClosed { .. }));
}

#[tokio::test]
async fn finalize_rejects_bad_weight_after_status_checks() {
    let h = Harness::new();
    let release = h.approved_release(1).await;

    let err = h
        .engine
        .finalize_release(release.id, FinalizeRelease::new(MANAGER, -1.0))
        .await
        .unwrap_err();
    assert!(matches!(err, ReleaseError::Validation(_)));
    let stored = h.engine.get_release(release.id).await.unwrap();
    assert_eq!(stored.status, ReleaseStatus::Approved);
}

#[tokio::test]
async fn hold_blocks_mutations_and_resume_restores_status() {
    let h = Harness::new();
    let template = h.scenario_template();
    let release = h.initiate(&template, 1).await;
    h.pass(&release, 0).await.unwrap();

    let held = h
        .engine
        .hold_release(
            release.id,
            HoldRelease {
                actor: MANAGER,
                reason: "Label recheck".into(),
            },
        )
        .await
        .unwrap();
    assert_eq!(held.status, ReleaseStatus::OnHold);
    assert_eq!(
        held.hold.as_ref().map(|h| h.prior_status),
        Some(ReleaseStatus::InProgress)
    );

    let err = h.pass(&release, 1).await.unwrap_err();
    assert_eq!(err, ReleaseError::OnHold(release.id));

    let again = h
        .engine
        .hold_release(
            release.id,
            HoldRelease {
                actor: MANAGER,
                reason: "twice".into(),
            },
        )
        .await;
    assert!(matches!(again, Err(ReleaseError::Validation(_))));

    let resumed = h
        .engine
        .resume_release(
            release.id,
            ResumeRelease {
                actor: MANAGER,
                notes: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(resumed.status, ReleaseStatus::InProgress);
    assert!(resumed.hold.is_none());

    let err = h
        .engine
        .resume_release(
            release.id,
            ResumeRelease {
                actor: MANAGER,
                notes: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ReleaseError::Validation(_)));

    h.pass(&release, 1).await.unwrap();
}

#[tokio::test]
async fn held_approved_release_cannot_finalize() {
    let h = Harness::new();
    let release = h.approved_release(1).await;
    h.engine
        .hold_release(
            release.id,
            HoldRelease {
                actor: MANAGER,
                reason: "Customer complaint".into(),
            },
        )
        .await
        .unwrap();

    let err = h
        .engine
        .finalize_release(release.id, FinalizeRelease::new(MANAGER, 1398.5))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotApproved);

    let resumed = h
        .engine
        .resume_release(
            release.id,
            ResumeRelease {
                actor: MANAGER,
                notes: Some("Complaint unfounded".into()),
            },
        )
        .await
        .unwrap();
    assert_eq!(resumed.status, ReleaseStatus::Approved);
}

#[tokio::test]
async fn manual_reject_closes_held_release() {
    let h = Harness::new();
    let template = h.scenario_template();
    let release = h.initiate(&template, 1).await;
    h.engine
        .hold_release(
            release.id,
            HoldRelease {
                actor: MANAGER,
                reason: "Contamination suspected".into(),
            },
        )
        .await
        .unwrap();

    let r = h
        .engine
        .reject_release(
            release.id,
            RejectRelease {
                actor: MANAGER,
                reason: "Contamination confirmed".into(),
            },
        )
        .await
        .unwrap();
    assert_eq!(r.status, ReleaseStatus::Rejected);
    assert!(r.hold.is_none());

    let err = h
        .engine
        .hold_release(
            release.id,
            HoldRelease {
                actor: MANAGER,
                reason: "late".into(),
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ReleaseClosed);

    // the batch can be released again under a fresh release
    let retry = h.initiate(&h.scenario_template(), 1).await;
    assert_ne!(retry.id, release.id);
}

#[tokio::test]
async fn initiation_preconditions() {
    let h = Harness::new();
    let template = h.scenario_template();
    let first = h.initiate(&template, 1).await;

    let duplicate = h
        .engine
        .initiate_release(InitiateRelease {
            template_id: template.id,
            processing_batch_id: ProcessingBatchId(1),
            initiated_by: MANAGER,
            notes: None,
        })
        .await;
    assert_eq!(
        duplicate.unwrap_err(),
        ReleaseError::DuplicateActiveRelease {
            batch: ProcessingBatchId(1),
            release: first.id,
        }
    );

    let not_ready = h
        .engine
        .initiate_release(InitiateRelease {
            template_id: template.id,
            processing_batch_id: ProcessingBatchId(7),
            initiated_by: MANAGER,
            notes: None,
        })
        .await;
    assert!(matches!(
        not_ready,
        Err(ReleaseError::BatchNotReleasable { ref status, .. }) if status == "in_progress"
    ));

    let wrong_product = h
        .engine
        .initiate_release(InitiateRelease {
            template_id: template.id,
            processing_batch_id: ProcessingBatchId(8),
            initiated_by: MANAGER,
            notes: None,
        })
        .await;
    assert!(matches!(wrong_product, Err(ReleaseError::Validation(_))));

    let missing = h
        .engine
        .initiate_release(InitiateRelease {
            template_id: TemplateId(99),
            processing_batch_id: ProcessingBatchId(2),
            initiated_by: MANAGER,
            notes: None,
        })
        .await;
    assert_eq!(missing.unwrap_err().kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn unbounded_durations_are_refused_without_panicking() {
    let h = Harness::new();
    let forever = h.engine.register_template(
        TemplateDraft::new(FacilityId(1), "Forever", ProductType::Flower)
            .with_checkpoint(CheckpointSpec::new(
                CheckpointType::VisualInspection,
                "Visual Inspection",
                1,
            ))
            .with_estimated_duration(u32::MAX),
    );
    assert_eq!(forever.unwrap_err().kind(), ErrorKind::InvalidTemplate);

    // a valid duration can still overflow near the end of representable time
    let template = h.scenario_template();
    h.clock.set(DateTime::<Utc>::MAX_UTC - Duration::hours(1));
    let err = h
        .engine
        .initiate_release(InitiateRelease {
            template_id: template.id,
            processing_batch_id: ProcessingBatchId(1),
            initiated_by: MANAGER,
            notes: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, ReleaseError::Validation(_)));
    assert!(h
        .engine
        .list_releases(&ReleaseFilter::facility(FacilityId(1)))
        .await
        .unwrap()
        .is_empty());

    h.clock.set(start_time());
    let release = h.initiate(&template, 1).await;
    assert_eq!(release.release_number, "REL-2501-0001");
}

#[tokio::test]
async fn releases_keep_their_template_after_republish() {
    let h = Harness::new();
    let v1 = h.scenario_template();
    let release = h.initiate(&v1, 1).await;

    let v2 = h
        .engine
        .republish_template(
            v1.id,
            TemplateDraft::new(FacilityId(1), "Standard Flower Release", ProductType::Flower)
                .with_checkpoint(CheckpointSpec::new(
                    CheckpointType::LabTesting,
                    "Lab Testing",
                    1,
                ))
                .with_approval(ApprovalSpec::new("qa_manager", 1)),
        )
        .unwrap();
    assert_eq!(v2.supersedes, Some(v1.id));

    let detail = h.engine.get_release_detail(release.id).await.unwrap();
    assert_eq!(detail.template.id, v1.id);
    assert_eq!(detail.template.checkpoints.len(), 2);
    assert_eq!(detail.release.checkpoints.len(), 2);
}

#[tokio::test]
async fn audit_count_equals_accepted_mutations() {
    let h = Harness::new();
    let template = h.dual_approval_template();
    let release = h.initiate(&template, 1).await;
    let mut accepted = 1;

    // interleave accepted and refused operations
    assert!(h.pass(&release, 1).await.is_err());
    h.pass(&release, 0).await.unwrap();
    accepted += 1;
    assert!(h.pass(&release, 0).await.is_err());
    assert!(h.approve(&release, 0, COMPLIANCE).await.is_err());
    h.approve(&release, 0, QA).await.unwrap();
    accepted += 1;
    h.engine
        .hold_release(
            release.id,
            HoldRelease {
                actor: MANAGER,
                reason: "pause".into(),
            },
        )
        .await
        .unwrap();
    accepted += 1;
    assert!(h.approve(&release, 1, COMPLIANCE).await.is_err());
    h.engine
        .resume_release(
            release.id,
            ResumeRelease {
                actor: MANAGER,
                notes: None,
            },
        )
        .await
        .unwrap();
    accepted += 1;
    h.pass(&release, 1).await.unwrap();
    accepted += 1;
    h.approve(&release, 1, COMPLIANCE).await.unwrap();
    accepted += 1;

    assert_eq!(h.audit_count(release.id).await, accepted);

    let trail = h
        .engine
        .audit_log()
        .list_for_release(release.id)
        .await
        .unwrap();
    let actions: Vec<AuditAction> = trail
        .entries()
        .await
        .unwrap()
        .iter()
        .map(|e| e.action)
        .collect();
    assert_eq!(
        actions,
        vec![
            AuditAction::ReleaseInitiated,
            AuditAction::CheckpointCompleted,
            AuditAction::ApprovalResponded,
            AuditAction::ReleaseHeld,
            AuditAction::ReleaseResumed,
            AuditAction::CheckpointCompleted,
            AuditAction::ApprovalResponded,
        ]
    );
    assert!(trail.verify().await.unwrap().is_intact());
}

#[tokio::test]
async fn audit_order_survives_the_clock_stepping_back() {
    let h = Harness::new();
    let template = h.scenario_template();
    let release = h.initiate(&template, 1).await;

    h.clock.advance(Duration::seconds(10));
    h.pass(&release, 0).await.unwrap();
    h.clock.advance(Duration::seconds(-20));
    let r = h.pass(&release, 1).await.unwrap();
    assert_eq!(
        r.checkpoints[1].completed_at,
        Some(start_time() + Duration::seconds(10))
    );
    assert!(r.updated_at >= r.initiated_at);

    let trail = h.engine.audit_log().list_for_release(release.id).await.unwrap();
    let entries = trail.entries().await.unwrap();
    let actions: Vec<_> = entries.iter().map(|e| e.action).collect();
    assert_eq!(
        actions,
        vec![
            AuditAction::ReleaseInitiated,
            AuditAction::CheckpointCompleted,
            AuditAction::CheckpointCompleted,
        ]
    );
    assert!(entries
        .windows(2)
        .all(|pair| pair[0].timestamp <= pair[1].timestamp));
    assert!(trail.verify().await.unwrap().is_intact());
}

#[tokio::test]
async fn audit_entries_record_status_transitions() {
    let h = Harness::new();
    let template = h.scenario_template();
    let release = h.initiate(&template, 1).await;
    h.pass(&release, 0).await.unwrap();

    let entries = h
        .engine
        .audit_log()
        .list_for_release(release.id)
        .await
        .unwrap()
        .entries()
        .await
        .unwrap();
    let completed = &entries[1];
    assert_eq!(completed.entity.entity_type, AuditEntityType::CheckpointResult);
    assert_eq!(completed.actor, INSPECTOR);
    assert_eq!(
        completed.old_values.as_ref().unwrap()["release_status"],
        "pending"
    );
    assert_eq!(
        completed.new_values.as_ref().unwrap()["release_status"],
        "in_progress"
    );
    assert_eq!(completed.previous_hash.as_deref(), Some(entries[0].hash.as_str()));
}

#[tokio::test]
async fn corrections_reference_existing_entries() {
    let h = Harness::new();
    let release = h.approved_release(1).await;
    h.engine
        .finalize_release(release.id, FinalizeRelease::new(MANAGER, 1398.5))
        .await
        .unwrap();

    let entries = h
        .engine
        .audit_log()
        .list_for_release(release.id)
        .await
        .unwrap()
        .entries()
        .await
        .unwrap();
    let target = entries[1].id;

    // allowed on a terminal release
    let r = h
        .engine
        .record_correction(
            release.id,
            RecordCorrection {
                actor: QA,
                corrects: target,
                notes: "Inspector id was mistyped".into(),
            },
        )
        .await
        .unwrap();
    assert_eq!(r.status, ReleaseStatus::Released);

    let entries = h
        .engine
        .audit_log()
        .list_for_release(release.id)
        .await
        .unwrap()
        .entries()
        .await
        .unwrap();
    let correction = entries.last().unwrap();
    assert_eq!(correction.action, AuditAction::EntryCorrected);
    assert_eq!(correction.corrects, Some(target));

    let err = h
        .engine
        .record_correction(
            release.id,
            RecordCorrection {
                actor: QA,
                corrects: AuditEntryId(9_999),
                notes: "nothing".into(),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ReleaseError::AuditEntryNotFound { .. }));
}

#[tokio::test]
async fn listing_detail_and_available_batches() {
    let h = Harness::new();
    let template = h.scenario_template();
    let a = h.initiate(&template, 1).await;
    h.clock.advance(Duration::minutes(5));
    let b = h.initiate(&template, 2).await;
    h.pass(&b, 0).await.unwrap();

    let all = h
        .engine
        .list_releases(&ReleaseFilter::facility(FacilityId(1)))
        .await
        .unwrap();
    let ids: Vec<_> = all.iter().map(|s| s.id).collect();
    assert_eq!(ids, vec![b.id, a.id]);
    assert_eq!(all[0].checkpoint_progress.completed_checkpoints, 1);
    assert_eq!(all[0].checkpoint_progress.total_checkpoints, 2);

    let pending = h
        .engine
        .list_releases(&ReleaseFilter::facility(FacilityId(1)).with_status(ReleaseStatus::Pending))
        .await
        .unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].id, a.id);

    let detail = h.engine.get_release_detail(b.id).await.unwrap();
    assert_eq!(detail.processing_batch.id, ProcessingBatchId(2));
    assert_eq!(detail.audit_log.len(), 2);

    let available: Vec<_> = h
        .engine
        .available_batches(FacilityId(1))
        .await
        .unwrap()
        .iter()
        .map(|b| b.id.value())
        .collect();
    assert_eq!(available, vec![3, 4, 5, 6, 8]);

    assert_eq!(
        h.engine.get_release(ReleaseId(404)).await.unwrap_err(),
        ReleaseError::ReleaseNotFound(ReleaseId(404))
    );
}

#[tokio::test]
async fn stats_by_status() {
    let h = Harness::new();
    let released = h.approved_release(1).await;
    h.clock.advance(Duration::hours(42));
    h.engine
        .finalize_release(released.id, FinalizeRelease::new(MANAGER, 1400.0))
        .await
        .unwrap();

    let template = h.scenario_template();
    let pending = h.initiate(&template, 2).await;
    assert_eq!(pending.status, ReleaseStatus::Pending);

    let stats = h.engine.stats_by_status(FacilityId(1), None).await.unwrap();
    assert_eq!(stats.total_releases, 2);
    assert_eq!(stats.time_range_days, 30);
    let released_row = stats
        .by_status
        .iter()
        .find(|s| s.status == ReleaseStatus::Released)
        .unwrap();
    assert_eq!(released_row.count, 1);
    assert_eq!(released_row.avg_duration_hours, Some(42.0));

    h.clock.advance(Duration::days(45));
    let stats = h
        .engine
        .stats_by_status(FacilityId(1), Some(StatsWindow::days(30)))
        .await
        .unwrap();
    assert_eq!(stats.total_releases, 0);
    assert_eq!(stats.by_status.len(), 6);
}
