//! Approval handlers

use super::{ok, ApiResponse};
use crate::api::rest::extract::ApiJson;
use crate::api::rest::state::AppState;
use axum::extract::{Path, State};
use release_types::{ApprovalId, BatchRelease, RecordApprovalDecision, ReleaseId, RequestApproval};

pub async fn request_approval(
    State(state): State<AppState>,
    Path((release_id, approval_id)): Path<(ReleaseId, ApprovalId)>,
    ApiJson(cmd): ApiJson<RequestApproval>,
) -> ApiResponse<BatchRelease> {
    ok(state
        .engine
        .request_approval(release_id, approval_id, cmd)
        .await?)
}

/// Approve or reject
pub async fn record_approval_decision(
    State(state): State<AppState>,
    Path((release_id, approval_id)): Path<(ReleaseId, ApprovalId)>,
    ApiJson(cmd): ApiJson<RecordApprovalDecision>,
) -> ApiResponse<BatchRelease> {
    ok(state
        .engine
        .record_approval_decision(release_id, approval_id, cmd)
        .await?)
}
