//! Checkpoint handlers

use super::{ok, ApiResponse};
use crate::api::rest::extract::ApiJson;
use crate::api::rest::state::AppState;
use axum::extract::{Path, State};
use release_types::{
    BatchRelease, CheckpointResultId, CompleteCheckpoint, ReleaseId, SkipCheckpoint,
    StartCheckpoint,
};

pub async fn start_checkpoint(
    State(state): State<AppState>,
    Path((release_id, checkpoint_id)): Path<(ReleaseId, CheckpointResultId)>,
    ApiJson(cmd): ApiJson<StartCheckpoint>,
) -> ApiResponse<BatchRelease> {
    ok(state
        .engine
        .start_checkpoint(release_id, checkpoint_id, cmd)
        .await?)
}

/// Pass or fail a checkpoint
pub async fn complete_checkpoint(
    State(state): State<AppState>,
    Path((release_id, checkpoint_id)): Path<(ReleaseId, CheckpointResultId)>,
    ApiJson(cmd): ApiJson<CompleteCheckpoint>,
) -> ApiResponse<BatchRelease> {
    ok(state
        .engine
        .complete_checkpoint(release_id, checkpoint_id, cmd)
        .await?)
}

pub async fn skip_checkpoint(
    State(state): State<AppState>,
    Path((release_id, checkpoint_id)): Path<(ReleaseId, CheckpointResultId)>,
    ApiJson(cmd): ApiJson<SkipCheckpoint>,
) -> ApiResponse<BatchRelease> {
    ok(state
        .engine
        .skip_checkpoint(release_id, checkpoint_id, cmd)
        .await?)
}
