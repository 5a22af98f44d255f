//! Release handlers

use super::{ok, ApiResponse};
use crate::api::rest::extract::ApiJson;
use crate::api::rest::state::AppState;
use axum::extract::{Path, Query, State};
use release_types::*;
use serde::Deserialize;

/// Query parameters for listing releases
#[derive(Debug, Default, Deserialize)]
pub struct ListReleasesQuery {
    pub status: Option<ReleaseStatus>,
}

/// Query parameters for stats
#[derive(Debug, Default, Deserialize)]
pub struct StatsQuery {
    pub days: Option<u32>,
}

/// The six statuses with display names and colors
pub async fn status_options(State(state): State<AppState>) -> ApiResponse<Vec<StatusOption>> {
    ok(state.engine.status_options())
}

/// Release summaries of a facility, newest first
pub async fn list_releases(
    State(state): State<AppState>,
    Path(facility_id): Path<FacilityId>,
    Query(query): Query<ListReleasesQuery>,
) -> ApiResponse<Vec<ReleaseSummary>> {
    let mut filter = ReleaseFilter::facility(facility_id);
    if let Some(status) = query.status {
        filter = filter.with_status(status);
    }
    ok(state.engine.list_releases(&filter).await?)
}

pub async fn release_stats(
    State(state): State<AppState>,
    Path(facility_id): Path<FacilityId>,
    Query(query): Query<StatsQuery>,
) -> ApiResponse<ReleaseStats> {
    let window = query.days.map(StatsWindow::days);
    ok(state.engine.stats_by_status(facility_id, window).await?)
}

/// Releasable processing batches without an open release
pub async fn available_batches(
    State(state): State<AppState>,
    Path(facility_id): Path<FacilityId>,
) -> ApiResponse<Vec<ProcessingBatch>> {
    ok(state.engine.available_batches(facility_id).await?)
}

pub async fn initiate_release(
    State(state): State<AppState>,
    ApiJson(cmd): ApiJson<InitiateRelease>,
) -> ApiResponse<BatchRelease> {
    ok(state.engine.initiate_release(cmd).await?)
}

/// A release with its template, processing batch and audit trail
pub async fn get_release(
    State(state): State<AppState>,
    Path(release_id): Path<ReleaseId>,
) -> ApiResponse<ReleaseDetail> {
    ok(state.engine.get_release_detail(release_id).await?)
}

pub async fn release_audit(
    State(state): State<AppState>,
    Path(release_id): Path<ReleaseId>,
) -> ApiResponse<Vec<AuditEntry>> {
    let trail = state.engine.audit_log().list_for_release(release_id).await?;
    ok(trail.entries().await?)
}

pub async fn hold_release(
    State(state): State<AppState>,
    Path(release_id): Path<ReleaseId>,
    ApiJson(cmd): ApiJson<HoldRelease>,
) -> ApiResponse<BatchRelease> {
    ok(state.engine.hold_release(release_id, cmd).await?)
}

pub async fn resume_release(
    State(state): State<AppState>,
    Path(release_id): Path<ReleaseId>,
    ApiJson(cmd): ApiJson<ResumeRelease>,
) -> ApiResponse<BatchRelease> {
    ok(state.engine.resume_release(release_id, cmd).await?)
}

pub async fn reject_release(
    State(state): State<AppState>,
    Path(release_id): Path<ReleaseId>,
    ApiJson(cmd): ApiJson<RejectRelease>,
) -> ApiResponse<BatchRelease> {
    ok(state.engine.reject_release(release_id, cmd).await?)
}

/// Finalize an approved release
pub async fn finalize_release(
    State(state): State<AppState>,
    Path(release_id): Path<ReleaseId>,
    ApiJson(cmd): ApiJson<FinalizeRelease>,
) -> ApiResponse<BatchRelease> {
    ok(state.engine.finalize_release(release_id, cmd).await?)
}

pub async fn record_correction(
    State(state): State<AppState>,
    Path(release_id): Path<ReleaseId>,
    ApiJson(cmd): ApiJson<RecordCorrection>,
) -> ApiResponse<BatchRelease> {
    ok(state.engine.record_correction(release_id, cmd).await?)
}
