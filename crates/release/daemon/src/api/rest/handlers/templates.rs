//! Template handlers

use super::{ok, ApiResponse};
use crate::api::rest::extract::ApiJson;
use crate::api::rest::state::AppState;
use crate::error::ApiError;
use axum::extract::{Path, State};
use release_types::{FacilityId, ReleaseTemplate, TemplateDraft, TemplateId};

/// Current templates of a facility
pub async fn list_templates(
    State(state): State<AppState>,
    Path(facility_id): Path<FacilityId>,
) -> ApiResponse<Vec<ReleaseTemplate>> {
    ok(state.engine.list_templates(facility_id))
}

/// Register a new template for a facility
pub async fn register_template(
    State(state): State<AppState>,
    Path(facility_id): Path<FacilityId>,
    ApiJson(draft): ApiJson<TemplateDraft>,
) -> ApiResponse<ReleaseTemplate> {
    if draft.facility_id != facility_id {
        return Err(ApiError::BadRequest(format!(
            "template facility {} does not match path facility {}",
            draft.facility_id, facility_id
        )));
    }

    let template = state.engine.register_template(draft)?;
    tracing::info!(template_id = %template.id, facility_id = %facility_id, "Registered template");
    ok(template)
}

/// Publish a new version of a template
pub async fn republish_template(
    State(state): State<AppState>,
    Path(template_id): Path<TemplateId>,
    ApiJson(draft): ApiJson<TemplateDraft>,
) -> ApiResponse<ReleaseTemplate> {
    let template = state.engine.republish_template(template_id, draft)?;
    tracing::info!(
        template_id = %template.id,
        supersedes = %template_id,
        version = template.version,
        "Republished template"
    );
    ok(template)
}
