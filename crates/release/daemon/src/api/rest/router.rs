//! API Router configuration

use super::handlers;
use super::state::AppState;
use crate::config::ServerConfig;
use axum::{
    routing::{get, post, put},
    Router,
};
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

/// Create the main API router
pub fn create_router(state: AppState, server: &ServerConfig) -> Router {
    let release_routes = Router::new()
        .route("/", post(handlers::initiate_release))
        .route("/status-options", get(handlers::status_options))
        // Facility views
        .route(
            "/facilities/:facility_id/releases",
            get(handlers::list_releases),
        )
        .route("/facilities/:facility_id/stats", get(handlers::release_stats))
        .route(
            "/facilities/:facility_id/templates",
            get(handlers::list_templates).post(handlers::register_template),
        )
        .route(
            "/facilities/:facility_id/available-batches",
            get(handlers::available_batches),
        )
        .route(
            "/templates/:template_id/republish",
            post(handlers::republish_template),
        )
        // Releases
        .route("/:release_id", get(handlers::get_release))
        .route("/:release_id/audit", get(handlers::release_audit))
        .route(
            "/:release_id/corrections",
            post(handlers::record_correction),
        )
        .route("/:release_id/hold", put(handlers::hold_release))
        .route("/:release_id/resume", put(handlers::resume_release))
        .route("/:release_id/reject", put(handlers::reject_release))
        .route("/:release_id/release", put(handlers::finalize_release))
        // Checkpoints
        .route(
            "/:release_id/checkpoints/:checkpoint_id/start",
            put(handlers::start_checkpoint),
        )
        .route(
            "/:release_id/checkpoints/:checkpoint_id/complete",
            put(handlers::complete_checkpoint),
        )
        .route(
            "/:release_id/checkpoints/:checkpoint_id/skip",
            put(handlers::skip_checkpoint),
        )
        // Approvals
        .route(
            "/:release_id/approvals/:approval_id",
            put(handlers::record_approval_decision),
        )
        .route(
            "/:release_id/approvals/:approval_id/request",
            put(handlers::request_approval),
        );

    let router = Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/api/batch-releases", release_routes)
        .layer(TimeoutLayer::new(Duration::from_secs(
            server.request_timeout_secs,
        )))
        .layer(TraceLayer::new_for_http());

    let router = if server.enable_cors {
        router.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
    } else {
        router
    };

    router.with_state(state)
}
