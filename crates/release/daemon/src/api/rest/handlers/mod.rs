//! API request handlers

mod approvals;
mod checkpoints;
mod health;
mod releases;
mod templates;

pub use approvals::*;
pub use checkpoints::*;
pub use health::*;
pub use releases::*;
pub use templates::*;

use crate::error::ApiResult;
use axum::Json;
use serde::Serialize;

/// `{ "success": true, "data": ... }`
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub success: bool,
    pub data: T,
}

pub type ApiResponse<T> = ApiResult<Json<Envelope<T>>>;

fn ok<T>(data: T) -> ApiResponse<T> {
    Ok(Json(Envelope {
        success: true,
        data,
    }))
}
