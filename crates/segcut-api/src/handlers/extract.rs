//! Segment extraction handler.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use segcut_models::{ExtractRequest, ExtractResponse};
use tracing::info;
use validator::Validate;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Extract a segment of a video into the requested folder.
///
/// Malformed bodies and invalid fields answer 400; everything that goes
/// wrong once the job has started answers 500 with the job's error message.
pub async fn extract_segment(
    State(state): State<AppState>,
    payload: Result<Json<ExtractRequest>, JsonRejection>,
) -> ApiResult<Json<ExtractResponse>> {
    let Json(request) = payload.map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;
    request.validate()?;

    info!(
        link = %request.link,
        start = request.start_in_seconds.as_secs(),
        end = request.end_in_seconds.as_secs(),
        folder = %request.folder_path,
        "Extract request"
    );

    let response = state.jobs.extract(&request).await?;
    Ok(Json(response))
}
