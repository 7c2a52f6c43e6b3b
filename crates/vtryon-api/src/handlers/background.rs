//! Background removal handler.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;

use vtryon_models::{RemoveBgRequest, RemoveBgResponse};

use crate::error::{ApiError, ApiResult};
use crate::middleware::RequestId;
use crate::state::AppState;

pub async fn remove_background(
    State(state): State<AppState>,
    RequestId(request_id): RequestId,
    payload: Result<Json<RemoveBgRequest>, JsonRejection>,
) -> ApiResult<Json<RemoveBgResponse>> {
    let Json(request) = payload.map_err(|e| ApiError::bad_request(e.body_text()))?;
    let response = state
        .pipeline
        .remove_background(request.image_url.as_deref(), &request_id)
        .await?;
    Ok(Json(response))
}
