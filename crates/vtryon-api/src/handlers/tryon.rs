//! One-shot try-on handler.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;

use vtryon_models::{TryOnRequest, TryOnResponse};

use crate::error::{ApiError, ApiResult};
use crate::middleware::RequestId;
use crate::state::AppState;

/// Composite a garment onto a previously uploaded photo.
pub async fn try_on(
    State(state): State<AppState>,
    RequestId(request_id): RequestId,
    payload: Result<Json<TryOnRequest>, JsonRejection>,
) -> ApiResult<Json<TryOnResponse>> {
    let Json(request) = payload.map_err(|e| ApiError::bad_request(e.body_text()))?;
    let response = state.pipeline.try_on(&request, &request_id).await?;
    Ok(Json(response))
}
