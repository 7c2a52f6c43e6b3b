//! User photo uploads.

use axum::extract::{Multipart, State};
use axum::Json;
use tracing::warn;

use vtryon_models::UploadResponse;
use vtryon_storage::{public_url, StorageError};

use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::state::AppState;

/// Store the multipart `file` field and return its generated filename.
pub async fn upload(State(state): State<AppState>, mut multipart: Multipart) -> ApiResult<Json<UploadResponse>> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Invalid multipart body: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let original_name = field.file_name().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::bad_request(format!("Failed to read file: {}", e)))?;
        if bytes.is_empty() {
            return Err(ApiError::bad_request("Uploaded file is empty"));
        }

        let filename = state
            .store
            .save_upload(&original_name, &bytes)
            .await
            .map_err(|e| match e {
                StorageError::InvalidKey(_) => {
                    ApiError::bad_request(format!("Unsupported file type '{}'", original_name))
                }
                other => {
                    warn!(error = %other, "Failed to store upload");
                    ApiError::internal(other.to_string())
                }
            })?;
        metrics::record_upload();

        return Ok(Json(UploadResponse {
            url: public_url(&filename),
            filename,
        }));
    }

    Err(ApiError::bad_request("No file provided"))
}
