//! HTTP request and response schemas.
//!
//! Field names are camelCase to match the web client.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// `POST /api/tryon` body.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TryOnRequest {
    /// Name of a previously uploaded photo in the upload directory
    #[serde(default)]
    pub user_image_filename: Option<String>,
    #[serde(default)]
    pub clothing_image_url: Option<String>,
    #[serde(default)]
    pub clothing_item_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TryOnResponse {
    pub message: String,
    pub result_image_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LiveTryOnResponse {
    pub message: String,
    pub result_image_url: String,
    pub processing_time_ms: u64,
}

/// `POST /api/remove-bg` body.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RemoveBgRequest {
    #[serde(default)]
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RemoveBgResponse {
    pub result_image_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClearCacheResponse {
    pub message: String,
    pub cleared_cache_entries: usize,
    pub cleared_clients: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub filename: String,
    pub url: String,
}
