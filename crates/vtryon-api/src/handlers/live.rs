//! Live webcam frame handler.

use std::net::SocketAddr;

use axum::extract::{ConnectInfo, Multipart, State};
use axum::http::HeaderMap;
use axum::Json;

use vtryon_models::LiveTryOnResponse;

use crate::error::{ApiError, ApiResult};
use crate::middleware::{client_ip, RequestId};
use crate::state::AppState;

/// Fields of a live try-on multipart form.
#[derive(Debug, Default)]
pub struct LiveFrameForm {
    pub frame: Vec<u8>,
    pub clothing_item_id: Option<i64>,
}

impl LiveFrameForm {
    /// Read the `frame` file and `clothingItemId` field, ignoring anything else.
    pub async fn from_multipart(mut multipart: Multipart) -> ApiResult<Self> {
        let mut form = Self::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ApiError::bad_request(format!("Invalid multipart body: {}", e)))?
        {
            match field.name() {
                Some("frame") => {
                    form.frame = field
                        .bytes()
                        .await
                        .map_err(|e| ApiError::bad_request(format!("Failed to read frame: {}", e)))?
                        .to_vec();
                }
                Some("clothingItemId") => {
                    let text = field
                        .text()
                        .await
                        .map_err(|e| ApiError::bad_request(format!("Failed to read clothingItemId: {}", e)))?;
                    let text = text.trim();
                    if !text.is_empty() {
                        let id = text
                            .parse()
                            .map_err(|_| ApiError::bad_request(format!("Invalid clothingItemId '{}'", text)))?;
                        form.clothing_item_id = Some(id);
                    }
                }
                _ => {}
            }
        }

        Ok(form)
    }
}

/// Composite a garment onto one webcam frame.
pub async fn live_try_on(
    State(state): State<AppState>,
    RequestId(request_id): RequestId,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    multipart: Multipart,
) -> ApiResult<Json<LiveTryOnResponse>> {
    let peer = connect_info.map(|ConnectInfo(addr)| addr.ip());
    let client_id = client_ip(&headers, peer, &state.config.trusted_proxies)
        .map(|ip| ip.to_string())
        .unwrap_or_else(|| "unknown".to_string());

    let form = LiveFrameForm::from_multipart(multipart).await?;
    let response = state
        .pipeline
        .live_try_on(&client_id, form.frame, form.clothing_item_id, &request_id)
        .await?;
    Ok(Json(response))
}
