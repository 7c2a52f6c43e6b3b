//! Admin handlers.

use std::net::SocketAddr;

use axum::extract::{ConnectInfo, State};
use axum::Json;
use tracing::{info, warn};

use vtryon_models::ClearCacheResponse;

use crate::error::{ApiError, ApiResult};
use crate::security::is_loopback;
use crate::state::AppState;

/// Drop in-memory caches. Allowed in development or from the local machine.
///
/// Only the TCP peer is trusted here; proxy headers are ignored.
pub async fn clear_cache(
    State(state): State<AppState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
) -> ApiResult<Json<ClearCacheResponse>> {
    let peer = connect_info.map(|ConnectInfo(addr)| addr.ip());
    let local = peer.as_ref().is_some_and(is_loopback);

    if !state.config.is_development() && !local {
        warn!(peer = ?peer, "Rejected clear-cache from non-local caller");
        return Err(ApiError::forbidden("Cache clearing is only allowed locally"));
    }

    let response = state.pipeline.clear_caches();
    info!(
        cleared_cache_entries = response.cleared_cache_entries,
        cleared_clients = response.cleared_clients,
        "Caches cleared"
    );
    Ok(Json(response))
}
