//! System statistics endpoint

use axum::{Json, extract::State};

use crate::api::{error::ApiResult, state::ApiState, types::StatsResponse};

/// GET /api/v1/stats
///
/// Returns hub, replay and storage statistics
pub async fn get_stats(State(state): State<ApiState>) -> ApiResult<Json<StatsResponse>> {
    let hub = state.hub.stats().await?;
    let replay = state.replay.stats().await?;
    let storage = state
        .storage
        .get_stats()
        .await
        .unwrap_or_else(|e| format!("unavailable: {e}"));
    let pending_buffered = state
        .pipeline
        .buffer()
        .pending()
        .await
        .map_err(|e| anyhow::anyhow!("failed to read fallback buffer: {e}"))?;

    Ok(Json(StatsResponse {
        timestamp: chrono::Utc::now().to_rfc3339(),
        hub,
        replay,
        storage,
        pending_buffered,
    }))
}
