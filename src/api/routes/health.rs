//! Health check endpoint

use axum::{Json, extract::State};
use tracing::warn;

use crate::api::{state::ApiState, types::HealthResponse};

/// GET /api/v1/health
///
/// Reports storage health and how many samples wait in the fallback buffer.
/// Always 200; a degraded store is reported in the body.
pub async fn health_check(State(state): State<ApiState>) -> Json<HealthResponse> {
    let storage_healthy = match state.storage.health_check().await {
        Ok(health) => health.healthy,
        Err(e) => {
            warn!("storage health check failed: {}", e);
            false
        }
    };

    let pending_buffered = state.pipeline.buffer().pending().await.unwrap_or_else(|e| {
        warn!("failed to read fallback buffer: {}", e);
        0
    });

    Json(HealthResponse {
        status: if storage_healthy { "ok" } else { "degraded" }.to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        storage_healthy,
        pending_buffered,
    })
}
