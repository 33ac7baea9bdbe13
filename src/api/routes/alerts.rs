//! Alert listing and resolution endpoints

use axum::{
    Json,
    extract::{Path, Query, State, rejection::QueryRejection},
};
use tracing::info;
use uuid::Uuid;

use crate::api::{
    error::{ApiError, ApiResult},
    state::ApiState,
    types::{AlertsQuery, AlertsResponse, ResolveResponse, effective_limit},
};

/// GET /api/v1/alerts?resolved=<bool>&limit=<1..=100>
///
/// Alerts newest first, optionally filtered by resolution state
pub async fn list_alerts(
    State(state): State<ApiState>,
    query: Result<Query<AlertsQuery>, QueryRejection>,
) -> ApiResult<Json<AlertsResponse>> {
    let Query(query) = query?;

    let alerts = state
        .storage
        .query_alerts(query.resolved, effective_limit(query.limit))
        .await?;

    Ok(Json(AlertsResponse {
        count: alerts.len(),
        alerts,
    }))
}

/// POST /api/v1/alerts/:id/resolve
pub async fn resolve_alert(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ResolveResponse>> {
    if !state.storage.resolve_alert(id).await? {
        return Err(ApiError::NotFound(format!("alert {id} not found")));
    }

    info!(alert_id = %id, "alert resolved");
    Ok(Json(ResolveResponse { id, resolved: true }))
}
