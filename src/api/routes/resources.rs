//! Sample submission and history endpoints

use axum::{
    Json,
    extract::{
        Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::SamplePayload;
use crate::api::{
    error::ApiResult,
    state::ApiState,
    types::{BufferedResponse, HistoryQuery, HistoryResponse, effective_limit},
};
use crate::pipeline::IngestStatus;

/// POST /api/v1/resource
///
/// - 200 with the stored sample
/// - 202 with `{"status": "buffered", "data": sample}` when storage is down
/// - 400 on a malformed body or out-of-range values
/// - 500 when the sample could not be buffered either
pub async fn ingest_sample(
    State(state): State<ApiState>,
    payload: Result<Json<SamplePayload>, JsonRejection>,
) -> ApiResult<Response> {
    let Json(payload) = payload?;

    let report = state.pipeline.ingest(payload).await?;

    Ok(match report.status {
        IngestStatus::Stored => (StatusCode::OK, Json(report.sample)).into_response(),
        IngestStatus::Degraded => (
            StatusCode::ACCEPTED,
            Json(BufferedResponse {
                status: "buffered".to_string(),
                data: report.sample,
            }),
        )
            .into_response(),
    })
}

/// GET /api/v1/history?computer_id=<uuid>&limit=<1..=100>
///
/// Latest samples for one host, newest first
pub async fn get_history(
    State(state): State<ApiState>,
    query: Result<Query<HistoryQuery>, QueryRejection>,
) -> ApiResult<Json<HistoryResponse>> {
    let Query(query) = query?;
    let limit = effective_limit(query.limit);

    let samples = state.storage.query_latest(query.computer_id, limit).await?;

    Ok(Json(HistoryResponse {
        computer_id: query.computer_id,
        count: samples.len(),
        samples,
    }))
}
