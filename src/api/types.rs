//! API request and response types
//!
//! Responses derive `Deserialize` as well so clients (and the integration
//! tests) can decode them with the same types.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::actors::{HubStats, ReplayStats};
use crate::{AlertEvent, ResourceSample};

/// Default and fallback page size for listings
pub const DEFAULT_LIMIT: usize = 50;

/// Largest accepted page size
pub const MAX_LIMIT: usize = 100;

/// Out-of-range limits fall back to the default instead of erroring
pub fn effective_limit(limit: Option<usize>) -> usize {
    match limit {
        Some(limit) if (1..=MAX_LIMIT).contains(&limit) => limit,
        _ => DEFAULT_LIMIT,
    }
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// "ok" when storage is healthy, "degraded" otherwise
    pub status: String,
    pub timestamp: String,
    pub storage_healthy: bool,
    pub pending_buffered: usize,
}

/// Body returned with 202 when a sample went to the fallback buffer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BufferedResponse {
    pub status: String,
    pub data: ResourceSample,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsResponse {
    pub timestamp: String,
    pub hub: HubStats,
    pub replay: ReplayStats,
    pub storage: String,
    pub pending_buffered: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HistoryQuery {
    pub computer_id: Uuid,
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub computer_id: Uuid,
    pub samples: Vec<ResourceSample>,
    pub count: usize,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AlertsQuery {
    pub resolved: Option<bool>,
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertsResponse {
    pub alerts: Vec<AlertEvent>,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolveResponse {
    pub id: Uuid,
    pub resolved: bool,
}
