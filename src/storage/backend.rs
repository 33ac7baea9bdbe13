//! Storage backend trait definition
//!
//! This module defines the `StorageBackend` trait that the ingestion
//! pipeline and the replay actor write through.

use std::collections::HashMap;

use async_trait::async_trait;
use uuid::Uuid;

use super::error::StorageResult;
use crate::{AlertEvent, ResourceSample};

/// Health status of the storage backend
#[derive(Debug, Clone)]
pub struct HealthStatus {
    /// Is the backend operational?
    pub healthy: bool,

    /// Human-readable status message
    pub message: String,

    /// Additional backend-specific metadata
    pub metadata: HashMap<String, String>,
}

/// Trait for primary storage backends
///
/// Writes are single-record and synchronous from the caller's point of
/// view: a returned `Ok` means the record is durably stored. The read
/// methods back the history and alert listings and are not used on the
/// ingestion path.
///
/// ## Thread Safety
///
/// Implementations must be `Send + Sync` as they are shared across
/// concurrent ingestion calls.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Persist a single resource sample
    async fn insert_sample(&self, sample: &ResourceSample) -> StorageResult<()>;

    /// Persist a single alert event
    async fn insert_alert(&self, alert: &AlertEvent) -> StorageResult<()>;

    /// Get the N most recent samples for a host, newest first
    async fn query_latest(
        &self,
        computer_id: Uuid,
        limit: usize,
    ) -> StorageResult<Vec<ResourceSample>>;

    /// List alerts, newest first, optionally filtered by resolution state
    async fn query_alerts(
        &self,
        resolved: Option<bool>,
        limit: usize,
    ) -> StorageResult<Vec<AlertEvent>>;

    /// Mark an alert as resolved
    ///
    /// Returns `false` if no alert with that id exists.
    async fn resolve_alert(&self, id: Uuid) -> StorageResult<bool>;

    /// Check backend health
    ///
    /// Performs a lightweight operation to verify the backend is reachable.
    /// The replay actor uses this to decide when to drain the fallback buffer.
    async fn health_check(&self) -> StorageResult<HealthStatus>;

    /// Get backend-specific statistics as a human-readable string
    async fn get_stats(&self) -> StorageResult<String>;

    /// Close the backend and release resources
    async fn close(&self) -> StorageResult<()>;
}
