//! API shared state containing the pipeline and actor handles

use std::sync::Arc;
use std::time::Duration;

use crate::actors::{BroadcastHandle, ReplayHandle};
use crate::pipeline::IngestPipeline;
use crate::storage::StorageBackend;

/// Shared state passed to all API handlers
#[derive(Clone)]
pub struct ApiState {
    /// Ingestion pipeline behind `POST /api/v1/resource`
    pub pipeline: IngestPipeline,

    /// Primary storage, for history and alert queries
    pub storage: Arc<dyn StorageBackend>,

    /// Broadcast hub WebSocket observers register with
    pub hub: BroadcastHandle,

    /// Replay scheduler, for stats
    pub replay: ReplayHandle,

    /// Deadline for a single write to a WebSocket observer
    pub write_timeout: Duration,
}

impl ApiState {
    pub fn new(
        pipeline: IngestPipeline,
        storage: Arc<dyn StorageBackend>,
        hub: BroadcastHandle,
        replay: ReplayHandle,
        write_timeout: Duration,
    ) -> Self {
        Self {
            pipeline,
            storage,
            hub,
            replay,
            write_timeout,
        }
    }
}
