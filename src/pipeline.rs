//! Ingestion pipeline
//!
//! One call per inbound sample:
//!
//! 1. Validate; a rejected sample has no side effects.
//! 2. Persist to the primary store, or append to the fallback buffer if that
//!    fails. If the buffer also fails the sample is lost and nothing else
//!    happens.
//! 3. Evaluate alert rules; persist each alert best-effort and broadcast it
//!    whatever the persistence outcome.
//! 4. Broadcast the sample as a resource update.
//!
//! Persistence always happens before broadcast, and broadcasting only
//! enqueues, so the caller waits on storage I/O but never on observers.

use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, error, instrument, warn};

use crate::actors::{BroadcastHandle, BroadcastMessage};
use crate::alerts;
use crate::buffer::{BufferError, FallbackBuffer};
use crate::storage::{StorageBackend, StorageError};
use crate::validate::{ValidationError, validate};
use crate::{AlertEvent, ResourceSample, SamplePayload};

/// Where an accepted sample ended up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IngestStatus {
    /// Written to the primary store
    Stored,

    /// Primary store unavailable; sample is in the fallback buffer
    Degraded,
}

/// Outcome of a successful ingestion
#[derive(Debug, Clone)]
pub struct IngestReport {
    pub sample: ResourceSample,
    pub status: IngestStatus,

    /// Alerts raised for the sample, in rule order
    pub alerts: Vec<AlertEvent>,
}

#[derive(Debug)]
pub enum IngestError {
    /// Sample rejected; nothing was stored or broadcast
    Validation(ValidationError),

    /// Both the primary store and the fallback buffer failed; the sample is lost
    BufferWrite {
        storage: StorageError,
        buffer: BufferError,
    },
}

impl fmt::Display for IngestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IngestError::Validation(err) => write!(f, "invalid sample: {}", err),
            IngestError::BufferWrite { storage, buffer } => write!(
                f,
                "failed to buffer sample after storage failure ({}): {}",
                storage, buffer
            ),
        }
    }
}

impl std::error::Error for IngestError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            IngestError::Validation(err) => Some(err),
            IngestError::BufferWrite { buffer, .. } => Some(buffer),
        }
    }
}

impl From<ValidationError> for IngestError {
    fn from(err: ValidationError) -> Self {
        IngestError::Validation(err)
    }
}

/// Validates, persists and broadcasts samples
///
/// Cheap to clone; every ingestion call can run concurrently.
#[derive(Clone)]
pub struct IngestPipeline {
    backend: Arc<dyn StorageBackend>,
    buffer: Arc<FallbackBuffer>,
    hub: BroadcastHandle,
}

impl IngestPipeline {
    pub fn new(
        backend: Arc<dyn StorageBackend>,
        buffer: Arc<FallbackBuffer>,
        hub: BroadcastHandle,
    ) -> Self {
        Self {
            backend,
            buffer,
            hub,
        }
    }

    pub fn buffer(&self) -> &Arc<FallbackBuffer> {
        &self.buffer
    }

    /// Ingest one payload, stamping it with the arrival time if needed
    #[instrument(skip_all, fields(computer_id = %payload.computer_id))]
    pub async fn ingest(&self, payload: SamplePayload) -> Result<IngestReport, IngestError> {
        let sample = validate(payload.into_sample(Utc::now()))?;

        let status = match self.backend.insert_sample(&sample).await {
            Ok(()) => IngestStatus::Stored,
            Err(storage) => {
                warn!("primary store write failed, buffering sample: {}", storage);
                if let Err(buffer) = self.buffer.append(&sample).await {
                    error!("failed to buffer sample, it is lost: {}", buffer);
                    return Err(IngestError::BufferWrite { storage, buffer });
                }
                IngestStatus::Degraded
            }
        };

        let alerts = alerts::evaluate(&sample);
        for alert in &alerts {
            if let Err(e) = self.backend.insert_alert(alert).await {
                warn!(alert_id = %alert.id, "failed to persist {} alert: {}", alert.category, e);
            }
            self.hub.submit(BroadcastMessage::Alert(alert.clone()));
        }

        self.hub
            .submit(BroadcastMessage::ResourceUpdate(sample.clone()));

        debug!(?status, alerts = alerts.len(), "sample ingested");

        Ok(IngestReport {
            sample,
            status,
            alerts,
        })
    }
}
