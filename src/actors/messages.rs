//! Message types for actor communication
//!
//! This module defines the messages exchanged with the broadcast hub and the
//! replay scheduler, plus the envelope pushed to observers.
//!
//! ## Design Principles
//!
//! 1. **Commands**: Request/response messages sent to specific actors via mpsc
//! 2. **Envelope**: [`BroadcastMessage`] is the only thing observers ever see
//! 3. **Request/Response**: oneshot channels for synchronous queries

use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

use super::broadcast::{ConnectionId, ObserverHandle, ObserverSink};
use crate::{AlertEvent, ResourceSample};

/// Tagged envelope fanned out to every observer
///
/// Serialized as `{"type": "resource_update" | "alert", "data": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum BroadcastMessage {
    ResourceUpdate(ResourceSample),
    Alert(AlertEvent),
}

impl BroadcastMessage {
    /// Wire name of the message kind
    pub fn kind(&self) -> &'static str {
        match self {
            BroadcastMessage::ResourceUpdate(_) => "resource_update",
            BroadcastMessage::Alert(_) => "alert",
        }
    }
}

/// Commands that can be sent to the BroadcastActor
pub enum HubCommand {
    /// Add an observer and start its writer task
    Register {
        sink: Box<dyn ObserverSink>,
        respond_to: oneshot::Sender<(ConnectionId, ObserverHandle)>,
    },

    /// Remove an observer; replies whether it was registered
    Unregister {
        id: ConnectionId,
        respond_to: oneshot::Sender<bool>,
    },

    /// Fan a message out to all registered observers
    Submit { message: BroadcastMessage },

    /// Sent by a writer task after its sink failed a write
    DeliveryFailed { id: ConnectionId },

    /// Get hub statistics
    GetStats {
        respond_to: oneshot::Sender<HubStats>,
    },

    /// Drop every observer and stop the actor
    Shutdown,
}

impl std::fmt::Debug for HubCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HubCommand::Register { .. } => f.write_str("Register"),
            HubCommand::Unregister { id, .. } => write!(f, "Unregister({id})"),
            HubCommand::Submit { message } => write!(f, "Submit({})", message.kind()),
            HubCommand::DeliveryFailed { id } => write!(f, "DeliveryFailed({id})"),
            HubCommand::GetStats { .. } => f.write_str("GetStats"),
            HubCommand::Shutdown => f.write_str("Shutdown"),
        }
    }
}

/// Broadcast hub statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HubStats {
    /// Currently registered observers
    pub connections: usize,

    /// Messages submitted since start
    pub messages_submitted: u64,

    /// Observers dropped after a failed write
    pub delivery_failures: u64,
}

/// Commands that can be sent to the ReplayActor
#[derive(Debug)]
pub enum ReplayCommand {
    /// Drain the buffer now, without consulting the backend's health
    ReplayNow {
        respond_to: oneshot::Sender<anyhow::Result<usize>>,
    },

    /// Get replay statistics
    GetStats {
        respond_to: oneshot::Sender<ReplayStats>,
    },

    /// Gracefully shut down the replay actor
    Shutdown,
}

/// Replay statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReplayStats {
    /// Replay attempts, successful or not
    pub runs: u64,

    /// Records moved from the buffer into primary storage
    pub records_replayed: u64,

    /// Attempts that stopped on a failing record
    pub aborted_runs: u64,

    pub last_error: Option<String>,
}
