//! Actor-based fan-out and recovery
//!
//! Each actor runs as an independent async task and is controlled through a
//! cloneable handle that sends commands over a Tokio channel.
//!
//! ## Architecture Overview
//!
//! ```text
//!   POST /api/v1/resource
//!            │
//!   ┌────────▼────────┐  insert   ┌──────────────┐
//!   │ IngestPipeline  ├──────────►│ StorageBackend│◄──────────┐
//!   └───┬─────────┬───┘           └──────────────┘           │ insert_sample
//!       │ append  │ submit                                   │
//!   ┌───▼──────┐  │                                  ┌───────┴──────┐
//!   │ Fallback │◄─┼──────────── replay ──────────────┤ ReplayActor  │
//!   │ Buffer   │  │                                  └──────────────┘
//!   └──────────┘  │
//!        ┌────────▼────────┐
//!        │ BroadcastActor  │──► writer task per observer ──► WebSocket
//!        └─────────────────┘
//! ```
//!
//! ## Actor Types
//!
//! - **BroadcastActor**: Owns the observer registry and fans messages out
//! - **ReplayActor**: Drains the fallback buffer once storage is healthy again
//!
//! ## Communication Patterns
//!
//! 1. **Commands**: Each actor has an mpsc command channel for control messages
//! 2. **Request/Response**: oneshot channels for synchronous queries

pub mod broadcast;
pub mod messages;
pub mod replay;

pub use broadcast::{BroadcastHandle, ConnectionId, ObserverHandle, ObserverSink};
pub use messages::{BroadcastMessage, HubStats, ReplayStats};
pub use replay::ReplayHandle;
