//! BroadcastActor - Fans messages out to live observers
//!
//! The actor owns the registry of observer connections. Registration,
//! removal and iteration for delivery all happen inside its loop, so the
//! registry is never touched from two places at once.
//!
//! ## Message Flow
//!
//! ```text
//! Pipeline ──Submit──► BroadcastActor ──enqueue──► queue ──► writer task ──► sink
//!                           │                       queue ──► writer task ──► sink
//!                           ◄──── DeliveryFailed ───────────────┘
//! ```
//!
//! Every observer has its own unbounded queue drained by its own writer
//! task. That task is the only place the sink is written to, which keeps
//! writes to one observer ordered and lets a slow observer lag without
//! holding up the others. `Submit` only enqueues, so the caller never waits
//! on observer I/O.
//!
//! A writer task closes its sink exactly once: either after a failed write,
//! or once the actor drops the observer's queue on unregister or shutdown.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, instrument, trace, warn};

use super::messages::{BroadcastMessage, HubCommand, HubStats};

/// Stable identifier of a registered observer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// A frame queued for one observer
#[derive(Debug, Clone)]
pub enum Frame {
    Text(Arc<str>),
    Binary(Vec<u8>),
}

/// Per-observer write failure
///
/// Never surfaced to whoever submitted the message; the observer is dropped.
#[derive(Debug)]
pub enum DeliveryError {
    /// Transport already closed by the peer
    Closed,

    /// Write did not complete within the deadline
    Timeout(Duration),

    /// Any other transport error
    Transport(String),
}

impl fmt::Display for DeliveryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeliveryError::Closed => write!(f, "observer connection closed"),
            DeliveryError::Timeout(after) => write!(f, "write timed out after {:?}", after),
            DeliveryError::Transport(msg) => write!(f, "transport error: {}", msg),
        }
    }
}

impl std::error::Error for DeliveryError {}

/// Write half of an observer's transport
///
/// Implementations must fail (not hang) when the peer is gone.
#[async_trait]
pub trait ObserverSink: Send + 'static {
    async fn send_text(&mut self, text: &str) -> Result<(), DeliveryError>;

    async fn send_binary(&mut self, data: &[u8]) -> Result<(), DeliveryError>;

    /// Close the transport; called once per sink
    async fn close(&mut self);
}

/// Handle to a single observer's queue
///
/// Frames pushed here are written in order with broadcast frames. The handle
/// does not keep the observer alive: once the hub drops the observer every
/// push returns `false`.
#[derive(Debug, Clone)]
pub struct ObserverHandle {
    id: ConnectionId,
    queue: mpsc::WeakUnboundedSender<Frame>,
}

impl ObserverHandle {
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn send_text(&self, text: impl Into<Arc<str>>) -> bool {
        self.push(Frame::Text(text.into()))
    }

    pub fn send_binary(&self, data: Vec<u8>) -> bool {
        self.push(Frame::Binary(data))
    }

    fn push(&self, frame: Frame) -> bool {
        self.queue
            .upgrade()
            .is_some_and(|queue| queue.send(frame).is_ok())
    }
}

struct Observer {
    queue: mpsc::UnboundedSender<Frame>,
}

/// Actor owning the observer registry
pub struct BroadcastActor {
    observers: HashMap<ConnectionId, Observer>,

    next_id: u64,

    /// Command receiver
    command_rx: mpsc::UnboundedReceiver<HubCommand>,

    /// Given to writer tasks so they can report failures
    command_tx: mpsc::WeakUnboundedSender<HubCommand>,

    messages_submitted: u64,

    delivery_failures: u64,
}

impl BroadcastActor {
    pub fn new(
        command_rx: mpsc::UnboundedReceiver<HubCommand>,
        command_tx: mpsc::WeakUnboundedSender<HubCommand>,
    ) -> Self {
        Self {
            observers: HashMap::new(),
            next_id: 0,
            command_rx,
            command_tx,
            messages_submitted: 0,
            delivery_failures: 0,
        }
    }

    /// Run the actor's main loop
    ///
    /// Runs until a Shutdown command arrives or every handle is dropped.
    #[instrument(skip(self))]
    pub async fn run(mut self) {
        debug!("starting broadcast actor");

        while let Some(cmd) = self.command_rx.recv().await {
            match cmd {
                HubCommand::Register { sink, respond_to } => {
                    let handle = self.register(sink);
                    let _ = respond_to.send((handle.id(), handle));
                }

                HubCommand::Unregister { id, respond_to } => {
                    let removed = self.observers.remove(&id).is_some();
                    if removed {
                        debug!(%id, "observer unregistered");
                    }
                    let _ = respond_to.send(removed);
                }

                HubCommand::Submit { message } => {
                    self.submit(message);
                }

                HubCommand::DeliveryFailed { id } => {
                    self.drop_failed(id);
                }

                HubCommand::GetStats { respond_to } => {
                    let _ = respond_to.send(self.stats());
                }

                HubCommand::Shutdown => {
                    debug!("received shutdown command");
                    break;
                }
            }
        }

        // Dropping the queues lets every writer drain and close its sink
        self.observers.clear();
        debug!("broadcast actor stopped");
    }

    fn register(&mut self, sink: Box<dyn ObserverSink>) -> ObserverHandle {
        let id = ConnectionId(self.next_id);
        self.next_id += 1;

        let (queue_tx, queue_rx) = mpsc::unbounded_channel();
        let handle = ObserverHandle {
            id,
            queue: queue_tx.downgrade(),
        };

        tokio::spawn(write_loop(id, sink, queue_rx, self.command_tx.clone()));
        self.observers.insert(id, Observer { queue: queue_tx });

        debug!(%id, connections = self.observers.len(), "observer registered");
        handle
    }

    fn submit(&mut self, message: BroadcastMessage) {
        self.messages_submitted += 1;

        let text: Arc<str> = match serde_json::to_string(&message) {
            Ok(text) => text.into(),
            Err(e) => {
                error!("failed to serialize {} message: {}", message.kind(), e);
                return;
            }
        };

        let mut dead = Vec::new();
        for (id, observer) in &self.observers {
            if observer.queue.send(Frame::Text(Arc::clone(&text))).is_err() {
                dead.push(*id);
            }
        }

        trace!(
            kind = message.kind(),
            observers = self.observers.len(),
            "message enqueued"
        );

        for id in dead {
            self.drop_failed(id);
        }
    }

    fn drop_failed(&mut self, id: ConnectionId) {
        if self.observers.remove(&id).is_some() {
            self.delivery_failures += 1;
            warn!(%id, "observer dropped after failed delivery");
        }
    }

    fn stats(&self) -> HubStats {
        HubStats {
            connections: self.observers.len(),
            messages_submitted: self.messages_submitted,
            delivery_failures: self.delivery_failures,
        }
    }
}

async fn write_loop(
    id: ConnectionId,
    mut sink: Box<dyn ObserverSink>,
    mut queue: mpsc::UnboundedReceiver<Frame>,
    hub: mpsc::WeakUnboundedSender<HubCommand>,
) {
    while let Some(frame) = queue.recv().await {
        let result = match &frame {
            Frame::Text(text) => sink.send_text(text).await,
            Frame::Binary(data) => sink.send_binary(data).await,
        };

        if let Err(e) = result {
            debug!(%id, "write failed: {}", e);
            queue.close();
            if let Some(hub) = hub.upgrade() {
                let _ = hub.send(HubCommand::DeliveryFailed { id });
            }
            break;
        }
    }

    sink.close().await;
    trace!(%id, "writer task finished");
}

/// Handle for controlling the BroadcastActor
///
/// Cheap to clone; the pipeline and every WebSocket connection hold one.
#[derive(Clone, Debug)]
pub struct BroadcastHandle {
    sender: mpsc::UnboundedSender<HubCommand>,
}

impl BroadcastHandle {
    /// Spawn a new broadcast actor
    pub fn spawn() -> Self {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();

        let actor = BroadcastActor::new(cmd_rx, cmd_tx.downgrade());
        tokio::spawn(actor.run());

        Self { sender: cmd_tx }
    }

    /// Register an observer
    pub async fn register(
        &self,
        sink: impl ObserverSink,
    ) -> Result<(ConnectionId, ObserverHandle)> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(HubCommand::Register {
                sink: Box::new(sink),
                respond_to: tx,
            })
            .map_err(|_| anyhow!("failed to send Register command"))?;

        rx.await.context("failed to receive response")
    }

    /// Remove an observer
    ///
    /// Returns `false` if it was not registered, including when it was
    /// already removed or the hub has stopped.
    pub async fn unregister(&self, id: ConnectionId) -> bool {
        let (tx, rx) = oneshot::channel();
        if self
            .sender
            .send(HubCommand::Unregister { id, respond_to: tx })
            .is_err()
        {
            return false;
        }

        rx.await.unwrap_or(false)
    }

    /// Queue a message for every registered observer
    ///
    /// Never waits on observer I/O.
    pub fn submit(&self, message: BroadcastMessage) {
        if self.sender.send(HubCommand::Submit { message }).is_err() {
            trace!("broadcast hub stopped, message dropped");
        }
    }

    /// Get hub statistics
    pub async fn stats(&self) -> Result<HubStats> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(HubCommand::GetStats { respond_to: tx })
            .map_err(|_| anyhow!("failed to send GetStats command"))?;

        rx.await.context("failed to receive response")
    }

    /// Drop every observer and stop the hub
    pub fn shutdown(&self) -> Result<()> {
        self.sender
            .send(HubCommand::Shutdown)
            .map_err(|_| anyhow!("failed to send Shutdown command"))?;
        Ok(())
    }
}
