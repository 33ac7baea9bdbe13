//! WebSocket observers for real-time resource updates
//!
//! Each connection is split: the write half goes to the broadcast hub as an
//! [`ObserverSink`], the read half stays here and echoes inbound frames back
//! through the observer's queue so they are ordered with broadcasts.

use std::time::Duration;

use async_trait::async_trait;
use axum::{
    extract::{
        State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::Response,
};
use futures::{SinkExt, stream::SplitSink, stream::StreamExt};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::actors::broadcast::{DeliveryError, ObserverSink};
use crate::api::state::ApiState;

/// Write half of a WebSocket with a per-write deadline
///
/// A peer that stops reading eventually fills the socket buffers; the
/// deadline turns that into a write failure instead of a stuck writer.
pub struct WebSocketSink {
    sender: SplitSink<WebSocket, Message>,
    write_timeout: Duration,
}

impl WebSocketSink {
    pub fn new(sender: SplitSink<WebSocket, Message>, write_timeout: Duration) -> Self {
        Self {
            sender,
            write_timeout,
        }
    }

    async fn send(&mut self, message: Message) -> Result<(), DeliveryError> {
        match timeout(self.write_timeout, self.sender.send(message)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(DeliveryError::Transport(e.to_string())),
            Err(_) => Err(DeliveryError::Timeout(self.write_timeout)),
        }
    }
}

#[async_trait]
impl ObserverSink for WebSocketSink {
    async fn send_text(&mut self, text: &str) -> Result<(), DeliveryError> {
        self.send(Message::Text(text.to_string())).await
    }

    async fn send_binary(&mut self, data: &[u8]) -> Result<(), DeliveryError> {
        self.send(Message::Binary(data.to_vec())).await
    }

    async fn close(&mut self) {
        if let Ok(Err(e)) = timeout(self.write_timeout, self.sender.close()).await {
            debug!("error closing WebSocket: {}", e);
        }
    }
}

/// WebSocket upgrade handler
///
/// GET /ws/resources
pub async fn websocket_handler(ws: WebSocketUpgrade, State(state): State<ApiState>) -> Response {
    ws.on_upgrade(|socket| handle_websocket(socket, state))
}

/// Handle WebSocket connection
async fn handle_websocket(socket: WebSocket, state: ApiState) {
    let (sender, mut receiver) = socket.split();

    let sink = WebSocketSink::new(sender, state.write_timeout);
    let (id, observer) = match state.hub.register(sink).await {
        Ok(registered) => registered,
        Err(e) => {
            warn!("failed to register WebSocket observer: {:#}", e);
            return;
        }
    };

    info!(%id, "WebSocket client connected");

    while let Some(msg) = receiver.next().await {
        let delivered = match msg {
            Ok(Message::Text(text)) => observer.send_text(text),
            Ok(Message::Binary(data)) => observer.send_binary(data),
            Ok(Message::Close(_)) => break,
            // Pong is automatically sent by axum
            Ok(_) => true,
            Err(e) => {
                debug!(%id, "WebSocket read failed: {}", e);
                break;
            }
        };

        if !delivered {
            debug!(%id, "observer already dropped by hub");
            break;
        }
    }

    state.hub.unregister(id).await;
    info!(%id, "WebSocket client disconnected");
}
