//! WebSocket-backed [`Transport`].

use std::sync::Arc;

use axum::extract::ws::Utf8Bytes;
use codeboard_core::{ConnectionId, ServerEvent, Transport};
use dashmap::DashMap;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, error, warn};

/// Frames buffered per socket before the peer counts as lagging.
pub const OUTBOX_CAPACITY: usize = 256;

/// Outbound frame queue of one socket.
pub type Outbox = mpsc::Sender<Utf8Bytes>;

/// Routes serialized events to the outbound queue of each live socket.
///
/// Sends never wait. A peer whose queue is full is dropped from the table;
/// its socket task then sees the queue close and shuts the connection.
/// Cloning shares the same peer table.
#[derive(Clone, Default)]
pub struct WsTransport {
    peers: Arc<DashMap<ConnectionId, Outbox>>,
}

impl WsTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open the outbound queue of a socket. Must happen before the socket's
    /// first frame reaches the coordinator.
    pub fn register(&self, connection_id: &str) -> mpsc::Receiver<Utf8Bytes> {
        let (outbox, outgoing) = mpsc::channel(OUTBOX_CAPACITY);
        self.peers.insert(connection_id.to_string(), outbox);
        outgoing
    }

    pub fn unregister(&self, connection_id: &str) {
        self.peers.remove(connection_id);
    }

    pub fn peer_count(&self) -> usize {
        self.peers.len()
    }

    fn encode(event: &ServerEvent) -> Option<Utf8Bytes> {
        match serde_json::to_string(event) {
            Ok(json) => Some(json.into()),
            Err(e) => {
                error!("Failed to encode event: {}", e);
                None
            }
        }
    }

    fn push(&self, to: &str, frame: Utf8Bytes) {
        // The map guard must be released before removing the entry
        let result = match self.peers.get(to) {
            Some(outbox) => outbox.try_send(frame),
            None => {
                debug!("No socket registered for {}", to);
                return;
            }
        };
        match result {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                warn!("Outbox of {} is full, dropping lagging peer", to);
                self.unregister(to);
            }
            Err(TrySendError::Closed(_)) => debug!("Socket {} already closed", to),
        }
    }
}

impl Transport for WsTransport {
    fn send(&self, to: &str, event: &ServerEvent) {
        if let Some(frame) = Self::encode(event) {
            self.push(to, frame);
        }
    }

    /// Encodes once and shares the frame across recipients.
    fn send_many(&self, to: &[ConnectionId], event: &ServerEvent) {
        if to.is_empty() {
            return;
        }
        if let Some(frame) = Self::encode(event) {
            for connection_id in to {
                self.push(connection_id, frame.clone());
            }
        }
    }
}
