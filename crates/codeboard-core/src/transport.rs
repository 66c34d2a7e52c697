//! Outbound delivery abstraction.

use std::sync::{Mutex, PoisonError};

use crate::protocol::ServerEvent;
use crate::ConnectionId;

/// Delivers events to connections. Delivery is fire-and-forget.
pub trait Transport {
    /// Send an event to one connection.
    fn send(&self, to: &str, event: &ServerEvent);

    /// Send the same event to several connections.
    fn send_many(&self, to: &[ConnectionId], event: &ServerEvent) {
        for connection_id in to {
            self.send(connection_id, event);
        }
    }
}

impl<T: Transport + ?Sized> Transport for &T {
    fn send(&self, to: &str, event: &ServerEvent) {
        (**self).send(to, event);
    }

    fn send_many(&self, to: &[ConnectionId], event: &ServerEvent) {
        (**self).send_many(to, event);
    }
}

/// In-memory transport that records every delivery, for testing and
/// ephemeral use.
#[derive(Debug, Default)]
pub struct RecordingTransport {
    deliveries: Mutex<Vec<(ConnectionId, ServerEvent)>>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// All deliveries so far, in send order.
    pub fn deliveries(&self) -> Vec<(ConnectionId, ServerEvent)> {
        self.lock().clone()
    }

    /// Events delivered to one connection, in send order.
    pub fn events_for(&self, connection_id: &str) -> Vec<ServerEvent> {
        self.lock()
            .iter()
            .filter(|(to, _)| to == connection_id)
            .map(|(_, event)| event.clone())
            .collect()
    }

    /// Drain the recorded deliveries.
    pub fn take(&self) -> Vec<(ConnectionId, ServerEvent)> {
        std::mem::take(&mut *self.lock())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<(ConnectionId, ServerEvent)>> {
        self.deliveries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Transport for RecordingTransport {
    fn send(&self, to: &str, event: &ServerEvent) {
        self.lock().push((to.to_string(), event.clone()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_in_order() {
        let transport = RecordingTransport::new();
        transport.send("c1", &ServerEvent::WhiteboardEnd);
        transport.send_many(
            &["c2".to_string(), "c1".to_string()],
            &ServerEvent::CodeChange { code: "x".to_string() },
        );

        let deliveries = transport.deliveries();
        assert_eq!(deliveries.len(), 3);
        assert_eq!(deliveries[1].0, "c2");
        assert_eq!(transport.events_for("c1").len(), 2);
    }

    #[test]
    fn test_take_drains() {
        let transport = RecordingTransport::new();
        transport.send("c1", &ServerEvent::WhiteboardEnd);

        assert_eq!(transport.take().len(), 1);
        assert!(transport.deliveries().is_empty());
    }
}
