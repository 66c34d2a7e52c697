//! The single task that owns all room state.
//!
//! Socket tasks never touch the stores; they forward [`ConnectionCommand`]s
//! here. Commands are handled one at a time and each runs to completion with
//! no `.await` in between, so events for a room can never interleave.

use codeboard_core::{
    ConnectionId, CoordinatorConfig, ProtocolError, RoomCoordinator, SyncHandler,
};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::transport::WsTransport;

/// Commands buffered before socket tasks have to wait for the event loop.
pub const COMMAND_CAPACITY: usize = 1024;

/// Messages from socket tasks to the event loop.
#[derive(Debug)]
pub enum ConnectionCommand {
    /// A text frame received from a client
    Frame { from: ConnectionId, text: String },
    /// The socket closed
    Disconnect { from: ConnectionId },
}

pub type CommandTx = mpsc::Sender<ConnectionCommand>;

/// Spawn the event loop. It stops once every [`CommandTx`] is dropped.
pub fn spawn(transport: WsTransport, config: CoordinatorConfig) -> (CommandTx, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::channel::<ConnectionCommand>(COMMAND_CAPACITY);

    let handle = tokio::spawn(async move {
        let mut handler = SyncHandler::new(RoomCoordinator::with_config(transport.clone(), config));
        while let Some(command) = rx.recv().await {
            handle_command(&mut handler, &transport, command);
        }
        debug!("Event loop stopped");
    });

    (tx, handle)
}

fn handle_command(
    handler: &mut SyncHandler<WsTransport>,
    transport: &WsTransport,
    command: ConnectionCommand,
) {
    match command {
        ConnectionCommand::Frame { from, text } => match handler.handle_frame(&from, &text) {
            Ok(()) => {}
            Err(ProtocolError::MissingRoom(kind)) => {
                debug!("Dropped {} from {} without room", kind, from);
            }
            Err(e) => warn!("Invalid message from {}: {}", from, e),
        },
        ConnectionCommand::Disconnect { from } => {
            handler.disconnect(&from);
            transport.unregister(&from);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(from: &str, text: &str) -> ConnectionCommand {
        ConnectionCommand::Frame {
            from: from.to_string(),
            text: text.to_string(),
        }
    }

    #[tokio::test]
    async fn test_disconnect_unregisters_socket() {
        let transport = WsTransport::new();
        let mut alice = transport.register("c1");
        let _bob = transport.register("c2");
        let (tx, handle) = spawn(transport.clone(), CoordinatorConfig::default());

        tx.send(frame("c1", r#"{"type":"join","roomId":"r1","username":"Alice"}"#))
            .await
            .unwrap();
        tx.send(frame("c2", r#"{"type":"join","roomId":"r1","username":"Bob"}"#))
            .await
            .unwrap();
        tx.send(ConnectionCommand::Disconnect { from: "c2".to_string() })
            .await
            .unwrap();
        drop(tx);
        handle.await.unwrap();

        assert_eq!(transport.peer_count(), 1);

        let mut kinds = Vec::new();
        while let Ok(frame) = alice.try_recv() {
            let event: serde_json::Value = serde_json::from_str(frame.as_str()).unwrap();
            kinds.push(event["type"].as_str().unwrap().to_string());
        }
        assert_eq!(
            kinds,
            vec!["joined", "whiteboard-sync", "code-sync", "joined", "disconnected"]
        );
    }
}
