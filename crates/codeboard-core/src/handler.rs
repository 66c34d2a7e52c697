//! Inbound frame validation and routing.

use thiserror::Error;

use crate::coordinator::RoomCoordinator;
use crate::protocol::ClientEvent;
use crate::transport::Transport;

/// Reasons an inbound frame is dropped.
///
/// Neither is reported back to the client; callers only log them.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Malformed event: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("Event '{0}' has no room identifier")]
    MissingRoom(&'static str),
}

/// Parses client frames and drives the [`RoomCoordinator`].
pub struct SyncHandler<T> {
    coordinator: RoomCoordinator<T>,
}

impl<T: Transport> SyncHandler<T> {
    pub fn new(coordinator: RoomCoordinator<T>) -> Self {
        Self { coordinator }
    }

    pub fn coordinator(&self) -> &RoomCoordinator<T> {
        &self.coordinator
    }

    /// Decode a JSON text frame.
    pub fn parse(frame: &str) -> Result<ClientEvent, ProtocolError> {
        Ok(serde_json::from_str(frame)?)
    }

    /// Decode and apply a frame received from `from`.
    pub fn handle_frame(&mut self, from: &str, frame: &str) -> Result<(), ProtocolError> {
        let event = Self::parse(frame)?;
        self.handle_event(from, event)
    }

    /// Apply an already-decoded event. Events without a room are rejected
    /// before any state is touched.
    pub fn handle_event(&mut self, from: &str, event: ClientEvent) -> Result<(), ProtocolError> {
        let room_id = match event.room_id() {
            Some(room_id) if !room_id.is_empty() => room_id.to_string(),
            _ => return Err(ProtocolError::MissingRoom(event.kind())),
        };

        let coordinator = &mut self.coordinator;
        match event {
            ClientEvent::Join { username, .. } => {
                coordinator.join(from, &room_id, username.as_deref())
            }
            ClientEvent::Leave { .. } => coordinator.leave(from, &room_id),
            ClientEvent::WhiteboardBegin { point, .. } => coordinator.begin(from, &room_id, point),
            ClientEvent::WhiteboardDraw { point, .. } => coordinator.draw(from, &room_id, point),
            ClientEvent::WhiteboardEnd { .. } => coordinator.end(from, &room_id),
            ClientEvent::WhiteboardClear { .. } => coordinator.clear(&room_id),
            ClientEvent::WhiteboardUndo { .. } => coordinator.undo(&room_id),
            ClientEvent::WhiteboardRedo { .. } => coordinator.redo(&room_id),
            ClientEvent::WhiteboardRequestSync { .. } => coordinator.request_sync(from, &room_id),
            ClientEvent::CodeChange { code, .. } => coordinator.code_change(from, &room_id, code),
        }
        Ok(())
    }

    /// The connection is gone.
    pub fn disconnect(&mut self, from: &str) {
        self.coordinator.disconnect(from);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::ServerEvent;
    use crate::transport::RecordingTransport;
    use crate::whiteboard::{Point, Stroke};
    use serde_json::json;

    fn handler(transport: &RecordingTransport) -> SyncHandler<&RecordingTransport> {
        SyncHandler::new(RoomCoordinator::new(transport))
    }

    #[test]
    fn test_missing_room_is_rejected() {
        let transport = RecordingTransport::new();
        let mut handler = handler(&transport);

        let result = handler.handle_frame("c1", r#"{"type":"join","username":"Alice"}"#);
        assert!(matches!(result, Err(ProtocolError::MissingRoom("join"))));

        let result = handler.handle_frame("c1", r#"{"type":"join","roomId":"","username":"Alice"}"#);
        assert!(matches!(result, Err(ProtocolError::MissingRoom("join"))));

        assert!(transport.deliveries().is_empty());
        assert!(handler.coordinator().participants().is_empty());
    }

    #[test]
    fn test_malformed_frames_are_rejected() {
        let transport = RecordingTransport::new();
        let mut handler = handler(&transport);

        for frame in [
            "not json",
            r#"{"type":"teleport","roomId":"r1"}"#,
            r#"{"type":"whiteboard-begin","roomId":"r1"}"#,
            r#"{"type":"code-change","roomId":"r1","code":42}"#,
        ] {
            let result = handler.handle_frame("c1", frame);
            assert!(matches!(result, Err(ProtocolError::Malformed(_))), "{frame}");
        }
        assert!(transport.deliveries().is_empty());
    }

    #[test]
    fn test_drawing_session_through_frames() {
        let transport = RecordingTransport::new();
        let mut handler = handler(&transport);

        let frames = [
            r#"{"type":"join","roomId":"r1","username":"Alice"}"#,
            r#"{"type":"whiteboard-begin","roomId":"r1","point":{"x":0,"y":0}}"#,
            r#"{"type":"whiteboard-draw","roomId":"r1","point":{"x":1,"y":1}}"#,
            r#"{"type":"whiteboard-end","roomId":"r1"}"#,
        ];
        for frame in frames {
            handler.handle_frame("c1", frame).unwrap();
        }

        let stroke = Stroke {
            points: vec![Point(json!({"x":0,"y":0})), Point(json!({"x":1,"y":1}))],
        };
        assert_eq!(
            handler.coordinator().whiteboards().snapshot("r1"),
            vec![stroke.clone()]
        );

        transport.take();
        handler
            .handle_frame("c1", r#"{"type":"whiteboard-undo","roomId":"r1"}"#)
            .unwrap();
        handler
            .handle_frame("c1", r#"{"type":"whiteboard-redo","roomId":"r1"}"#)
            .unwrap();

        assert_eq!(
            transport.events_for("c1"),
            vec![
                ServerEvent::WhiteboardSync { whiteboard_data: Vec::new() },
                ServerEvent::WhiteboardSync { whiteboard_data: vec![stroke] },
            ]
        );
    }

    #[test]
    fn test_join_and_disconnect_scenario() {
        let transport = RecordingTransport::new();
        let mut handler = handler(&transport);

        handler
            .handle_frame("c1", r#"{"type":"join","roomId":"r1","username":"Alice"}"#)
            .unwrap();
        handler
            .handle_frame("c2", r#"{"type":"join","roomId":"r1","username":"Bob"}"#)
            .unwrap();

        let Some(ServerEvent::Joined { clients, .. }) = transport.events_for("c1").pop() else {
            panic!("Expected joined event");
        };
        let names: Vec<_> = clients.iter().map(|c| c.username.as_str()).collect();
        assert_eq!(names, vec!["Alice", "Bob"]);

        transport.take();
        handler.disconnect("c2");
        assert_eq!(
            transport.events_for("c1"),
            vec![ServerEvent::Disconnected {
                socket_id: "c2".to_string(),
                username: "Bob".to_string(),
            }]
        );
    }

    #[test]
    fn test_code_change_then_join() {
        let transport = RecordingTransport::new();
        let mut handler = handler(&transport);

        handler
            .handle_frame("c1", r#"{"type":"join","roomId":"r1","username":"Alice"}"#)
            .unwrap();
        handler
            .handle_frame("c1", r#"{"type":"code-change","roomId":"r1","code":"print(1)"}"#)
            .unwrap();
        handler
            .handle_frame("c3", r#"{"type":"join","roomId":"r1","username":"Carol"}"#)
            .unwrap();

        assert!(transport
            .events_for("c3")
            .contains(&ServerEvent::CodeSync { code: "print(1)".to_string() }));
    }
}
