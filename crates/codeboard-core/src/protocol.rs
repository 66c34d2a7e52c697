//! Wire events exchanged with clients.
//!
//! Messages are JSON objects tagged by `type`:
//! ```json
//! { "type": "join", "roomId": "r1", "username": "Alice" }
//! { "type": "whiteboard-draw", "roomId": "r1", "point": { "x": 1, "y": 1 } }
//! { "type": "code-change", "roomId": "r1", "code": "print(1)" }
//! ```

use serde::{Deserialize, Serialize};

use crate::whiteboard::{Point, Stroke};
use crate::ConnectionId;

/// An event sent by a client.
///
/// `room_id` is optional at the serde level so that a frame without one still
/// parses; the handler drops such events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ClientEvent {
    /// Join a room under a display name
    Join {
        room_id: Option<String>,
        username: Option<String>,
    },
    /// Leave a room without closing the connection
    Leave { room_id: Option<String> },
    /// Start a new stroke
    WhiteboardBegin { room_id: Option<String>, point: Point },
    /// Extend the current stroke
    WhiteboardDraw { room_id: Option<String>, point: Point },
    /// Finish the current stroke
    WhiteboardEnd { room_id: Option<String> },
    WhiteboardClear { room_id: Option<String> },
    WhiteboardUndo { room_id: Option<String> },
    WhiteboardRedo { room_id: Option<String> },
    /// Ask for the current stroke log
    WhiteboardRequestSync { room_id: Option<String> },
    /// Replace the shared code text
    CodeChange { room_id: Option<String>, code: String },
}

impl ClientEvent {
    pub fn room_id(&self) -> Option<&str> {
        match self {
            ClientEvent::Join { room_id, .. }
            | ClientEvent::Leave { room_id }
            | ClientEvent::WhiteboardBegin { room_id, .. }
            | ClientEvent::WhiteboardDraw { room_id, .. }
            | ClientEvent::WhiteboardEnd { room_id }
            | ClientEvent::WhiteboardClear { room_id }
            | ClientEvent::WhiteboardUndo { room_id }
            | ClientEvent::WhiteboardRedo { room_id }
            | ClientEvent::WhiteboardRequestSync { room_id }
            | ClientEvent::CodeChange { room_id, .. } => room_id.as_deref(),
        }
    }

    /// Wire name of the event.
    pub fn kind(&self) -> &'static str {
        match self {
            ClientEvent::Join { .. } => "join",
            ClientEvent::Leave { .. } => "leave",
            ClientEvent::WhiteboardBegin { .. } => "whiteboard-begin",
            ClientEvent::WhiteboardDraw { .. } => "whiteboard-draw",
            ClientEvent::WhiteboardEnd { .. } => "whiteboard-end",
            ClientEvent::WhiteboardClear { .. } => "whiteboard-clear",
            ClientEvent::WhiteboardUndo { .. } => "whiteboard-undo",
            ClientEvent::WhiteboardRedo { .. } => "whiteboard-redo",
            ClientEvent::WhiteboardRequestSync { .. } => "whiteboard-request-sync",
            ClientEvent::CodeChange { .. } => "code-change",
        }
    }
}

/// A room member as listed in `joined` events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectedClient {
    pub socket_id: ConnectionId,
    pub username: String,
}

/// An event delivered to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ServerEvent {
    /// Someone joined; carries the full roster after the join
    Joined {
        clients: Vec<ConnectedClient>,
        username: String,
        socket_id: ConnectionId,
    },
    /// A member left the room or closed its connection
    Disconnected {
        socket_id: ConnectionId,
        username: String,
    },
    WhiteboardBegin { point: Point },
    WhiteboardDraw { point: Point },
    WhiteboardEnd,
    /// Whiteboard was wiped; `whiteboard_data` is the (empty) resulting log
    WhiteboardClear { whiteboard_data: Vec<Stroke> },
    /// Full stroke log
    WhiteboardSync { whiteboard_data: Vec<Stroke> },
    /// Current code text, sent to a joiner
    CodeSync { code: String },
    /// Code text replaced by another member
    CodeChange { code: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_client_event_deserialize() {
        let json = r#"{"type":"whiteboard-begin","roomId":"r1","point":{"x":0,"y":0}}"#;
        let event: ClientEvent = serde_json::from_str(json).unwrap();
        assert_eq!(
            event,
            ClientEvent::WhiteboardBegin {
                room_id: Some("r1".to_string()),
                point: Point(json!({ "x": 0, "y": 0 })),
            }
        );
        assert_eq!(event.kind(), "whiteboard-begin");
    }

    #[test]
    fn test_join_without_room_parses() {
        let event: ClientEvent = serde_json::from_str(r#"{"type":"join","username":"Bob"}"#).unwrap();
        assert_eq!(event.room_id(), None);
    }

    #[test]
    fn test_request_sync_name() {
        let event: ClientEvent =
            serde_json::from_str(r#"{"type":"whiteboard-request-sync","roomId":"r9"}"#).unwrap();
        assert_eq!(event.room_id(), Some("r9"));
    }

    #[test]
    fn test_joined_serialize() {
        let event = ServerEvent::Joined {
            clients: vec![ConnectedClient {
                socket_id: "c1".to_string(),
                username: "Alice".to_string(),
            }],
            username: "Alice".to_string(),
            socket_id: "c1".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({
                "type": "joined",
                "clients": [{ "socketId": "c1", "username": "Alice" }],
                "username": "Alice",
                "socketId": "c1",
            })
        );
    }

    #[test]
    fn test_sync_and_end_serialize() {
        let sync = ServerEvent::WhiteboardSync { whiteboard_data: Vec::new() };
        assert_eq!(
            serde_json::to_value(&sync).unwrap(),
            json!({ "type": "whiteboard-sync", "whiteboardData": [] })
        );
        assert_eq!(
            serde_json::to_value(&ServerEvent::WhiteboardEnd).unwrap(),
            json!({ "type": "whiteboard-end" })
        );
    }
}
