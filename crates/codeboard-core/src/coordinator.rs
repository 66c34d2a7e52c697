//! Room membership, join/leave sequencing and event fan-out.
//!
//! The coordinator is the only writer of the per-room stores. Each call runs
//! to completion, including every outbound send, before it returns.
//!
//! Fan-out rules:
//! - `whiteboard-begin/draw/end` and `code-change` are deltas and go to every
//!   member except the sender.
//! - `whiteboard-clear/undo/redo` carry the full resulting stroke log and go to
//!   every member, sender included.
//! - Sync replies (`whiteboard-sync` on join or request, `code-sync`) go to the
//!   requesting connection only.
//!
//! Rooms are created on first reference and live for the life of the process
//! unless [`CoordinatorConfig::evict_empty_rooms`] is set, in which case a room
//! is dropped as soon as an operation leaves it without members.

use std::collections::HashMap;

use crate::code_buffer::CodeBufferStore;
use crate::protocol::{ConnectedClient, ServerEvent};
use crate::registry::{ParticipantRegistry, ANONYMOUS};
use crate::transport::Transport;
use crate::whiteboard::{Point, WhiteboardStore};
use crate::{ConnectionId, RoomId};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CoordinatorConfig {
    /// Drop a room's membership, whiteboard and code whenever it is left
    /// without members.
    pub evict_empty_rooms: bool,
}

pub struct RoomCoordinator<T> {
    transport: T,
    config: CoordinatorConfig,
    participants: ParticipantRegistry,
    /// Members of each room, in join order.
    rooms: HashMap<RoomId, Vec<ConnectionId>>,
    /// Rooms each connection has joined, in join order.
    memberships: HashMap<ConnectionId, Vec<RoomId>>,
    whiteboards: WhiteboardStore,
    code: CodeBufferStore,
}

impl<T: Transport> RoomCoordinator<T> {
    pub fn new(transport: T) -> Self {
        Self::with_config(transport, CoordinatorConfig::default())
    }

    pub fn with_config(transport: T, config: CoordinatorConfig) -> Self {
        Self {
            transport,
            config,
            participants: ParticipantRegistry::new(),
            rooms: HashMap::new(),
            memberships: HashMap::new(),
            whiteboards: WhiteboardStore::new(),
            code: CodeBufferStore::new(),
        }
    }

    pub fn participants(&self) -> &ParticipantRegistry {
        &self.participants
    }

    pub fn whiteboards(&self) -> &WhiteboardStore {
        &self.whiteboards
    }

    pub fn code_buffers(&self) -> &CodeBufferStore {
        &self.code
    }

    /// Whether the room has been referenced (and so owns a whiteboard and a
    /// code buffer).
    pub fn has_room(&self, room_id: &str) -> bool {
        self.rooms.contains_key(room_id)
    }

    /// Whether a `draw` in this room would extend a stroke.
    pub fn has_active_stroke(&self, room_id: &str) -> bool {
        self.whiteboards
            .session(room_id)
            .is_some_and(|session| session.has_active_stroke())
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Current members of a room, in join order.
    pub fn members(&self, room_id: &str) -> &[ConnectionId] {
        self.rooms.get(room_id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Rooms a connection currently belongs to.
    pub fn rooms_of(&self, connection_id: &str) -> &[RoomId] {
        self.memberships
            .get(connection_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Get or create a room together with its whiteboard and code buffer.
    pub fn ensure_room(&mut self, room_id: &str) {
        if !self.rooms.contains_key(room_id) {
            log::debug!("Creating room {}", room_id);
            self.rooms.insert(room_id.to_string(), Vec::new());
        }
        self.whiteboards.session_mut(room_id);
        self.code.ensure(room_id);
    }

    /// Add a connection to a room and bring it up to date.
    ///
    /// Every member (joiner included) receives `joined` with the full roster;
    /// the joiner alone then receives the stroke log and the code text.
    pub fn join(&mut self, from: &str, room_id: &str, username: Option<&str>) {
        if room_id.is_empty() {
            log::debug!("Ignoring join without room from {}", from);
            return;
        }
        let name = username.filter(|name| !name.is_empty()).unwrap_or(ANONYMOUS);

        self.participants.register(from, name);
        self.ensure_room(room_id);

        if let Some(members) = self.rooms.get_mut(room_id) {
            if !members.iter().any(|member| member == from) {
                members.push(from.to_string());
            }
        }
        let joined = self.memberships.entry(from.to_string()).or_default();
        if !joined.iter().any(|room| room == room_id) {
            joined.push(room_id.to_string());
        }

        let event = ServerEvent::Joined {
            clients: self.roster(room_id),
            username: name.to_string(),
            socket_id: from.to_string(),
        };
        self.transport.send_many(self.members(room_id), &event);

        self.transport.send(
            from,
            &ServerEvent::WhiteboardSync {
                whiteboard_data: self.whiteboards.snapshot(room_id),
            },
        );
        self.transport.send(
            from,
            &ServerEvent::CodeSync {
                code: self.code.get(room_id).to_string(),
            },
        );

        log::info!("{} ({}) joined room {}", name, from, room_id);
    }

    /// Remove a connection from one room, notifying the remaining members.
    pub fn leave(&mut self, from: &str, room_id: &str) {
        let Some(joined) = self.memberships.get_mut(from) else {
            return;
        };
        let Some(index) = joined.iter().position(|room| room == room_id) else {
            return;
        };
        joined.remove(index);
        if joined.is_empty() {
            self.memberships.remove(from);
        }

        self.depart(from, room_id);
        log::info!("{} left room {}", from, room_id);
    }

    /// Tear down a closed connection.
    ///
    /// Each room it belonged to gets a `disconnected` event, computed from the
    /// membership as it stood before removal. Safe to call more than once;
    /// later calls find no membership and emit nothing.
    pub fn disconnect(&mut self, from: &str) {
        let rooms = self.memberships.remove(from).unwrap_or_default();
        for room_id in &rooms {
            self.depart(from, room_id);
        }
        self.participants.unregister(from);
        log::info!("{} disconnected ({} rooms)", from, rooms.len());
    }

    pub fn begin(&mut self, from: &str, room_id: &str, point: Point) {
        if !self.has_room(room_id) {
            log::debug!("Ignoring whiteboard-begin for unknown room {}", room_id);
            return;
        }
        self.whiteboards.begin(room_id, point.clone());
        self.send_to_others(room_id, from, &ServerEvent::WhiteboardBegin { point });
    }

    pub fn draw(&mut self, from: &str, room_id: &str, point: Point) {
        if !self.has_room(room_id) {
            log::debug!("Ignoring whiteboard-draw for unknown room {}", room_id);
            return;
        }
        if !self.whiteboards.draw(room_id, point.clone()) {
            log::debug!("whiteboard-draw without a stroke in room {}", room_id);
        }
        self.send_to_others(room_id, from, &ServerEvent::WhiteboardDraw { point });
    }

    pub fn end(&mut self, from: &str, room_id: &str) {
        if !self.has_room(room_id) {
            return;
        }
        self.whiteboards.end(room_id);
        self.send_to_others(room_id, from, &ServerEvent::WhiteboardEnd);
    }

    pub fn clear(&mut self, room_id: &str) {
        self.ensure_room(room_id);
        self.whiteboards.clear(room_id);
        let event = ServerEvent::WhiteboardClear {
            whiteboard_data: self.whiteboards.snapshot(room_id),
        };
        self.send_to_all(room_id, &event);
        self.evict_if_empty(room_id);
    }

    pub fn undo(&mut self, room_id: &str) {
        if !self.has_room(room_id) || !self.whiteboards.undo(room_id) {
            return;
        }
        self.broadcast_snapshot(room_id);
    }

    pub fn redo(&mut self, room_id: &str) {
        if !self.has_room(room_id) || !self.whiteboards.redo(room_id) {
            return;
        }
        self.broadcast_snapshot(room_id);
    }

    /// Send the current stroke log to the requester only.
    pub fn request_sync(&mut self, from: &str, room_id: &str) {
        if !self.has_room(room_id) {
            return;
        }
        let event = ServerEvent::WhiteboardSync {
            whiteboard_data: self.whiteboards.snapshot(room_id),
        };
        self.transport.send(from, &event);
    }

    pub fn code_change(&mut self, from: &str, room_id: &str, code: String) {
        self.ensure_room(room_id);
        self.code.set(room_id, code.clone());
        self.send_to_others(room_id, from, &ServerEvent::CodeChange { code });
        self.evict_if_empty(room_id);
    }

    fn name_of(&self, connection_id: &str) -> String {
        self.participants
            .lookup(connection_id)
            .unwrap_or(ANONYMOUS)
            .to_string()
    }

    fn roster(&self, room_id: &str) -> Vec<ConnectedClient> {
        self.members(room_id)
            .iter()
            .map(|member| ConnectedClient {
                socket_id: member.clone(),
                username: self.name_of(member),
            })
            .collect()
    }

    /// Notify the other members, then drop `from` from the room.
    fn depart(&mut self, from: &str, room_id: &str) {
        let event = ServerEvent::Disconnected {
            socket_id: from.to_string(),
            username: self.name_of(from),
        };
        self.send_to_others(room_id, from, &event);

        if let Some(members) = self.rooms.get_mut(room_id) {
            members.retain(|member| member != from);
        }
        self.evict_if_empty(room_id);
    }

    fn evict_if_empty(&mut self, room_id: &str) {
        if !self.config.evict_empty_rooms || !self.members(room_id).is_empty() {
            return;
        }
        self.rooms.remove(room_id);
        self.whiteboards.remove(room_id);
        self.code.remove(room_id);
        log::info!("Evicted empty room {}", room_id);
    }

    fn broadcast_snapshot(&self, room_id: &str) {
        let event = ServerEvent::WhiteboardSync {
            whiteboard_data: self.whiteboards.snapshot(room_id),
        };
        self.send_to_all(room_id, &event);
    }

    fn send_to_all(&self, room_id: &str, event: &ServerEvent) {
        self.transport.send_many(self.members(room_id), event);
    }

    fn send_to_others(&self, room_id: &str, from: &str, event: &ServerEvent) {
        let others: Vec<ConnectionId> = self
            .members(room_id)
            .iter()
            .filter(|member| *member != from)
            .cloned()
            .collect();
        if !others.is_empty() {
            self.transport.send_many(&others, event);
        }
    }
}
