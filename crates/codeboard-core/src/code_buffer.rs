//! Shared code text per room. Last writer wins.

use std::collections::HashMap;

use crate::RoomId;

#[derive(Debug, Default)]
pub struct CodeBufferStore {
    buffers: HashMap<RoomId, String>,
}

impl CodeBufferStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current text for a room; empty if the room has never been written.
    pub fn get(&self, room_id: &str) -> &str {
        self.buffers.get(room_id).map(String::as_str).unwrap_or("")
    }

    /// Replace the room's text unconditionally.
    pub fn set(&mut self, room_id: &str, text: String) {
        self.buffers.insert(room_id.to_string(), text);
    }

    /// Create an empty buffer for the room if it has none.
    pub fn ensure(&mut self, room_id: &str) {
        self.buffers.entry(room_id.to_string()).or_default();
    }

    pub fn contains(&self, room_id: &str) -> bool {
        self.buffers.contains_key(room_id)
    }

    pub fn remove(&mut self, room_id: &str) -> Option<String> {
        self.buffers.remove(room_id)
    }
}
