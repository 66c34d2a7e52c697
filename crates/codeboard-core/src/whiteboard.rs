//! Whiteboard stroke log with undo/redo.
//!
//! Each room owns a [`WhiteboardSession`]: an ordered log of strokes plus a
//! stack of undone strokes. Only the most recently started stroke accepts new
//! points; earlier strokes change only through undo/redo/clear.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::RoomId;

/// A point as sent by clients. Passed through without interpretation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Point(pub serde_json::Value);

/// A single pen stroke.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "stroke")]
pub struct Stroke {
    pub points: Vec<Point>,
}

impl Stroke {
    /// Start a stroke at `point`.
    pub fn new(point: Point) -> Self {
        Self { points: vec![point] }
    }
}

/// Stroke log and redo stack for one room.
#[derive(Debug, Clone, Default)]
pub struct WhiteboardSession {
    strokes: Vec<Stroke>,
    redo_stack: Vec<Stroke>,
}

impl WhiteboardSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new stroke. Invalidates the redo history.
    pub fn begin(&mut self, point: Point) {
        self.strokes.push(Stroke::new(point));
        self.redo_stack.clear();
    }

    /// Extend the current stroke.
    /// Returns false (and stores nothing) when no stroke has been started.
    pub fn draw(&mut self, point: Point) -> bool {
        match self.strokes.last_mut() {
            Some(stroke) => {
                stroke.points.push(point);
                true
            }
            None => false,
        }
    }

    /// Marks the end of the current stroke. Stored state is unchanged.
    pub fn end(&mut self) {}

    /// Drop every stroke and the redo history.
    pub fn clear(&mut self) {
        self.strokes.clear();
        self.redo_stack.clear();
    }

    /// Move the last stroke onto the redo stack.
    /// Returns true if undo was performed, false if there was nothing to undo.
    pub fn undo(&mut self) -> bool {
        if let Some(stroke) = self.strokes.pop() {
            self.redo_stack.push(stroke);
            true
        } else {
            false
        }
    }

    /// Restore the most recently undone stroke.
    /// Returns true if redo was performed, false if there was nothing to redo.
    pub fn redo(&mut self) -> bool {
        if let Some(stroke) = self.redo_stack.pop() {
            self.strokes.push(stroke);
            true
        } else {
            false
        }
    }

    /// The visible stroke log, oldest first.
    pub fn snapshot(&self) -> &[Stroke] {
        &self.strokes
    }

    /// Whether a `draw` would land on a stroke.
    pub fn has_active_stroke(&self) -> bool {
        !self.strokes.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn redo_depth(&self) -> usize {
        self.redo_stack.len()
    }
}

/// Whiteboard sessions for all rooms.
///
/// Every operation get-or-creates the room's session, so a room with no prior
/// activity behaves as an empty whiteboard.
#[derive(Debug, Default)]
pub struct WhiteboardStore {
    sessions: HashMap<RoomId, WhiteboardSession>,
}

impl WhiteboardStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or create the session for a room.
    pub fn session_mut(&mut self, room_id: &str) -> &mut WhiteboardSession {
        self.sessions.entry(room_id.to_string()).or_default()
    }

    pub fn session(&self, room_id: &str) -> Option<&WhiteboardSession> {
        self.sessions.get(room_id)
    }

    pub fn contains(&self, room_id: &str) -> bool {
        self.sessions.contains_key(room_id)
    }

    pub fn begin(&mut self, room_id: &str, point: Point) {
        self.session_mut(room_id).begin(point);
    }

    pub fn draw(&mut self, room_id: &str, point: Point) -> bool {
        self.session_mut(room_id).draw(point)
    }

    pub fn end(&mut self, room_id: &str) {
        self.session_mut(room_id).end();
    }

    pub fn clear(&mut self, room_id: &str) {
        self.session_mut(room_id).clear();
    }

    pub fn undo(&mut self, room_id: &str) -> bool {
        self.session_mut(room_id).undo()
    }

    pub fn redo(&mut self, room_id: &str) -> bool {
        self.session_mut(room_id).redo()
    }

    /// Copy of the room's stroke log, empty for an unseen room.
    pub fn snapshot(&self, room_id: &str) -> Vec<Stroke> {
        self.sessions
            .get(room_id)
            .map(|session| session.snapshot().to_vec())
            .unwrap_or_default()
    }

    /// Forget a room entirely.
    pub fn remove(&mut self, room_id: &str) -> Option<WhiteboardSession> {
        self.sessions.remove(room_id)
    }
}
