//! Display names of connected participants.

use std::collections::HashMap;

use crate::ConnectionId;

/// Name used when a participant joins without one.
pub const ANONYMOUS: &str = "Anonymous";

/// Maps connection identifiers to display names.
#[derive(Debug, Default)]
pub struct ParticipantRegistry {
    names: HashMap<ConnectionId, String>,
}

impl ParticipantRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store or overwrite the display name for a connection.
    pub fn register(&mut self, connection_id: &str, name: &str) {
        self.names.insert(connection_id.to_string(), name.to_string());
    }

    /// Look up the display name for a connection.
    pub fn lookup(&self, connection_id: &str) -> Option<&str> {
        self.names.get(connection_id).map(String::as_str)
    }

    /// Remove a connection, returning its last-known name.
    pub fn unregister(&mut self, connection_id: &str) -> Option<String> {
        self.names.remove(connection_id)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
