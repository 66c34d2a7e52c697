//! CodeBoard Core Library
//!
//! Session-state synchronization for shared rooms: participant tracking,
//! the whiteboard stroke log with undo/redo, and the shared code buffer.
//! Transport-agnostic; outbound events are handed to a [`Transport`].

pub mod code_buffer;
pub mod coordinator;
pub mod handler;
pub mod protocol;
pub mod registry;
pub mod transport;
pub mod whiteboard;

pub use code_buffer::CodeBufferStore;
pub use coordinator::{CoordinatorConfig, RoomCoordinator};
pub use handler::{ProtocolError, SyncHandler};
pub use protocol::{ClientEvent, ConnectedClient, ServerEvent};
pub use registry::{ParticipantRegistry, ANONYMOUS};
pub use transport::{RecordingTransport, Transport};
pub use whiteboard::{Point, Stroke, WhiteboardSession, WhiteboardStore};

/// Opaque identifier of a live connection, assigned by the transport.
pub type ConnectionId = String;

/// Opaque room key.
pub type RoomId = String;
