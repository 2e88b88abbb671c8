// Supporting modules
pub mod config;
pub mod error;
pub mod telemetry;

// Protocol and transports
pub mod transport;
pub mod websocket;

// Session layer
pub mod connection_manager;
pub mod runtime;

pub use connection_manager::{ConnectionManager, SessionStats, TransportState};
pub use error::SessionError;
pub use runtime::{SessionHandle, SessionRuntime};
pub use websocket::{LobbyId, Message, MessageType, SessionId};
