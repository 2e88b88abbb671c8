//! Message-oriented transports used by the connection manager
//!
//! This module provides:
//! - The `Transport` / `TransportFactory` seam the manager opens connections through
//! - Transport notices (ready, frame, closed, error) tagged with their connection id
//! - A tokio-tungstenite WebSocket transport
//! - An in-memory transport for embedding and tests

mod factory;
pub mod memory;
pub mod websocket;

use thiserror::Error;
use tokio::sync::mpsc;
use uuid::Uuid;

pub use factory::create_transport_factory;
pub use memory::{MemoryTransportFactory, MemoryWire};
pub use websocket::WebSocketTransportFactory;

/// Identifier of one transport instance opened by the manager
pub type ConnectionId = Uuid;

/// Sender half for transport notices
pub type NoticeSender = mpsc::UnboundedSender<TransportNotice>;

/// Receiver half for transport notices
pub type NoticeReceiver = mpsc::UnboundedReceiver<TransportNotice>;

/// Create the channel transports report their lifecycle on
pub fn notice_channel() -> (NoticeSender, NoticeReceiver) {
    mpsc::unbounded_channel()
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Invalid transport URL: {0}")]
    InvalidUrl(String),

    #[error("Transport channel closed")]
    ChannelClosed,

    #[error("Transport failure: {0}")]
    Remote(String),
}

/// Signals a transport raises asynchronously
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// The connection is established and accepts writes
    Ready,
    /// One inbound frame, undecoded
    Frame(Vec<u8>),
    /// The connection is gone, whichever side closed it
    Closed,
    /// Protocol or network failure
    Error(String),
}

/// A transport event tagged with the connection that raised it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportNotice {
    pub connection_id: ConnectionId,
    pub event: TransportEvent,
}

impl TransportNotice {
    pub fn new(connection_id: ConnectionId, event: TransportEvent) -> Self {
        Self {
            connection_id,
            event,
        }
    }
}

/// Write side of one open connection.
///
/// Writes are issued synchronously in call order; delivery is fire-and-forget.
pub trait Transport: Send {
    fn send_text(&mut self, frame: String) -> Result<(), TransportError>;

    /// Request close. The transport reports `Closed` once it is gone.
    fn close(&mut self);
}

/// Opens fresh transport instances
pub trait TransportFactory: Send {
    fn open(
        &mut self,
        connection_id: ConnectionId,
        url: &str,
    ) -> Result<Box<dyn Transport>, TransportError>;
}
