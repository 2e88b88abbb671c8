//! Transport slot and related types

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::transport::{ConnectionId, Transport};
use crate::websocket::Message;

/// Lifecycle state of the manager's transport slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportState {
    Closed,
    Opening,
    Open,
    Closing,
}

impl TransportState {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransportState::Closed => "closed",
            TransportState::Opening => "opening",
            TransportState::Open => "open",
            TransportState::Closing => "closing",
        }
    }
}

impl fmt::Display for TransportState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inbound message listener. At most one is registered at a time.
pub type MessageListener = Box<dyn FnMut(Message) + Send + 'static>;

/// The one transport instance the manager currently holds
pub(crate) struct ActiveTransport {
    pub id: ConnectionId,
    pub handle: Box<dyn Transport>,
    pub state: TransportState,
    pub view: String,
    pub opened_at: DateTime<Utc>,
}

impl ActiveTransport {
    pub fn new(id: ConnectionId, handle: Box<dyn Transport>, view: String) -> Self {
        Self {
            id,
            handle,
            state: TransportState::Opening,
            view,
            opened_at: Utc::now(),
        }
    }
}
