use thiserror::Error;

use crate::connection_manager::TransportState;
use crate::transport::TransportError;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// A send or join was attempted while no transport is open
    #[error("Transport not ready (state: {state})")]
    TransportNotReady { state: TransportState },

    /// An inbound frame did not match the message schema
    #[error("Failed to decode inbound frame: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("Failed to encode outbound message: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// A message arrived with no listener registered
    #[error("No message listener registered")]
    ListenerMissing,

    #[error("Session runtime has stopped")]
    RuntimeStopped,
}

impl SessionError {
    /// Stable code used in logs
    pub fn code(&self) -> &'static str {
        match self {
            SessionError::Config(_) => "CONFIG_ERROR",
            SessionError::TransportNotReady { .. } => "TRANSPORT_NOT_READY",
            SessionError::Decode(_) => "DECODE_FAILURE",
            SessionError::Encode(_) => "ENCODE_FAILURE",
            SessionError::Transport(_) => "TRANSPORT_ERROR",
            SessionError::ListenerMissing => "LISTENER_MISSING",
            SessionError::RuntimeStopped => "RUNTIME_STOPPED",
        }
    }
}

pub type Result<T> = std::result::Result<T, SessionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_ready_mentions_state() {
        let err = SessionError::TransportNotReady {
            state: TransportState::Opening,
        };
        assert_eq!(err.to_string(), "Transport not ready (state: opening)");
        assert_eq!(err.code(), "TRANSPORT_NOT_READY");
    }

    #[test]
    fn test_transport_error_converts() {
        let err: SessionError = TransportError::ChannelClosed.into();
        assert!(matches!(err, SessionError::Transport(TransportError::ChannelClosed)));
        assert_eq!(err.code(), "TRANSPORT_ERROR");
    }
}
