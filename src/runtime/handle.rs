use tokio::sync::{mpsc, oneshot};

use crate::connection_manager::{MessageListener, SessionStats, TransportState};
use crate::error::{Result, SessionError};
use crate::websocket::{LobbyId, Message, SessionId};

/// Requests the UI issues to the session runtime
pub enum SessionCommand {
    Navigate(String),
    Connect {
        session_id: SessionId,
        lobby_id: LobbyId,
    },
    Send(Message),
    Disconnect,
    OnMessage(MessageListener),
    ClearListener,
    State(oneshot::Sender<TransportState>),
    Stats(oneshot::Sender<SessionStats>),
    Shutdown,
}

impl std::fmt::Debug for SessionCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Navigate(view) => f.debug_tuple("Navigate").field(view).finish(),
            Self::Connect {
                session_id,
                lobby_id,
            } => f
                .debug_struct("Connect")
                .field("session_id", session_id)
                .field("lobby_id", lobby_id)
                .finish(),
            Self::Send(message) => f.debug_tuple("Send").field(&message.kind).finish(),
            Self::Disconnect => f.write_str("Disconnect"),
            Self::OnMessage(_) => f.write_str("OnMessage"),
            Self::ClearListener => f.write_str("ClearListener"),
            Self::State(_) => f.write_str("State"),
            Self::Stats(_) => f.write_str("Stats"),
            Self::Shutdown => f.write_str("Shutdown"),
        }
    }
}

/// Cloneable handle the UI layer uses to drive a running session.
///
/// Calls are queued in order and return once queued. Transport failures are
/// reported by the runtime's log, not here; an error only means the runtime
/// has stopped.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    commands: mpsc::UnboundedSender<SessionCommand>,
}

impl SessionHandle {
    pub(crate) fn new(commands: mpsc::UnboundedSender<SessionCommand>) -> Self {
        Self { commands }
    }

    /// Report the view that is now active
    pub fn navigate(&self, view: impl Into<String>) -> Result<()> {
        self.send(SessionCommand::Navigate(view.into()))
    }

    pub fn connect(
        &self,
        session_id: impl Into<SessionId>,
        lobby_id: impl Into<LobbyId>,
    ) -> Result<()> {
        self.send(SessionCommand::Connect {
            session_id: session_id.into(),
            lobby_id: lobby_id.into(),
        })
    }

    pub fn send_message(&self, message: Message) -> Result<()> {
        self.send(SessionCommand::Send(message))
    }

    pub fn disconnect(&self) -> Result<()> {
        self.send(SessionCommand::Disconnect)
    }

    /// Register the inbound listener, replacing any previous one
    pub fn on_message<F>(&self, listener: F) -> Result<()>
    where
        F: FnMut(Message) + Send + 'static,
    {
        self.send(SessionCommand::OnMessage(Box::new(listener)))
    }

    pub fn clear_listener(&self) -> Result<()> {
        self.send(SessionCommand::ClearListener)
    }

    pub async fn state(&self) -> Result<TransportState> {
        let (tx, rx) = oneshot::channel();
        self.send(SessionCommand::State(tx))?;
        rx.await.map_err(|_| SessionError::RuntimeStopped)
    }

    pub async fn stats(&self) -> Result<SessionStats> {
        let (tx, rx) = oneshot::channel();
        self.send(SessionCommand::Stats(tx))?;
        rx.await.map_err(|_| SessionError::RuntimeStopped)
    }

    /// Stop the runtime, closing any open transport
    pub fn shutdown(&self) -> Result<()> {
        self.send(SessionCommand::Shutdown)
    }

    pub fn is_running(&self) -> bool {
        !self.commands.is_closed()
    }

    fn send(&self, command: SessionCommand) -> Result<()> {
        self.commands
            .send(command)
            .map_err(|_| SessionError::RuntimeStopped)
    }
}
