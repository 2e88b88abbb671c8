//! Host event loop for the connection manager.
//!
//! A single task owns the `ConnectionManager` and applies, one at a time,
//! UI commands from `SessionHandle`s and notices raised by transports.
//! Commands keep their issue order and notices keep their delivery order.

mod handle;

use tokio::sync::mpsc;

use crate::config::SessionConfig;
use crate::connection_manager::ConnectionManager;
use crate::transport::{
    create_transport_factory, notice_channel, MemoryWire, NoticeReceiver, TransportFactory,
};

pub use handle::{SessionCommand, SessionHandle};

pub struct SessionRuntime {
    manager: ConnectionManager,
    commands: mpsc::UnboundedReceiver<SessionCommand>,
    notices: NoticeReceiver,
}

impl SessionRuntime {
    /// Build a runtime around an existing factory and the receiver of its notices
    pub fn new(
        config: &SessionConfig,
        factory: Box<dyn TransportFactory>,
        notices: NoticeReceiver,
    ) -> (Self, SessionHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        let runtime = Self {
            manager: ConnectionManager::new(config, factory),
            commands: rx,
            notices,
        };
        (runtime, SessionHandle::new(tx))
    }

    /// Build a runtime with the transport selected by configuration.
    ///
    /// The `MemoryWire` is returned when the in-memory transport is selected.
    pub fn from_config(config: &SessionConfig) -> (Self, SessionHandle, Option<MemoryWire>) {
        let (notices_tx, notices_rx) = notice_channel();
        let (factory, wire) = create_transport_factory(config, notices_tx);
        let (runtime, handle) = Self::new(config, factory, notices_rx);
        (runtime, handle, wire)
    }

    pub fn manager(&self) -> &ConnectionManager {
        &self.manager
    }

    /// Run until shutdown is requested or every handle is dropped
    #[tracing::instrument(name = "session.runtime", skip(self))]
    pub async fn run(mut self) {
        tracing::info!(
            allowed_views = ?self.manager.gate().allowed_views(),
            "Session runtime started"
        );

        loop {
            tokio::select! {
                command = self.commands.recv() => {
                    match command {
                        Some(SessionCommand::Shutdown) | None => break,
                        Some(command) => self.apply(command),
                    }
                }
                Some(notice) = self.notices.recv() => {
                    self.manager.handle_transport_event(notice.connection_id, notice.event);
                }
            }
        }

        self.manager.disconnect();
        tracing::info!(stats = ?self.manager.stats(), "Session runtime stopped");
    }

    fn apply(&mut self, command: SessionCommand) {
        tracing::trace!(command = ?command, "Applying session command");
        match command {
            SessionCommand::Navigate(view) => self.manager.set_view(&view),
            SessionCommand::Connect {
                session_id,
                lobby_id,
            } => {
                // Failures are already reported by the manager
                let _ = self.manager.connect(session_id, lobby_id);
            }
            SessionCommand::Send(message) => {
                let _ = self.manager.send_message(&message);
            }
            SessionCommand::Disconnect => self.manager.disconnect(),
            SessionCommand::OnMessage(listener) => self.manager.on_message(listener),
            SessionCommand::ClearListener => self.manager.clear_listener(),
            SessionCommand::State(reply) => {
                let _ = reply.send(self.manager.state());
            }
            SessionCommand::Stats(reply) => {
                let _ = reply.send(self.manager.stats().clone());
            }
            SessionCommand::Shutdown => {}
        }
    }
}
