use uuid::Uuid;

use crate::config::{RetryPolicy, SessionConfig};
use crate::error::{Result, SessionError};
use crate::transport::{ConnectionId, TransportError, TransportEvent, TransportFactory};
use crate::websocket::{self, LobbyId, Message, SessionId};

use super::gate::{normalize_view, ViewGate};
use super::stats::SessionStats;
use super::types::{ActiveTransport, MessageListener, TransportState};

/// Owns at most one live transport, gated by the current view.
///
/// The manager is a plain state holder: every input (view changes, UI calls,
/// transport notices) arrives through `&mut self`, so there is exactly one
/// mutator and no locking. Nothing is retried, buffered or reconnected;
/// failures are logged and counted in `SessionStats`.
pub struct ConnectionManager {
    ws_url: String,
    retry_policy: RetryPolicy,
    gate: ViewGate,
    factory: Box<dyn TransportFactory>,
    current_view: Option<String>,
    active: Option<ActiveTransport>,
    listener: Option<MessageListener>,
    stats: SessionStats,
}

impl ConnectionManager {
    pub fn new(config: &SessionConfig, factory: Box<dyn TransportFactory>) -> Self {
        Self {
            ws_url: config.ws_url.clone(),
            retry_policy: config.retry_policy,
            gate: ViewGate::new(&config.allowed_views),
            factory,
            current_view: None,
            active: None,
            listener: None,
            stats: SessionStats::default(),
        }
    }

    pub fn state(&self) -> TransportState {
        self.active
            .as_ref()
            .map(|active| active.state)
            .unwrap_or(TransportState::Closed)
    }

    /// Id of the transport currently held, in any state but `Closed`
    pub fn connection_id(&self) -> Option<ConnectionId> {
        self.active.as_ref().map(|active| active.id)
    }

    pub fn current_view(&self) -> Option<&str> {
        self.current_view.as_deref()
    }

    pub fn has_listener(&self) -> bool {
        self.listener.is_some()
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    pub fn gate(&self) -> &ViewGate {
        &self.gate
    }

    /// Feed the current view.
    ///
    /// A view change discards the held transport; entering an allow-listed view
    /// opens a fresh one. Repeating the current view changes nothing.
    pub fn set_view(&mut self, view: &str) {
        let view = normalize_view(view);
        if self.current_view.as_deref() == Some(view.as_str()) {
            return;
        }

        tracing::debug!(
            from = self.current_view.as_deref().unwrap_or("<none>"),
            to = %view,
            "View changed"
        );
        self.current_view = Some(view.clone());

        if self.active.is_some() {
            self.close_active("view changed");
        }

        if self.gate.allows(&view) {
            // The closing transport is replaced; its later notices are stale
            self.drop_active("replaced by view change");
            self.open_transport(view);
        } else {
            tracing::info!(view = %view, "Transport not allowed on this view");
        }
    }

    /// Send a `Join` for the given identities over the open transport.
    ///
    /// Does not open a transport; that follows the view.
    pub fn connect(
        &mut self,
        session_id: impl Into<SessionId>,
        lobby_id: impl Into<LobbyId>,
    ) -> Result<()> {
        self.send_message(&Message::join(session_id, lobby_id))
    }

    /// Close the held transport. No-op without one.
    pub fn disconnect(&mut self) {
        if self.active.is_none() {
            tracing::debug!("Disconnect requested with no transport");
            return;
        }
        self.close_active("disconnect requested");
    }

    /// Encode and write a message if the transport is open.
    ///
    /// Failures are reported to the log and stats before being returned, so
    /// callers may ignore the result.
    pub fn send_message(&mut self, message: &Message) -> Result<()> {
        let state = self.state();
        if state != TransportState::Open {
            let err = SessionError::TransportNotReady { state };
            self.report(&err);
            return Err(err);
        }

        let frame = match websocket::encode(message) {
            Ok(frame) => frame,
            Err(e) => {
                let err = SessionError::Encode(e);
                self.report(&err);
                return Err(err);
            }
        };

        let written = match self.active.as_mut() {
            Some(active) => {
                tracing::debug!(
                    connection_id = %active.id,
                    message_type = %message.kind,
                    session_id = %message.session_id,
                    lobby_id = %message.lobby_id,
                    "Sending message"
                );
                active.handle.send_text(frame)
            }
            None => Err(TransportError::ChannelClosed),
        };

        match written {
            Ok(()) => {
                self.stats.frames_sent += 1;
                Ok(())
            }
            Err(e) => {
                let err = SessionError::Transport(e);
                self.report(&err);
                self.drop_active("write failed");
                Err(err)
            }
        }
    }

    /// Register the inbound listener, replacing any previous one
    pub fn on_message<F>(&mut self, listener: F)
    where
        F: FnMut(Message) + Send + 'static,
    {
        if self.listener.replace(Box::new(listener)).is_some() {
            tracing::debug!("Message listener replaced");
        }
    }

    pub fn clear_listener(&mut self) {
        self.listener = None;
    }

    /// Apply a transport notice. Notices from any transport but the held one are ignored.
    pub fn handle_transport_event(&mut self, connection_id: ConnectionId, event: TransportEvent) {
        let state = match self.active.as_ref() {
            Some(active) if active.id == connection_id => active.state,
            _ => {
                tracing::trace!(connection_id = %connection_id, event = ?event, "Ignoring stale transport notice");
                return;
            }
        };

        match event {
            TransportEvent::Ready => {
                if state == TransportState::Opening {
                    self.transition(TransportState::Open);
                    tracing::info!(connection_id = %connection_id, "Connected to coordinator");
                }
            }
            TransportEvent::Frame(frame) => self.handle_frame(connection_id, &frame),
            TransportEvent::Closed => {
                if state != TransportState::Closing {
                    tracing::info!(
                        connection_id = %connection_id,
                        retry_policy = %self.retry_policy,
                        "Transport closed by remote; waiting for view re-entry"
                    );
                }
                self.drop_active("transport closed");
            }
            TransportEvent::Error(reason) => {
                self.report(&SessionError::Transport(TransportError::Remote(reason)));
                if let Some(active) = self.active.as_mut() {
                    active.handle.close();
                }
                self.drop_active("transport error");
            }
        }
    }

    fn handle_frame(&mut self, connection_id: ConnectionId, frame: &[u8]) {
        self.stats.frames_received += 1;

        let message = match websocket::decode(frame) {
            Ok(message) => message,
            Err(e) => {
                tracing::debug!(
                    connection_id = %connection_id,
                    frame = %String::from_utf8_lossy(frame),
                    "Dropping undecodable frame"
                );
                self.report(&SessionError::Decode(e));
                return;
            }
        };

        match self.listener.as_mut() {
            Some(listener) => {
                tracing::trace!(
                    connection_id = %connection_id,
                    message_type = %message.kind,
                    "Delivering message"
                );
                self.stats.messages_delivered += 1;
                listener(message);
            }
            None => self.report(&SessionError::ListenerMissing),
        }
    }

    fn open_transport(&mut self, view: String) {
        let id = Uuid::new_v4();
        match self.factory.open(id, &self.ws_url) {
            Ok(handle) => {
                let active = ActiveTransport::new(id, handle, view);
                self.stats.transports_opened += 1;
                self.stats.last_opened_at = Some(active.opened_at);
                tracing::info!(
                    connection_id = %id,
                    view = %active.view,
                    url = %self.ws_url,
                    "Opening transport"
                );
                self.active = Some(active);
            }
            Err(e) => {
                self.report(&SessionError::Transport(e));
            }
        }
    }

    /// Ask the held transport to close and wait for its `Closed` notice
    fn close_active(&mut self, reason: &'static str) {
        if let Some(active) = self.active.as_mut() {
            if active.state == TransportState::Closing {
                return;
            }
            active.handle.close();
        }
        tracing::info!(connection_id = ?self.connection_id(), reason, "Closing transport");
        self.transition(TransportState::Closing);
    }

    fn drop_active(&mut self, reason: &'static str) {
        if let Some(active) = self.active.take() {
            self.stats.transports_closed += 1;
            tracing::debug!(
                connection_id = %active.id,
                from = %active.state,
                reason,
                "Transport closed"
            );
        }
    }

    fn transition(&mut self, next: TransportState) {
        if let Some(active) = self.active.as_mut() {
            tracing::debug!(
                connection_id = %active.id,
                from = %active.state,
                to = %next,
                "Transport state transition"
            );
            active.state = next;
        }
    }

    /// Side channel for failures: log and count, never propagate
    fn report(&mut self, err: &SessionError) {
        match err {
            SessionError::TransportNotReady { state } => {
                self.stats.transport_not_ready += 1;
                tracing::warn!(
                    code = err.code(),
                    state = %state,
                    retry_policy = %self.retry_policy,
                    "Message dropped: transport not connected"
                );
            }
            SessionError::Decode(e) => {
                self.stats.decode_failures += 1;
                tracing::warn!(code = err.code(), error = %e, "Error parsing inbound message");
            }
            SessionError::Transport(e) => {
                self.stats.transport_errors += 1;
                tracing::error!(
                    code = err.code(),
                    connection_id = ?self.connection_id(),
                    error = %e,
                    retry_policy = %self.retry_policy,
                    "Transport error"
                );
            }
            SessionError::ListenerMissing => {
                self.stats.listener_missing += 1;
                tracing::debug!(code = err.code(), "Inbound message lost: no listener registered");
            }
            other => {
                tracing::error!(code = other.code(), error = %other, "Session error");
            }
        }
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        if let Some(active) = self.active.as_mut() {
            active.handle.close();
        }
    }
}
