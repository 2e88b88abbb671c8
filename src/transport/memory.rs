//! In-memory transport.
//!
//! Connections opened through `MemoryTransportFactory` record every frame
//! written to them. The paired `MemoryWire` plays the remote side: it inspects
//! what was written and raises transport events for a connection.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;

use super::{
    ConnectionId, NoticeSender, Transport, TransportError, TransportEvent, TransportFactory,
    TransportNotice,
};

#[derive(Debug, Default)]
struct MemoryConnection {
    sequence: u64,
    url: String,
    frames: Vec<String>,
    close_requested: bool,
}

#[derive(Debug, Default)]
struct WireState {
    connections: DashMap<ConnectionId, MemoryConnection>,
    next_sequence: AtomicU64,
}

/// Remote side of the in-memory transport
#[derive(Debug, Clone)]
pub struct MemoryWire {
    state: Arc<WireState>,
    notices: Option<NoticeSender>,
}

impl MemoryWire {
    /// Ids of every connection opened so far, oldest first
    pub fn connections(&self) -> Vec<ConnectionId> {
        let mut opened: Vec<(u64, ConnectionId)> = self
            .state
            .connections
            .iter()
            .map(|entry| (entry.value().sequence, *entry.key()))
            .collect();
        opened.sort_unstable_by_key(|(sequence, _)| *sequence);
        opened.into_iter().map(|(_, id)| id).collect()
    }

    pub fn connection_count(&self) -> usize {
        self.state.connections.len()
    }

    /// Most recently opened connection
    pub fn latest(&self) -> Option<ConnectionId> {
        self.connections().last().copied()
    }

    pub fn url(&self, connection_id: ConnectionId) -> Option<String> {
        self.state
            .connections
            .get(&connection_id)
            .map(|conn| conn.url.clone())
    }

    /// Frames written to one connection, in write order
    pub fn frames(&self, connection_id: ConnectionId) -> Vec<String> {
        self.state
            .connections
            .get(&connection_id)
            .map(|conn| conn.frames.clone())
            .unwrap_or_default()
    }

    /// Frames written across all connections
    pub fn total_frames(&self) -> usize {
        self.state
            .connections
            .iter()
            .map(|entry| entry.value().frames.len())
            .sum()
    }

    pub fn close_requested(&self, connection_id: ConnectionId) -> bool {
        self.state
            .connections
            .get(&connection_id)
            .map(|conn| conn.close_requested)
            .unwrap_or(false)
    }

    /// Raise an event for a connection on the attached notice channel.
    ///
    /// Returns false when the wire has no notice channel or the receiver is gone.
    pub fn notify(&self, connection_id: ConnectionId, event: TransportEvent) -> bool {
        match &self.notices {
            Some(tx) => tx
                .send(TransportNotice::new(connection_id, event))
                .is_ok(),
            None => false,
        }
    }

    /// Raise an inbound text frame for a connection
    pub fn push_text(&self, connection_id: ConnectionId, text: &str) -> bool {
        self.notify(
            connection_id,
            TransportEvent::Frame(text.as_bytes().to_vec()),
        )
    }
}

/// Factory producing in-memory connections
#[derive(Debug)]
pub struct MemoryTransportFactory {
    state: Arc<WireState>,
    notices: Option<NoticeSender>,
}

impl MemoryTransportFactory {
    /// Create a factory whose wire cannot raise events by itself.
    ///
    /// Callers drive the manager directly with `handle_transport_event`.
    pub fn new() -> (Self, MemoryWire) {
        Self::build(None)
    }

    /// Create a factory whose wire raises events on the given notice channel
    pub fn with_notices(notices: NoticeSender) -> (Self, MemoryWire) {
        Self::build(Some(notices))
    }

    fn build(notices: Option<NoticeSender>) -> (Self, MemoryWire) {
        let state = Arc::new(WireState::default());
        let wire = MemoryWire {
            state: state.clone(),
            notices: notices.clone(),
        };
        (Self { state, notices }, wire)
    }
}

impl TransportFactory for MemoryTransportFactory {
    fn open(
        &mut self,
        connection_id: ConnectionId,
        url: &str,
    ) -> Result<Box<dyn Transport>, TransportError> {
        if url.is_empty() {
            return Err(TransportError::InvalidUrl(url.to_string()));
        }

        let sequence = self.state.next_sequence.fetch_add(1, Ordering::Relaxed);
        self.state.connections.insert(
            connection_id,
            MemoryConnection {
                sequence,
                url: url.to_string(),
                ..Default::default()
            },
        );

        tracing::debug!(connection_id = %connection_id, url = %url, "Memory transport opened");

        Ok(Box::new(MemoryTransport {
            connection_id,
            state: self.state.clone(),
            notices: self.notices.clone(),
        }))
    }
}

struct MemoryTransport {
    connection_id: ConnectionId,
    state: Arc<WireState>,
    notices: Option<NoticeSender>,
}

impl Transport for MemoryTransport {
    fn send_text(&mut self, frame: String) -> Result<(), TransportError> {
        let mut conn = self
            .state
            .connections
            .get_mut(&self.connection_id)
            .ok_or(TransportError::ChannelClosed)?;
        if conn.close_requested {
            return Err(TransportError::ChannelClosed);
        }
        conn.frames.push(frame);
        Ok(())
    }

    /// Mark the connection closed and confirm with a `Closed` notice, once
    fn close(&mut self) {
        let first_close = match self.state.connections.get_mut(&self.connection_id) {
            Some(mut conn) => !std::mem::replace(&mut conn.close_requested, true),
            None => false,
        };

        if first_close {
            if let Some(tx) = &self.notices {
                let _ = tx.send(TransportNotice::new(self.connection_id, TransportEvent::Closed));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::notice_channel;
    use uuid::Uuid;

    #[test]
    fn test_records_frames_in_order() {
        let (mut factory, wire) = MemoryTransportFactory::new();
        let id = Uuid::new_v4();
        let mut transport = factory.open(id, "ws://coordinator/ws").unwrap();

        transport.send_text("first".to_string()).unwrap();
        transport.send_text("second".to_string()).unwrap();

        assert_eq!(wire.frames(id), vec!["first", "second"]);
        assert_eq!(wire.url(id).as_deref(), Some("ws://coordinator/ws"));
    }

    #[test]
    fn test_rejects_writes_after_close() {
        let (mut factory, wire) = MemoryTransportFactory::new();
        let id = Uuid::new_v4();
        let mut transport = factory.open(id, "ws://coordinator/ws").unwrap();

        transport.close();

        assert!(wire.close_requested(id));
        assert_eq!(
            transport.send_text("late".to_string()),
            Err(TransportError::ChannelClosed)
        );
        assert!(wire.frames(id).is_empty());
    }

    #[test]
    fn test_connections_listed_oldest_first() {
        let (mut factory, wire) = MemoryTransportFactory::new();
        let ids: Vec<_> = (0..4).map(|_| Uuid::new_v4()).collect();
        for id in &ids {
            factory.open(*id, "ws://coordinator/ws").unwrap();
        }

        assert_eq!(wire.connections(), ids);
        assert_eq!(wire.latest(), ids.last().copied());
    }

    #[test]
    fn test_empty_url_rejected() {
        let (mut factory, wire) = MemoryTransportFactory::new();
        assert!(factory.open(Uuid::new_v4(), "").is_err());
        assert_eq!(wire.connection_count(), 0);
    }

    #[tokio::test]
    async fn test_notify_reaches_notice_channel() {
        let (tx, mut rx) = notice_channel();
        let (mut factory, wire) = MemoryTransportFactory::with_notices(tx);
        let id = Uuid::new_v4();
        factory.open(id, "ws://coordinator/ws").unwrap();

        assert!(wire.notify(id, TransportEvent::Ready));
        assert!(wire.push_text(id, "{}"));

        assert_eq!(rx.recv().await, Some(TransportNotice::new(id, TransportEvent::Ready)));
        assert_eq!(
            rx.recv().await,
            Some(TransportNotice::new(id, TransportEvent::Frame(b"{}".to_vec())))
        );
    }

    #[tokio::test]
    async fn test_close_confirms_once() {
        let (tx, mut rx) = notice_channel();
        let (mut factory, wire) = MemoryTransportFactory::with_notices(tx);
        let id = Uuid::new_v4();
        let mut transport = factory.open(id, "ws://coordinator/ws").unwrap();

        transport.close();
        transport.close();

        assert!(wire.close_requested(id));
        assert_eq!(rx.recv().await, Some(TransportNotice::new(id, TransportEvent::Closed)));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_notify_without_channel() {
        let (_factory, wire) = MemoryTransportFactory::new();
        assert!(!wire.notify(Uuid::new_v4(), TransportEvent::Ready));
    }
}
