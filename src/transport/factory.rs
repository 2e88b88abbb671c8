//! Transport factory selection

use crate::config::{SessionConfig, TransportKind};

use super::memory::{MemoryTransportFactory, MemoryWire};
use super::websocket::WebSocketTransportFactory;
use super::{NoticeSender, TransportFactory};

/// Create a transport factory based on configuration.
///
/// Returns the appropriate implementation based on the `transport` setting:
/// - `websocket` (default): Returns a `WebSocketTransportFactory`
/// - `memory`: Returns a `MemoryTransportFactory` together with its `MemoryWire`
///
/// Both report lifecycle events on `notices`.
///
/// # Example
///
/// ```rust,ignore
/// let (notices_tx, notices_rx) = notice_channel();
/// let (factory, _wire) = create_transport_factory(&settings.session, notices_tx);
/// ```
pub fn create_transport_factory(
    settings: &SessionConfig,
    notices: NoticeSender,
) -> (Box<dyn TransportFactory>, Option<MemoryWire>) {
    match settings.transport {
        TransportKind::Memory => {
            tracing::info!(transport = "memory", "Creating in-memory transport factory");
            let (factory, wire) = MemoryTransportFactory::with_notices(notices);
            (Box::new(factory), Some(wire))
        }
        TransportKind::Websocket => {
            tracing::info!(
                transport = "websocket",
                url = %settings.ws_url,
                "Creating WebSocket transport factory"
            );
            (Box::new(WebSocketTransportFactory::new(notices)), None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{notice_channel, TransportEvent};
    use uuid::Uuid;

    #[test]
    fn test_memory_transport_comes_with_wire() {
        let settings = SessionConfig {
            transport: TransportKind::Memory,
            ..Default::default()
        };
        let (tx, mut rx) = notice_channel();

        let (mut factory, wire) = create_transport_factory(&settings, tx);
        let wire = wire.expect("memory transport exposes its wire");

        let id = Uuid::new_v4();
        factory.open(id, &settings.ws_url).unwrap();
        assert!(wire.notify(id, TransportEvent::Ready));
        assert_eq!(rx.try_recv().unwrap().event, TransportEvent::Ready);
    }

    #[tokio::test]
    async fn test_websocket_transport_has_no_wire() {
        let (tx, _rx) = notice_channel();
        let (_factory, wire) = create_transport_factory(&SessionConfig::default(), tx);
        assert!(wire.is_none());
    }
}
