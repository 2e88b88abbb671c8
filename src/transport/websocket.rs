//! WebSocket transport backed by tokio-tungstenite.
//!
//! Each opened connection spawns one task that performs the handshake and then
//! multiplexes outbound frames and inbound messages with `tokio::select!`.
//! Lifecycle changes are reported as `TransportNotice`s.

use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::handshake::client::Request;
use tokio_tungstenite::tungstenite::Message as WsMessage;

use super::{
    ConnectionId, NoticeSender, Transport, TransportError, TransportEvent, TransportFactory,
    TransportNotice,
};

enum Outbound {
    Text(String),
    Close,
}

/// Opens WebSocket connections that report on a notice channel
pub struct WebSocketTransportFactory {
    notices: NoticeSender,
}

impl WebSocketTransportFactory {
    pub fn new(notices: NoticeSender) -> Self {
        Self { notices }
    }
}

impl TransportFactory for WebSocketTransportFactory {
    fn open(
        &mut self,
        connection_id: ConnectionId,
        url: &str,
    ) -> Result<Box<dyn Transport>, TransportError> {
        let request = url
            .into_client_request()
            .map_err(|e| TransportError::InvalidUrl(format!("{}: {}", url, e)))?;

        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(run_connection(
            connection_id,
            request,
            rx,
            self.notices.clone(),
        ));

        tracing::debug!(connection_id = %connection_id, url = %url, "WebSocket connection task spawned");

        Ok(Box::new(WebSocketTransport {
            outbound: tx,
            closed: false,
        }))
    }
}

struct WebSocketTransport {
    outbound: mpsc::UnboundedSender<Outbound>,
    closed: bool,
}

impl Transport for WebSocketTransport {
    fn send_text(&mut self, frame: String) -> Result<(), TransportError> {
        if self.closed {
            return Err(TransportError::ChannelClosed);
        }
        self.outbound
            .send(Outbound::Text(frame))
            .map_err(|_| TransportError::ChannelClosed)
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            let _ = self.outbound.send(Outbound::Close);
        }
    }
}

/// Connection task: handshake, then pump frames until either side closes
async fn run_connection(
    connection_id: ConnectionId,
    request: Request,
    mut outbound: mpsc::UnboundedReceiver<Outbound>,
    notices: NoticeSender,
) {
    let notify = |event: TransportEvent| {
        let _ = notices.send(TransportNotice::new(connection_id, event));
    };

    // A close requested mid-handshake must not wait on a stalled server
    let handshake = tokio_tungstenite::connect_async(request);
    tokio::pin!(handshake);
    let stream = loop {
        tokio::select! {
            result = &mut handshake => match result {
                Ok((stream, _response)) => break stream,
                Err(e) => {
                    tracing::warn!(connection_id = %connection_id, error = %e, "WebSocket handshake failed");
                    notify(TransportEvent::Error(e.to_string()));
                    notify(TransportEvent::Closed);
                    return;
                }
            },
            command = outbound.recv() => match command {
                Some(Outbound::Text(_)) => {
                    tracing::debug!(connection_id = %connection_id, "Dropping frame written before handshake completed");
                }
                Some(Outbound::Close) | None => {
                    tracing::debug!(connection_id = %connection_id, "Close requested during handshake");
                    notify(TransportEvent::Closed);
                    return;
                }
            },
        }
    };

    notify(TransportEvent::Ready);
    let (mut ws_sender, mut ws_receiver) = stream.split();

    loop {
        tokio::select! {
            command = outbound.recv() => {
                match command {
                    Some(Outbound::Text(frame)) => {
                        if let Err(e) = ws_sender.send(WsMessage::Text(frame.into())).await {
                            notify(TransportEvent::Error(e.to_string()));
                            break;
                        }
                    }
                    // Close requested, or the handle was dropped
                    Some(Outbound::Close) | None => {
                        let _ = ws_sender.close().await;
                        break;
                    }
                }
            }
            incoming = ws_receiver.next() => {
                match incoming {
                    Some(Ok(WsMessage::Text(text))) => {
                        notify(TransportEvent::Frame(text.as_str().as_bytes().to_vec()));
                    }
                    Some(Ok(WsMessage::Binary(bytes))) => {
                        notify(TransportEvent::Frame(bytes.to_vec()));
                    }
                    Some(Ok(WsMessage::Close(frame))) => {
                        tracing::debug!(connection_id = %connection_id, close_frame = ?frame, "Remote closed WebSocket");
                        break;
                    }
                    Some(Ok(_)) => {
                        // Ping/pong are answered by tungstenite
                    }
                    Some(Err(e)) => {
                        notify(TransportEvent::Error(e.to_string()));
                        break;
                    }
                    None => break,
                }
            }
        }
    }

    notify(TransportEvent::Closed);
    tracing::debug!(connection_id = %connection_id, "WebSocket connection task finished");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::notice_channel;
    use std::time::Duration;
    use tokio::net::TcpListener;
    use tokio::time::timeout;
    use uuid::Uuid;

    /// Url of a loopback port with nothing listening on it
    async fn closed_port_url() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        format!("ws://{}/ws", addr)
    }

    #[tokio::test]
    async fn test_rejects_invalid_url() {
        let (tx, _rx) = notice_channel();
        let mut factory = WebSocketTransportFactory::new(tx);

        let result = factory.open(Uuid::new_v4(), "not a url");
        assert!(matches!(result, Err(TransportError::InvalidUrl(_))));
    }

    #[tokio::test]
    async fn test_unreachable_host_reports_error_then_closed() {
        let (tx, mut rx) = notice_channel();
        let mut factory = WebSocketTransportFactory::new(tx);
        let id = Uuid::new_v4();

        let _transport = factory.open(id, &closed_port_url().await).unwrap();

        let first = timeout(Duration::from_secs(5), rx.recv()).await.unwrap().unwrap();
        assert_eq!(first.connection_id, id);
        assert!(matches!(first.event, TransportEvent::Error(_)));

        let second = timeout(Duration::from_secs(5), rx.recv()).await.unwrap().unwrap();
        assert_eq!(second.event, TransportEvent::Closed);
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let (tx, _rx) = notice_channel();
        let mut factory = WebSocketTransportFactory::new(tx);
        let mut transport = factory
            .open(Uuid::new_v4(), &closed_port_url().await)
            .unwrap();

        transport.close();
        transport.close();
        assert_eq!(
            transport.send_text("late".to_string()),
            Err(TransportError::ChannelClosed)
        );
    }

    #[tokio::test]
    async fn test_close_during_stalled_handshake() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        // Accept TCP but never answer the upgrade request
        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(30)).await;
            drop(stream);
        });

        let (tx, mut rx) = notice_channel();
        let mut factory = WebSocketTransportFactory::new(tx);
        let id = Uuid::new_v4();
        let mut transport = factory.open(id, &format!("ws://{}/ws", addr)).unwrap();

        tokio::time::sleep(Duration::from_millis(200)).await;
        transport.close();

        let notice = timeout(Duration::from_secs(2), rx.recv()).await.unwrap().unwrap();
        assert_eq!(notice, TransportNotice::new(id, TransportEvent::Closed));
        server.abort();
    }
}
