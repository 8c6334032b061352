use async_trait::async_trait;
use resinkeep_sdk::objects::{LivenessStatus, WsCloseCode};
use thiserror::Error;

use super::{NotificationBroker, Topic};

/// A frame received from the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    Text(String),
    Binary(Vec<u8>),
    /// Control frames the transport handles on its own.
    Control,
    Close,
}

#[derive(Debug, Error)]
#[error("transport error: {0}")]
pub struct TransportError(pub String);

/// The bidirectional socket a subscriber is attached to.
///
/// `recv` must be cancel safe: it is raced against the event queue.
#[async_trait]
pub trait Transport: Send {
    /// `None` once the peer is gone.
    async fn recv(&mut self) -> Option<Result<Inbound, TransportError>>;

    async fn send_text(&mut self, text: String) -> Result<(), TransportError>;

    async fn close(&mut self, code: u16, reason: &str) -> Result<(), TransportError>;
}

/// Why [`serve_connection`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disconnect {
    /// The client closed the socket.
    PeerClosed,
    /// The broker dropped the queue, either on shutdown or because the
    /// connection fell behind.
    QueueClosed,
    /// Reading from or writing to the socket failed.
    TransportFailed,
}

/// Drive one subscriber connection until either side goes away.
///
/// Events published under `topic` are forwarded as JSON text frames. Every
/// non-empty client frame is answered with `{"status":"healthy"}`. The
/// subscription is removed before returning.
pub async fn serve_connection<T: Transport>(
    broker: &NotificationBroker,
    topic: Topic,
    mut transport: T,
) -> Disconnect {
    let (handle, mut events) = broker.open_connection();
    let connection = handle.id();
    if !broker.subscribe(topic.clone(), &handle) {
        let _ = transport.close(WsCloseCode::GOING_AWAY, "server shutting down").await;
        return Disconnect::QueueClosed;
    }
    // Only the broker may hold a sender, so the queue closes when it forgets us.
    drop(handle);
    tracing::debug!(connection, %topic, "Subscriber connected");

    let outcome = loop {
        tokio::select! {
            inbound = transport.recv() => match inbound {
                Some(Ok(Inbound::Text(text))) if !text.is_empty() => {
                    if send_liveness(&mut transport).await.is_err() {
                        break Disconnect::TransportFailed;
                    }
                }
                Some(Ok(Inbound::Binary(bytes))) if !bytes.is_empty() => {
                    if send_liveness(&mut transport).await.is_err() {
                        break Disconnect::TransportFailed;
                    }
                }
                Some(Ok(Inbound::Close)) | None => break Disconnect::PeerClosed,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::debug!(connection, error = %e, "Subscriber read failed");
                    break Disconnect::TransportFailed;
                }
            },
            event = events.recv() => match event {
                Some(event) => {
                    let frame = match serde_json::to_string(event.as_ref()) {
                        Ok(frame) => frame,
                        Err(e) => {
                            tracing::error!(connection, error = %e, "Failed to encode change event");
                            continue;
                        }
                    };
                    if let Err(e) = transport.send_text(frame).await {
                        tracing::debug!(connection, error = %e, "Subscriber write failed");
                        break Disconnect::TransportFailed;
                    }
                }
                None => {
                    let _ = transport.close(WsCloseCode::GOING_AWAY, "subscription closed").await;
                    break Disconnect::QueueClosed;
                }
            },
        }
    };

    broker.disconnect(connection);
    tracing::debug!(connection, %topic, ?outcome, "Subscriber disconnected");
    outcome
}

async fn send_liveness<T: Transport>(transport: &mut T) -> Result<(), TransportError> {
    let body = serde_json::to_string(&LivenessStatus::healthy())
        .map_err(|e| TransportError(e.to_string()))?;
    transport.send_text(body).await
}
