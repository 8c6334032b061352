//! WebSocket subscriptions on the read endpoints.
//!
//! A `GET` carrying an upgrade request on `/{resource}` subscribes to every
//! change of that resource, on `/{resource}/{id}` to changes of one entity.
//! The connection itself is driven by
//! [`serve_connection`](resinkeep_core::broker::serve_connection).

use async_trait::async_trait;
use axum::{
    extract::ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade, rejection::WebSocketUpgradeRejection},
    response::Response,
};
use resinkeep_core::broker::{Inbound, NotificationBroker, Topic, Transport, TransportError, serve_connection};

/// `Ok` when the request asks for a WebSocket, otherwise plain HTTP.
pub(crate) type MaybeUpgrade = Result<WebSocketUpgrade, WebSocketUpgradeRejection>;

/// Finish the upgrade and attach the socket to `topic`.
pub(crate) fn subscribe(upgrade: WebSocketUpgrade, broker: &NotificationBroker, topic: Topic) -> Response {
    let broker = broker.clone();
    upgrade.on_upgrade(move |socket| async move {
        serve_connection(&broker, topic, SocketTransport(socket)).await;
    })
}

struct SocketTransport(WebSocket);

fn transport_error(err: axum::Error) -> TransportError {
    TransportError(err.to_string())
}

#[async_trait]
impl Transport for SocketTransport {
    async fn recv(&mut self) -> Option<Result<Inbound, TransportError>> {
        let message = match self.0.recv().await? {
            Ok(message) => message,
            Err(e) => return Some(Err(transport_error(e))),
        };
        Some(Ok(match message {
            Message::Text(text) => Inbound::Text(text.as_str().to_owned()),
            Message::Binary(bytes) => Inbound::Binary(bytes.to_vec()),
            Message::Ping(_) | Message::Pong(_) => Inbound::Control,
            Message::Close(_) => Inbound::Close,
        }))
    }

    async fn send_text(&mut self, text: String) -> Result<(), TransportError> {
        self.0
            .send(Message::Text(text.into()))
            .await
            .map_err(transport_error)
    }

    async fn close(&mut self, code: u16, reason: &str) -> Result<(), TransportError> {
        self.0
            .send(Message::Close(Some(CloseFrame {
                code,
                reason: reason.to_owned().into(),
            })))
            .await
            .map_err(transport_error)
    }
}
