use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use url::Url;

use super::ClientError;
use crate::objects::{ChangeEvent, LivenessStatus};

/// An open change stream.
///
/// The server only answers client frames with liveness acknowledgements;
/// [`WatchStream::next_event`] skips those and yields change events.
pub struct WatchStream {
    socket: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl WatchStream {
    pub(super) async fn connect(url: Url) -> Result<Self, ClientError> {
        let (socket, _) = connect_async(url.as_str()).await?;
        Ok(Self { socket })
    }

    /// Wait for the next change event. Returns `Ok(None)` once the server
    /// closes the stream.
    pub async fn next_event(&mut self) -> Result<Option<ChangeEvent>, ClientError> {
        while let Some(frame) = self.socket.next().await {
            match frame? {
                WsMessage::Text(text) => {
                    if serde_json::from_str::<LivenessStatus>(&text).is_ok() {
                        continue;
                    }
                    return Ok(Some(serde_json::from_str(&text)?));
                }
                WsMessage::Close(_) => return Ok(None),
                _ => continue,
            }
        }
        Ok(None)
    }

    /// Send a keep-alive frame. The server replies with a liveness
    /// acknowledgement, which [`WatchStream::next_event`] discards.
    pub async fn ping(&mut self) -> Result<(), ClientError> {
        self.socket.send(WsMessage::Text("ping".to_string())).await?;
        Ok(())
    }

    pub async fn close(mut self) -> Result<(), ClientError> {
        self.socket.close(None).await?;
        Ok(())
    }
}
