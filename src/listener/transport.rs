use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use serde_json::json;
use tokio_tungstenite::tungstenite::Message;

use crate::app::error::{Result, TributaryError};

/// Transport-level push channel, injectable so the listener can be tested
/// without a broker.
#[async_trait]
pub trait PushTransport: Send + Sync {
    /// Open a fresh subscription to `topic`.
    async fn subscribe(&self, topic: &str) -> Result<Box<dyn PushStream>>;
}

/// One live subscription.
#[async_trait]
pub trait PushStream: Send {
    /// Next raw payload; `Ok(None)` when the peer closed the connection.
    async fn next_message(&mut self) -> Result<Option<String>>;
}

/// WebSocket-backed transport. Connects to the broker endpoint and sends a
/// single subscribe frame naming the topic; share events then arrive as
/// text frames.
pub struct WebSocketTransport {
    endpoint: String,
}

impl WebSocketTransport {
    pub fn new(endpoint: String) -> Self {
        Self { endpoint }
    }
}

#[async_trait]
impl PushTransport for WebSocketTransport {
    async fn subscribe(&self, topic: &str) -> Result<Box<dyn PushStream>> {
        let (mut ws, _) = tokio_tungstenite::connect_async(self.endpoint.as_str())
            .await
            .map_err(|e| TributaryError::Transport(e.to_string()))?;

        let frame = json!({ "subscribe": topic }).to_string();
        ws.send(Message::Text(frame))
            .await
            .map_err(|e| TributaryError::Transport(e.to_string()))?;

        Ok(Box::new(WebSocketStream { ws }))
    }
}

struct WebSocketStream {
    ws: tokio_tungstenite::WebSocketStream<
        tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
    >,
}

#[async_trait]
impl PushStream for WebSocketStream {
    async fn next_message(&mut self) -> Result<Option<String>> {
        loop {
            match self.ws.next().await {
                Some(Ok(Message::Text(payload))) => return Ok(Some(payload)),
                Some(Ok(Message::Binary(bytes))) => {
                    let payload = String::from_utf8(bytes)
                        .map_err(|e| TributaryError::Transport(e.to_string()))?;
                    return Ok(Some(payload));
                }
                // Control frames are answered by tungstenite itself.
                Some(Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_))) => continue,
                Some(Ok(Message::Close(_))) | None => return Ok(None),
                Some(Err(e)) => return Err(TributaryError::Transport(e.to_string())),
            }
        }
    }
}
