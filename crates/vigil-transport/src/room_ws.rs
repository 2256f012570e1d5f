use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use vigil_room::{RoomConnection, RoomConnector, RoomMedia, RoomWatchError};

/// Room-service connector over a websocket carrying JSON text frames:
/// `getCurrentMedia`/`currentMedia`, `getUserlist`/`userlist`, and
/// unsolicited `mediaChanged` pushes. One socket per connection
/// object; the supervisor decides when to open a fresh one.
pub struct WsRoomConnector {
    ws_base: String,
}

impl WsRoomConnector {
    /// `ws_base` is the service root, e.g. `wss://rooms.example/r`;
    /// the room name becomes the last path segment.
    pub fn new(ws_base: impl Into<String>) -> Self {
        Self {
            ws_base: ws_base.into(),
        }
    }
}

#[async_trait]
impl RoomConnector for WsRoomConnector {
    async fn connect(&self, room: &str) -> Result<Box<dyn RoomConnection>, RoomWatchError> {
        let url = format!("{}/{room}", self.ws_base.trim_end_matches('/'));
        let (stream, _response) = connect_async(&url)
            .await
            .map_err(|error| RoomWatchError::connect(room, error.to_string()))?;
        Ok(Box::new(WsRoomConnection {
            room: room.to_string(),
            stream,
        }))
    }
}

struct WsRoomConnection {
    room: String,
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl WsRoomConnection {
    async fn send_frame(&mut self, frame: Value) -> Result<()> {
        self.stream
            .send(WsMessage::Text(frame.to_string().into()))
            .await
            .with_context(|| format!("failed to send frame to room '{}'", self.room))
    }

    /// Reads frames until one of type `wanted` arrives. `None` means
    /// the service closed the stream first. Unsolicited frames of
    /// other types are skipped here; watches observe them through
    /// [`RoomConnection::next_media_change`] on their own connection.
    async fn await_frame(&mut self, wanted: &str) -> Result<Option<Value>> {
        while let Some(message) = self.stream.next().await {
            let message = message
                .with_context(|| format!("websocket read from room '{}' failed", self.room))?;
            let WsMessage::Text(raw) = message else {
                continue;
            };
            let Ok(frame) = serde_json::from_str::<Value>(raw.as_str()) else {
                tracing::debug!(room = self.room.as_str(), "skipping malformed room frame");
                continue;
            };
            if frame.get("type").and_then(Value::as_str) == Some(wanted) {
                return Ok(Some(frame));
            }
        }
        Ok(None)
    }
}

#[async_trait]
impl RoomConnection for WsRoomConnection {
    async fn current_media(&mut self) -> Result<RoomMedia> {
        self.send_frame(json!({ "type": "getCurrentMedia" })).await?;
        let Some(frame) = self.await_frame("currentMedia").await? else {
            bail!("room '{}' closed before answering getCurrentMedia", self.room);
        };
        let media = frame
            .get("media")
            .and_then(Value::as_object)
            .with_context(|| format!("room '{}' sent currentMedia without media", self.room))?;
        let field = |name: &str| {
            media
                .get(name)
                .and_then(Value::as_str)
                .map(str::to_string)
                .with_context(|| {
                    format!("room '{}' currentMedia is missing '{name}'", self.room)
                })
        };
        Ok(RoomMedia {
            media_id: field("id")?,
            title: field("title")?,
            media_type: field("type")?,
        })
    }

    async fn user_count(&mut self) -> Result<usize> {
        self.send_frame(json!({ "type": "getUserlist" })).await?;
        let Some(frame) = self.await_frame("userlist").await? else {
            bail!("room '{}' closed before answering getUserlist", self.room);
        };
        let users = frame
            .get("users")
            .and_then(Value::as_array)
            .with_context(|| format!("room '{}' sent userlist without users", self.room))?;
        Ok(users.len())
    }

    async fn next_media_change(&mut self) -> Result<bool> {
        Ok(self.await_frame("mediaChanged").await?.is_some())
    }

    async fn close(&mut self) {
        let _ = self.stream.close(None).await;
    }
}
