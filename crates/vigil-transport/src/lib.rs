//! Reference transport adapters for the trait seams the core crates
//! define: a REST chat-platform gateway, a REST joke client, and a
//! websocket room connector.
//!
//! These are best-effort wire implementations; everything above them
//! is tested against in-memory fakes and never depends on this crate.

mod chat_poll;
mod chat_rest;
mod joke_rest;
mod room_ws;

pub use chat_poll::RestChatEventPoller;
pub use chat_rest::{RestChatGateway, RestChatGatewayConfig};
pub use joke_rest::RestJokeClient;
pub use room_ws::WsRoomConnector;
