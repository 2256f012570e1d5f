use anyhow::Result;
use async_trait::async_trait;

use crate::error::RoomWatchError;

/// Media currently scheduled in a room, as reported by the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomMedia {
    pub media_id: String,
    pub title: String,
    pub media_type: String,
}

/// Snapshot of a room: current media plus audience size, with a
/// canonical URL when the media type is recognized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomInfo {
    pub room: String,
    pub media_title: String,
    pub media_type: String,
    pub user_count: usize,
    pub media_url: Option<String>,
}

/// Derives the canonical watch URL for recognized media types. The
/// room service reports `"yt"` for YouTube items; everything else has
/// no stable public URL.
pub fn canonical_media_url(media_type: &str, media_id: &str) -> Option<String> {
    match media_type {
        "yt" => Some(format!("https://www.youtube.com/watch?v={media_id}")),
        _ => None,
    }
}

/// Opens transport connections to named rooms. Each `connect` call
/// yields an independent connection; the supervisor never reuses one
/// across two queries.
#[async_trait]
pub trait RoomConnector: Send + Sync {
    async fn connect(&self, room: &str) -> Result<Box<dyn RoomConnection>, RoomWatchError>;
}

/// One live connection to a room. Implementations must release the
/// underlying transport on drop; `close` is the graceful path.
#[async_trait]
pub trait RoomConnection: Send {
    async fn current_media(&mut self) -> Result<RoomMedia>;

    async fn user_count(&mut self) -> Result<usize>;

    /// Resolves on the next media-change event. `Ok(false)` means the
    /// service closed the stream; an error means the transport broke.
    async fn next_media_change(&mut self) -> Result<bool>;

    async fn close(&mut self);
}
