use thiserror::Error;

/// Typed failure taxonomy for room operations. Callers match on this
/// to decide between reconnect handling and user-facing replies.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RoomWatchError {
    #[error("failed to connect to room '{room}': {detail}")]
    Connect { room: String, detail: String },

    #[error("room '{room}' did not answer within {timeout_ms} ms")]
    Timeout { room: String, timeout_ms: u64 },

    #[error("query against room '{room}' failed: {detail}")]
    Query { room: String, detail: String },
}

impl RoomWatchError {
    pub fn connect(room: &str, detail: impl Into<String>) -> Self {
        Self::Connect {
            room: room.to_string(),
            detail: detail.into(),
        }
    }

    pub fn query(room: &str, detail: impl Into<String>) -> Self {
        Self::Query {
            room: room.to_string(),
            detail: detail.into(),
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}
