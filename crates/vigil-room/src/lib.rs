//! Room watch supervision: one-shot room queries with a hard deadline
//! and persistent per-room watch tasks that survive reconnect churn.
//!
//! The supervisor owns at most one live connection per room, re-derives
//! room info over a fresh connection on every change event, and hides
//! transient transport failure from listeners. Only an exhausted
//! reconnect budget ends a watch, and then the listener hears about it
//! exactly once.

mod connector;
mod error;
mod supervisor;

pub use connector::{canonical_media_url, RoomConnection, RoomConnector, RoomInfo, RoomMedia};
pub use error::RoomWatchError;
pub use supervisor::{
    RoomChangeListener, RoomWatchSupervisor, RoomWatchSupervisorConfig, DEFAULT_INFO_TIMEOUT,
};

#[cfg(test)]
mod tests;
