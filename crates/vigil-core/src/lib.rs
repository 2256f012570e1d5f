//! Foundational low-level helpers shared across vigil crates.
//!
//! Provides the atomic snapshot-write primitive used by config
//! persistence plus unix-time helpers for reconnect bookkeeping and
//! stats timestamps.

pub mod atomic_io;
pub mod time_utils;

pub use atomic_io::write_text_atomic;
pub use time_utils::{current_unix_timestamp, current_unix_timestamp_ms};
