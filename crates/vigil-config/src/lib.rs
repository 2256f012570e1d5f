//! Per-guild configuration snapshots.
//!
//! One JSON file per guild, written whole-then-renamed so a crash can
//! never leave a half-written snapshot behind. Missing or corrupt
//! snapshots are reported as outcomes, not errors; callers seed
//! defaults and move on.

mod guild_config;
mod store;

pub use guild_config::{GuildConfig, DEFAULT_LANGUAGE_CODE, DEFAULT_PREFIX};
pub use store::{GuildConfigLoadOutcome, GuildConfigStore};
