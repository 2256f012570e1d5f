//! Guild sessions and their manager.
//!
//! One [`GuildSession`] per chat community owns that community's
//! configuration, admin allow-list, talk channel, and watched rooms,
//! and binds the command surface to them. The [`SessionManager`] is
//! the single entry point the gateway calls; it routes every event to
//! the owning session so two communities never share state.

mod gateway;
mod manager;
mod mention;
mod session;
mod session_commands;
mod stats;

pub use gateway::{ChatGateway, GuildProfile, InboundMessage, JokeApi};
pub use manager::SessionManager;
pub use mention::{parse_channel_mention, parse_user_mention};
pub use session::{AnnounceToggle, GuildSession, SessionDeps, UnsetAdminOutcome};
pub use stats::{ProcessStats, StatsSnapshot};
