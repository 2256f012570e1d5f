use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

pub const DEFAULT_LANGUAGE_CODE: &str = "en-US";
pub const DEFAULT_PREFIX: &str = "!vg";

pub(crate) const GUILD_CONFIG_SCHEMA_VERSION: u32 = 1;

fn guild_config_schema_version() -> u32 {
    GUILD_CONFIG_SCHEMA_VERSION
}

fn default_language() -> String {
    DEFAULT_LANGUAGE_CODE.to_string()
}

fn default_prefix() -> String {
    DEFAULT_PREFIX.to_string()
}

/// Persisted per-guild settings: language, command prefix, admin
/// allow-list, announce target, and the watched-room set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuildConfig {
    #[serde(default = "guild_config_schema_version")]
    pub schema_version: u32,
    pub guild_id: String,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default = "default_prefix")]
    pub prefix: String,
    #[serde(default)]
    pub admins: BTreeSet<String>,
    #[serde(default)]
    pub talk_channel: Option<String>,
    #[serde(default)]
    pub watched_rooms: BTreeSet<String>,
}

impl GuildConfig {
    /// Seeds the defaults for a freshly joined guild: the owner is the
    /// sole admin and announcements target the system channel.
    pub fn seeded(
        guild_id: impl Into<String>,
        owner_id: impl Into<String>,
        system_channel: Option<String>,
    ) -> Self {
        let mut admins = BTreeSet::new();
        admins.insert(owner_id.into());
        Self {
            schema_version: GUILD_CONFIG_SCHEMA_VERSION,
            guild_id: guild_id.into(),
            language: default_language(),
            prefix: default_prefix(),
            admins,
            talk_channel: system_channel,
            watched_rooms: BTreeSet::new(),
        }
    }
}
