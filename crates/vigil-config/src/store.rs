use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use vigil_core::write_text_atomic;

use crate::guild_config::{GuildConfig, GUILD_CONFIG_SCHEMA_VERSION};

/// Result of loading a guild snapshot. Missing and corrupt snapshots
/// are ordinary outcomes; the caller substitutes seeded defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuildConfigLoadOutcome {
    Loaded(GuildConfig),
    Missing,
    Corrupt { detail: String },
}

/// Stores one JSON snapshot per guild, named by guild id.
#[derive(Debug, Clone)]
pub struct GuildConfigStore {
    root_dir: PathBuf,
}

impl GuildConfigStore {
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
        }
    }

    pub fn snapshot_path(&self, guild_id: &str) -> PathBuf {
        self.root_dir.join(format!("{guild_id}.json"))
    }

    /// Loads the snapshot for `guild_id`. Corruption is logged and
    /// reported as an outcome, never an error.
    pub fn load(&self, guild_id: &str) -> GuildConfigLoadOutcome {
        let path = self.snapshot_path(guild_id);
        if !path.exists() {
            return GuildConfigLoadOutcome::Missing;
        }
        let raw = match std::fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(error) => {
                let detail = format!("failed to read {}: {error}", path.display());
                tracing::warn!(guild_id, %detail, "guild snapshot unreadable");
                return GuildConfigLoadOutcome::Corrupt { detail };
            }
        };
        match serde_json::from_str::<GuildConfig>(&raw) {
            Ok(config) if config.schema_version > GUILD_CONFIG_SCHEMA_VERSION => {
                let detail = format!(
                    "unsupported guild snapshot schema version {} in {} (supported up to {})",
                    config.schema_version,
                    path.display(),
                    GUILD_CONFIG_SCHEMA_VERSION
                );
                tracing::warn!(guild_id, %detail, "guild snapshot rejected");
                GuildConfigLoadOutcome::Corrupt { detail }
            }
            Ok(config) => GuildConfigLoadOutcome::Loaded(config),
            Err(error) => {
                let detail = format!("failed to parse {}: {error}", path.display());
                tracing::warn!(guild_id, %detail, "guild snapshot corrupt");
                GuildConfigLoadOutcome::Corrupt { detail }
            }
        }
    }

    /// Persists the full snapshot atomically. Writes for a single guild
    /// are serialized by that guild's session mutation point, so no
    /// cross-guild locking happens here.
    pub fn save(&self, config: &GuildConfig) -> Result<()> {
        let path = self.snapshot_path(&config.guild_id);
        let encoded = serde_json::to_string_pretty(config)
            .context("failed to encode guild snapshot")?;
        write_text_atomic(&path, &encoded)
            .with_context(|| format!("failed to persist guild snapshot {}", path.display()))
    }

    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }
}
