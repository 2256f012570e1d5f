use std::collections::BTreeSet;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

/// Enumerates the fixed command surface. The lexicon localizes the
/// verbs; this set never changes at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandKind {
    Help,
    Info,
    Booyah,
    Chuck,
    Cytube,
    Announce,
    Admin,
    Prefix,
    Channel,
}

impl CommandKind {
    pub const ALL: [CommandKind; 9] = [
        CommandKind::Help,
        CommandKind::Info,
        CommandKind::Booyah,
        CommandKind::Chuck,
        CommandKind::Cytube,
        CommandKind::Announce,
        CommandKind::Admin,
        CommandKind::Prefix,
        CommandKind::Channel,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Help => "help",
            Self::Info => "info",
            Self::Booyah => "booyah",
            Self::Chuck => "chuck",
            Self::Cytube => "cytube",
            Self::Announce => "announce",
            Self::Admin => "admin",
            Self::Prefix => "prefix",
            Self::Channel => "channel",
        }
    }

    /// Commands that only guild admins may invoke.
    pub fn is_admin_gated(self) -> bool {
        matches!(
            self,
            Self::Announce | Self::Admin | Self::Prefix | Self::Channel
        )
    }
}

/// Localized verb plus the one-line description shown in help output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandEntry {
    pub verb: String,
    pub description: String,
}

/// Localized verbs for every command in the surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandLexicon {
    pub help: CommandEntry,
    pub info: CommandEntry,
    pub booyah: CommandEntry,
    pub chuck: CommandEntry,
    pub cytube: CommandEntry,
    pub announce: CommandEntry,
    pub admin: CommandEntry,
    pub prefix: CommandEntry,
    pub channel: CommandEntry,
}

impl CommandLexicon {
    pub fn entry(&self, kind: CommandKind) -> &CommandEntry {
        match kind {
            CommandKind::Help => &self.help,
            CommandKind::Info => &self.info,
            CommandKind::Booyah => &self.booyah,
            CommandKind::Chuck => &self.chuck,
            CommandKind::Cytube => &self.cytube,
            CommandKind::Announce => &self.announce,
            CommandKind::Admin => &self.admin,
            CommandKind::Prefix => &self.prefix,
            CommandKind::Channel => &self.channel,
        }
    }

    pub fn entries(&self) -> impl Iterator<Item = (CommandKind, &CommandEntry)> {
        CommandKind::ALL.iter().map(|kind| (*kind, self.entry(*kind)))
    }
}

/// User-facing and operator-facing message templates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageCatalog {
    pub boot: String,
    pub ready: String,
    pub guild_joined: String,
    pub help_response: String,
    pub info_response: String,
    pub booyah_response: String,
    pub joke_unavailable: String,
    pub room_info_response: String,
    pub room_info_url_line: String,
    pub announce_subscribed: String,
    pub announce_unsubscribed: String,
    pub announce_media_changed: String,
    pub watch_closed: String,
    pub admin_granted: String,
    pub admin_revoked: String,
    pub admin_owner_protected: String,
    pub prefix_updated: String,
    pub talk_channel_updated: String,
    pub command_denied: String,
    pub usage: String,
    pub invalid_mention: String,
    pub invalid_channel: String,
    pub try_again: String,
}

/// One fully typed language pack. Immutable after validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguagePack {
    pub commands: CommandLexicon,
    pub messages: MessageCatalog,
}

impl LanguagePack {
    /// Rejects empty or whitespace verbs and duplicate verbs inside
    /// one pack. Cross-pack alias collisions are the command table's
    /// concern.
    pub fn validate(&self, code: &str) -> Result<()> {
        let mut seen = BTreeSet::new();
        for (kind, entry) in self.commands.entries() {
            let verb = entry.verb.trim();
            if verb.is_empty() {
                bail!(
                    "language pack '{code}' has an empty verb for command '{}'",
                    kind.as_str()
                );
            }
            if verb.chars().any(char::is_whitespace) {
                bail!(
                    "language pack '{code}' verb '{verb}' for command '{}' contains whitespace",
                    kind.as_str()
                );
            }
            if !seen.insert(verb.to_string()) {
                bail!("language pack '{code}' declares verb '{verb}' twice");
            }
        }
        Ok(())
    }

    /// The built-in default pack. Always installed so the process can
    /// boot without any pack files on disk.
    pub fn builtin_default() -> Self {
        Self {
            commands: CommandLexicon {
                help: CommandEntry {
                    verb: "help".to_string(),
                    description: "list every command with its description".to_string(),
                },
                info: CommandEntry {
                    verb: "info".to_string(),
                    description: "show bot version and totals".to_string(),
                },
                booyah: CommandEntry {
                    verb: "booyah".to_string(),
                    description: "booyah!".to_string(),
                },
                chuck: CommandEntry {
                    verb: "chuck".to_string(),
                    description: "fetch a random joke".to_string(),
                },
                cytube: CommandEntry {
                    verb: "cytube".to_string(),
                    description: "show what a room is currently playing".to_string(),
                },
                announce: CommandEntry {
                    verb: "announce".to_string(),
                    description: "toggle media-change announcements for a room".to_string(),
                },
                admin: CommandEntry {
                    verb: "admin".to_string(),
                    description: "toggle admin status for a mentioned user".to_string(),
                },
                prefix: CommandEntry {
                    verb: "prefix".to_string(),
                    description: "change the command prefix".to_string(),
                },
                channel: CommandEntry {
                    verb: "channel".to_string(),
                    description: "set the announce channel".to_string(),
                },
            },
            messages: MessageCatalog {
                boot: "vigil starting".to_string(),
                ready: "vigil ready".to_string(),
                guild_joined: "joined guild {guild_id} ({guild_name})".to_string(),
                help_response: "Commands (prefix `{prefix}`):\n{listing}".to_string(),
                info_response:
                    "vigil {version} — {guilds} guilds, {users} users, {rooms} watched rooms"
                        .to_string(),
                booyah_response: "BOOYAH!".to_string(),
                joke_unavailable: "the joke service is not answering, try again later".to_string(),
                room_info_response: "{room} is playing: {title} ({user_count} watching)"
                    .to_string(),
                room_info_url_line: "watch along: {url}".to_string(),
                announce_subscribed: "now announcing media changes for {room}".to_string(),
                announce_unsubscribed: "stopped announcing media changes for {room}".to_string(),
                announce_media_changed: "{room} now playing: {title}".to_string(),
                watch_closed: "lost the connection to {room} for good ({reason}); \
                               announcements for it are off"
                    .to_string(),
                admin_granted: "<@{user_id}> is now an admin".to_string(),
                admin_revoked: "<@{user_id}> is no longer an admin".to_string(),
                admin_owner_protected: "the guild owner cannot be demoted".to_string(),
                prefix_updated: "prefix changed to `{prefix}`".to_string(),
                talk_channel_updated: "announcements now go to <#{channel_id}>".to_string(),
                command_denied: "only admins may use `{command}`".to_string(),
                usage: "usage: `{prefix}{verb} {argument}`".to_string(),
                invalid_mention: "that does not look like a user in this guild".to_string(),
                invalid_channel: "that does not look like a channel in this guild".to_string(),
                try_again: "the room service did not answer in time, try again".to_string(),
            },
        }
    }
}
