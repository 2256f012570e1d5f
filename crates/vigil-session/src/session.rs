use std::sync::{Arc, Weak};

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::Mutex;
use vigil_config::{GuildConfig, GuildConfigLoadOutcome, GuildConfigStore};
use vigil_lang::{render_template, LanguagePack, LanguageRegistry};
use vigil_room::{RoomChangeListener, RoomInfo, RoomWatchError, RoomWatchSupervisor};

use crate::gateway::{ChatGateway, GuildProfile, InboundMessage, JokeApi};
use crate::mention::{parse_channel_mention, parse_user_mention};
use crate::stats::ProcessStats;

/// Shared collaborators every session is constructed with.
#[derive(Clone)]
pub struct SessionDeps {
    pub gateway: Arc<dyn ChatGateway>,
    pub rooms: Arc<RoomWatchSupervisor>,
    pub jokes: Arc<dyn JokeApi>,
    pub store: Arc<GuildConfigStore>,
    pub languages: Arc<LanguageRegistry>,
    pub stats: Arc<ProcessStats>,
    pub bot_version: String,
}

/// Outcome of an admin demotion attempt. Owner protection is its own
/// variant so callers can word it differently from "not an admin".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnsetAdminOutcome {
    Revoked,
    OwnerProtected,
    NotAdmin,
}

/// Which way an `announce` invocation flipped the watch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnounceToggle {
    Subscribed,
    Unsubscribed,
}

/// One session per bound community. All config mutation, whether from
/// a command action or a room-watch callback, serializes through the
/// session's config mutex.
pub struct GuildSession {
    weak_self: Weak<GuildSession>,
    profile: GuildProfile,
    deps: SessionDeps,
    config: Mutex<GuildConfig>,
}

impl GuildSession {
    /// Loads the persisted snapshot (seeding defaults when missing or
    /// corrupt) and re-establishes every persisted room watch before
    /// the session accepts commands.
    pub async fn bootstrap(deps: SessionDeps, profile: GuildProfile) -> Arc<Self> {
        let config = match deps.store.load(&profile.guild_id) {
            GuildConfigLoadOutcome::Loaded(config) => config,
            GuildConfigLoadOutcome::Missing => GuildConfig::seeded(
                profile.guild_id.clone(),
                profile.owner_id.clone(),
                profile.system_channel.clone(),
            ),
            GuildConfigLoadOutcome::Corrupt { detail } => {
                tracing::warn!(
                    guild_id = profile.guild_id.as_str(),
                    detail = detail.as_str(),
                    "seeding defaults over corrupt guild snapshot"
                );
                GuildConfig::seeded(
                    profile.guild_id.clone(),
                    profile.owner_id.clone(),
                    profile.system_channel.clone(),
                )
            }
        };

        let session = Arc::new_cyclic(|weak| Self {
            weak_self: weak.clone(),
            profile,
            deps,
            config: Mutex::new(config),
        });
        session.resubscribe_persisted_watches().await;
        session
    }

    fn self_arc(&self) -> Arc<Self> {
        self.weak_self
            .upgrade()
            .expect("session outlives its own method calls")
    }

    pub fn guild_id(&self) -> &str {
        &self.profile.guild_id
    }

    pub fn profile(&self) -> &GuildProfile {
        &self.profile
    }

    /// The sole gate before command parsing: the message must originate
    /// in this session's community and start with its prefix. Direct
    /// messages carry no guild id and are never candidates.
    pub async fn is_command_candidate(&self, message: &InboundMessage) -> bool {
        if message.guild_id.as_deref() != Some(self.profile.guild_id.as_str()) {
            return false;
        }
        let config = self.config.lock().await;
        message.content.starts_with(&config.prefix)
    }

    /// Builds the router line `<languageCode> <rest>` for a candidate
    /// message.
    pub async fn command_line(&self, message: &InboundMessage) -> String {
        let config = self.config.lock().await;
        let rest = message
            .content
            .strip_prefix(&config.prefix)
            .unwrap_or(&message.content)
            .trim();
        format!("{} {rest}", config.language)
    }

    pub async fn is_admin(&self, user_id: &str) -> bool {
        self.config.lock().await.admins.contains(user_id.trim())
    }

    pub async fn language(&self) -> String {
        self.config.lock().await.language.clone()
    }

    pub async fn prefix(&self) -> String {
        self.config.lock().await.prefix.clone()
    }

    pub async fn talk_channel(&self) -> Option<String> {
        self.config.lock().await.talk_channel.clone()
    }

    pub async fn watched_rooms(&self) -> Vec<String> {
        self.config
            .lock()
            .await
            .watched_rooms
            .iter()
            .cloned()
            .collect()
    }

    pub(crate) fn resolve_pack(&self, language: &str) -> &LanguagePack {
        self.deps.languages.resolve(language)
    }

    pub(crate) fn deps(&self) -> &SessionDeps {
        &self.deps
    }

    /// Changes the prefix and persists. An empty prefix would make
    /// every message a candidate, so it is refused.
    pub async fn set_prefix(&self, prefix: &str) -> Result<bool> {
        let prefix = prefix.trim();
        if prefix.is_empty() {
            return Ok(false);
        }
        let mut config = self.config.lock().await;
        config.prefix = prefix.to_string();
        self.persist(&config);
        Ok(true)
    }

    /// Points announcements at `channel_id` after confirming the
    /// channel exists in the bound community.
    pub async fn set_talk_channel(&self, channel_id: &str) -> Result<bool> {
        let exists = self
            .deps
            .gateway
            .channel_exists(&self.profile.guild_id, channel_id)
            .await?;
        if !exists {
            return Ok(false);
        }
        let mut config = self.config.lock().await;
        config.talk_channel = Some(channel_id.to_string());
        self.persist(&config);
        Ok(true)
    }

    pub async fn set_admin(&self, user_id: &str) -> Result<bool> {
        let mut config = self.config.lock().await;
        let inserted = config.admins.insert(user_id.trim().to_string());
        if inserted {
            self.persist(&config);
        }
        Ok(inserted)
    }

    /// Demotes an admin. The community owner is protected regardless
    /// of whether their id was ever explicitly added.
    pub async fn unset_admin(&self, user_id: &str) -> Result<UnsetAdminOutcome> {
        let user_id = user_id.trim();
        if user_id == self.profile.owner_id {
            return Ok(UnsetAdminOutcome::OwnerProtected);
        }
        let mut config = self.config.lock().await;
        if config.admins.remove(user_id) {
            self.persist(&config);
            Ok(UnsetAdminOutcome::Revoked)
        } else {
            Ok(UnsetAdminOutcome::NotAdmin)
        }
    }

    /// Resolves a user mention token against the bound community.
    pub async fn validate_mention(&self, text: &str) -> Result<Option<String>> {
        let Some(user_id) = parse_user_mention(text) else {
            return Ok(None);
        };
        let exists = self
            .deps
            .gateway
            .member_exists(&self.profile.guild_id, user_id)
            .await?;
        Ok(exists.then(|| user_id.to_string()))
    }

    /// Resolves a channel mention token against the bound community.
    pub async fn validate_channel(&self, text: &str) -> Result<Option<String>> {
        let Some(channel_id) = parse_channel_mention(text) else {
            return Ok(None);
        };
        let exists = self
            .deps
            .gateway
            .channel_exists(&self.profile.guild_id, channel_id)
            .await?;
        Ok(exists.then(|| channel_id.to_string()))
    }

    /// Starts a watch and persists the room into `watched_rooms`.
    pub async fn watch_room(&self, room: &str) -> Result<(), RoomWatchError> {
        let listener: Arc<dyn RoomChangeListener> = Arc::new(AnnounceListener {
            session: self.self_arc(),
        });
        self.deps.rooms.watch(room, listener).await?;
        let mut config = self.config.lock().await;
        if config.watched_rooms.insert(room.to_string()) {
            self.persist(&config);
        }
        Ok(())
    }

    /// Stops a watch and drops the room from `watched_rooms`. Safe on
    /// a room that was never watched.
    pub async fn unwatch_room(&self, room: &str) {
        self.deps.rooms.unwatch(room).await;
        let mut config = self.config.lock().await;
        if config.watched_rooms.remove(room) {
            self.persist(&config);
        }
    }

    /// The `announce` toggle: subscribe when the room is new,
    /// unsubscribe when it is already watched.
    pub async fn toggle_announce(&self, room: &str) -> Result<AnnounceToggle, RoomWatchError> {
        let already_watched = self.config.lock().await.watched_rooms.contains(room);
        if already_watched {
            self.unwatch_room(room).await;
            Ok(AnnounceToggle::Unsubscribed)
        } else {
            self.watch_room(room).await?;
            Ok(AnnounceToggle::Subscribed)
        }
    }

    async fn resubscribe_persisted_watches(self: &Arc<Self>) {
        let rooms = self.watched_rooms().await;
        for room in rooms {
            let listener: Arc<dyn RoomChangeListener> = Arc::new(AnnounceListener {
                session: Arc::clone(self),
            });
            if let Err(error) = self.deps.rooms.watch(&room, listener).await {
                // The room stays persisted; the next restart (or a
                // manual announce toggle) will retry it.
                tracing::warn!(
                    guild_id = self.profile.guild_id.as_str(),
                    room = room.as_str(),
                    %error,
                    "failed to resubscribe persisted room watch"
                );
            }
        }
    }

    /// Persist failures are logged, never surfaced: losing one
    /// snapshot write must not take a session down.
    fn persist(&self, config: &GuildConfig) {
        if let Err(error) = self.deps.store.save(config) {
            tracing::error!(
                guild_id = self.profile.guild_id.as_str(),
                %error,
                "failed to persist guild snapshot"
            );
        }
    }

    pub(crate) async fn announce_media_change(&self, info: RoomInfo) -> Result<()> {
        let (language, talk_channel) = {
            let config = self.config.lock().await;
            (config.language.clone(), config.talk_channel.clone())
        };
        let Some(talk_channel) = talk_channel else {
            tracing::debug!(
                guild_id = self.profile.guild_id.as_str(),
                room = info.room.as_str(),
                "media change dropped: no talk channel configured"
            );
            return Ok(());
        };
        let pack = self.resolve_pack(&language);
        let mut text = render_template(
            &pack.messages.announce_media_changed,
            &[("room", info.room.as_str()), ("title", info.media_title.as_str())],
        );
        if let Some(url) = info.media_url.as_deref() {
            text.push('\n');
            text.push_str(&render_template(
                &pack.messages.room_info_url_line,
                &[("url", url)],
            ));
        }
        self.deps.gateway.send_message(&talk_channel, &text).await
    }

    pub(crate) async fn handle_watch_closed(&self, room: &str, reason: &str) {
        let (language, talk_channel) = {
            let mut config = self.config.lock().await;
            if config.watched_rooms.remove(room) {
                self.persist(&config);
            }
            (config.language.clone(), config.talk_channel.clone())
        };
        let Some(talk_channel) = talk_channel else {
            return;
        };
        let pack = self.resolve_pack(&language);
        let text = render_template(
            &pack.messages.watch_closed,
            &[("room", room), ("reason", reason)],
        );
        if let Err(error) = self.deps.gateway.send_message(&talk_channel, &text).await {
            tracing::warn!(
                guild_id = self.profile.guild_id.as_str(),
                room,
                %error,
                "failed to deliver watch-closed notice"
            );
        }
    }
}

/// Bridges supervisor callbacks back into the owning session.
struct AnnounceListener {
    session: Arc<GuildSession>,
}

#[async_trait]
impl RoomChangeListener for AnnounceListener {
    async fn media_changed(&self, info: RoomInfo) -> Result<()> {
        self.session.announce_media_change(info).await
    }

    async fn watch_closed(&self, room: &str, reason: &str) {
        self.session.handle_watch_closed(room, reason).await;
    }
}
