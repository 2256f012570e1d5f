use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::Mutex;
use vigil_command::{CommandContext, CommandRouter};

use crate::gateway::{GuildProfile, InboundMessage};
use crate::session::{GuildSession, SessionDeps};
use crate::stats::StatsSnapshot;

/// Creates and owns one session per community and routes every gateway
/// event to the right one. This is the only entry point the gateway
/// collaborator calls.
pub struct SessionManager {
    deps: SessionDeps,
    router: Arc<CommandRouter>,
    sessions: Mutex<HashMap<String, Arc<GuildSession>>>,
}

impl SessionManager {
    pub fn new(deps: SessionDeps, router: Arc<CommandRouter>) -> Arc<Self> {
        Arc::new(Self {
            deps,
            router,
            sessions: Mutex::new(HashMap::new()),
        })
    }

    /// Ready-time enumeration. Safe against duplicate ready
    /// deliveries: a community that already has a session keeps it.
    pub async fn handle_ready(&self, guilds: Vec<GuildProfile>) {
        for profile in guilds {
            self.ensure_session(profile).await;
        }
        if let Err(error) = self.deps.gateway.set_presence("online").await {
            tracing::debug!(%error, "failed to set presence");
        }
        tracing::info!(sessions = self.session_count().await, "session manager ready");
    }

    pub async fn handle_guild_join(&self, profile: GuildProfile) -> Arc<GuildSession> {
        tracing::info!(
            guild_id = profile.guild_id.as_str(),
            guild_name = profile.name.as_str(),
            "joined guild"
        );
        self.ensure_session(profile).await
    }

    async fn ensure_session(&self, profile: GuildProfile) -> Arc<GuildSession> {
        if let Some(existing) = self.sessions.lock().await.get(&profile.guild_id) {
            return Arc::clone(existing);
        }
        // Bootstrap (snapshot load + watch resubscription) happens
        // outside the map lock so other sessions keep flowing.
        let session = GuildSession::bootstrap(self.deps.clone(), profile.clone()).await;
        let mut sessions = self.sessions.lock().await;
        match sessions.entry(profile.guild_id.clone()) {
            Entry::Occupied(entry) => Arc::clone(entry.get()),
            Entry::Vacant(entry) => {
                self.deps.stats.record_guild(profile.member_count);
                Arc::clone(entry.insert(session))
            }
        }
    }

    /// Routes one inbound message. Non-candidates (direct messages,
    /// unknown communities, wrong prefix) are dropped silently.
    pub async fn handle_message(&self, message: InboundMessage) -> Result<()> {
        let Some(guild_id) = message.guild_id.clone() else {
            return Ok(());
        };
        let session = {
            let sessions = self.sessions.lock().await;
            sessions.get(&guild_id).cloned()
        };
        let Some(session) = session else {
            return Ok(());
        };
        if !session.is_command_candidate(&message).await {
            return Ok(());
        }

        if let Err(error) = self.deps.gateway.trigger_typing(&message.channel_id).await {
            tracing::debug!(%error, "typing indicator failed");
        }
        let line = session.command_line(&message).await;
        let ctx = CommandContext {
            guild_id,
            channel_id: message.channel_id,
            author_id: message.author_id,
            language: session.language().await,
        };
        self.router.dispatch(&line, &ctx, session.as_ref()).await
    }

    pub async fn session(&self, guild_id: &str) -> Option<Arc<GuildSession>> {
        self.sessions.lock().await.get(guild_id).cloned()
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub async fn stats_snapshot(&self) -> StatsSnapshot {
        let watched_rooms = self.deps.rooms.watched_rooms().await.len();
        self.deps.stats.snapshot(watched_rooms)
    }
}
