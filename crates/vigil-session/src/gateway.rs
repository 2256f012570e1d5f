use anyhow::Result;
use async_trait::async_trait;

/// One inbound chat message. `guild_id` is absent for direct messages,
/// which are never command candidates.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub guild_id: Option<String>,
    pub channel_id: String,
    pub author_id: String,
    pub content: String,
}

/// What the platform knows about a community at join time.
#[derive(Debug, Clone)]
pub struct GuildProfile {
    pub guild_id: String,
    pub name: String,
    pub owner_id: String,
    pub system_channel: Option<String>,
    pub member_count: usize,
}

/// Outbound half of the chat platform, injected so sessions never
/// touch a concrete client.
#[async_trait]
pub trait ChatGateway: Send + Sync {
    async fn send_message(&self, channel_id: &str, text: &str) -> Result<()>;

    async fn trigger_typing(&self, channel_id: &str) -> Result<()>;

    async fn set_presence(&self, status: &str) -> Result<()>;

    async fn channel_exists(&self, guild_id: &str, channel_id: &str) -> Result<bool>;

    async fn member_exists(&self, guild_id: &str, user_id: &str) -> Result<bool>;
}

/// Third-party joke backend behind the `chuck` command.
#[async_trait]
pub trait JokeApi: Send + Sync {
    async fn random_joke(&self) -> Result<String>;
}
