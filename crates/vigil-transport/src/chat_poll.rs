use std::collections::HashMap;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use reqwest::Client;
use serde_json::Value;
use vigil_session::{GuildProfile, InboundMessage};

use crate::chat_rest::RestChatGatewayConfig;

const POLL_BATCH_LIMIT: usize = 50;

/// Inbound side of the chat platform in polling mode: enumerates
/// joined guilds and drains new channel messages with per-channel
/// last-seen-id bookkeeping. The first cycle only primes those ids so
/// a restart never replays channel history.
pub struct RestChatEventPoller {
    config: RestChatGatewayConfig,
    client: Client,
    self_user_id: Option<String>,
    last_message_ids: HashMap<String, String>,
    primed: bool,
}

impl RestChatEventPoller {
    pub fn new(config: RestChatGatewayConfig) -> Result<Self> {
        if config.api_base.trim().is_empty() {
            bail!("chat api base cannot be empty");
        }
        let client = Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms.max(1)))
            .build()
            .context("failed to build chat polling client")?;
        Ok(Self {
            config,
            client,
            self_user_id: None,
            last_message_ids: HashMap::new(),
            primed: false,
        })
    }

    async fn get_json(&self, path: &str) -> Result<Value> {
        let url = format!("{}/{path}", self.config.api_base.trim_end_matches('/'));
        let response = self
            .client
            .get(&url)
            .header("authorization", format!("Bot {}", self.config.bot_token))
            .send()
            .await
            .with_context(|| format!("chat poll request '{path}' failed"))?;
        let status = response.status();
        if !status.is_success() {
            bail!("chat poll request '{path}' failed with status {status}");
        }
        response
            .json::<Value>()
            .await
            .with_context(|| format!("chat poll response '{path}' was not valid json"))
    }

    async fn resolve_self_user_id(&mut self) -> Result<String> {
        if let Some(user_id) = &self.self_user_id {
            return Ok(user_id.clone());
        }
        let payload = self.get_json("users/@me").await?;
        let user_id = payload
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| anyhow!("users/@me response is missing an id"))?
            .to_string();
        self.self_user_id = Some(user_id.clone());
        Ok(user_id)
    }

    /// Ready-time enumeration: every joined guild with its owner,
    /// system channel, and approximate member count.
    pub async fn list_joined_guilds(&self) -> Result<Vec<GuildProfile>> {
        let listing = self.get_json("users/@me/guilds").await?;
        let entries = listing
            .as_array()
            .ok_or_else(|| anyhow!("users/@me/guilds response must be a JSON array"))?;

        let mut profiles = Vec::with_capacity(entries.len());
        for entry in entries {
            let Some(guild_id) = entry.get("id").and_then(Value::as_str) else {
                continue;
            };
            let detail = self.get_json(&format!("guilds/{guild_id}")).await?;
            let owner_id = detail
                .get("owner_id")
                .and_then(Value::as_str)
                .ok_or_else(|| anyhow!("guild {guild_id} detail is missing owner_id"))?;
            profiles.push(GuildProfile {
                guild_id: guild_id.to_string(),
                name: detail
                    .get("name")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
                owner_id: owner_id.to_string(),
                system_channel: detail
                    .get("system_channel_id")
                    .and_then(Value::as_str)
                    .map(str::to_string),
                member_count: detail
                    .get("approximate_member_count")
                    .and_then(Value::as_u64)
                    .unwrap_or(0) as usize,
            });
        }
        Ok(profiles)
    }

    /// Drains new messages across every text channel of the given
    /// guilds, oldest first, skipping the bot's own and other bots'
    /// messages.
    pub async fn poll_new_messages(
        &mut self,
        guild_ids: &[String],
    ) -> Result<Vec<InboundMessage>> {
        let self_user_id = self.resolve_self_user_id().await?;
        let priming = !self.primed;
        let mut inbound = Vec::new();

        for guild_id in guild_ids {
            let channels = self.get_json(&format!("guilds/{guild_id}/channels")).await?;
            let channels = channels
                .as_array()
                .ok_or_else(|| anyhow!("guild {guild_id} channel listing must be an array"))?
                .clone();
            for channel in channels {
                // Type 0 is a plain text channel.
                if channel.get("type").and_then(Value::as_u64) != Some(0) {
                    continue;
                }
                let Some(channel_id) = channel.get("id").and_then(Value::as_str) else {
                    continue;
                };
                self.drain_channel(guild_id, channel_id, &self_user_id, priming, &mut inbound)
                    .await?;
            }
        }

        self.primed = true;
        Ok(inbound)
    }

    async fn drain_channel(
        &mut self,
        guild_id: &str,
        channel_id: &str,
        self_user_id: &str,
        priming: bool,
        inbound: &mut Vec<InboundMessage>,
    ) -> Result<()> {
        let listing = self
            .get_json(&format!(
                "channels/{channel_id}/messages?limit={POLL_BATCH_LIMIT}"
            ))
            .await?;
        let mut messages = listing
            .as_array()
            .ok_or_else(|| anyhow!("channel {channel_id} messages must be an array"))?
            .clone();
        messages.sort_by(|left, right| {
            let left_id = left.get("id").and_then(Value::as_str).unwrap_or_default();
            let right_id = right.get("id").and_then(Value::as_str).unwrap_or_default();
            compare_message_ids(left_id, right_id)
        });

        let previous = self.last_message_ids.get(channel_id).cloned();
        let mut latest_seen = previous.clone().unwrap_or_default();
        for message in &messages {
            let message_id = message
                .get("id")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .trim()
                .to_string();
            if message_id.is_empty() {
                continue;
            }
            if is_newer_message(&message_id, Some(latest_seen.as_str())) {
                latest_seen = message_id.clone();
            }
            if priming || !is_newer_message(&message_id, previous.as_deref()) {
                continue;
            }
            let Some(author) = message.get("author") else {
                continue;
            };
            let author_id = author.get("id").and_then(Value::as_str).unwrap_or_default();
            if author_id.is_empty() || author_id == self_user_id {
                continue;
            }
            if author.get("bot").and_then(Value::as_bool).unwrap_or(false) {
                continue;
            }
            inbound.push(InboundMessage {
                guild_id: Some(guild_id.to_string()),
                channel_id: channel_id.to_string(),
                author_id: author_id.to_string(),
                content: message
                    .get("content")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
            });
        }
        if !latest_seen.is_empty() {
            self.last_message_ids
                .insert(channel_id.to_string(), latest_seen);
        }
        Ok(())
    }
}

fn compare_message_ids(left: &str, right: &str) -> std::cmp::Ordering {
    match (left.parse::<u128>(), right.parse::<u128>()) {
        (Ok(left), Ok(right)) => left.cmp(&right),
        _ => left.cmp(right),
    }
}

fn is_newer_message(candidate: &str, previous: Option<&str>) -> bool {
    let Some(previous) = previous else {
        return !candidate.trim().is_empty();
    };
    if previous.trim().is_empty() {
        return !candidate.trim().is_empty();
    }
    compare_message_ids(candidate.trim(), previous.trim()).is_gt()
}
