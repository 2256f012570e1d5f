use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde_json::{json, Value};
use vigil_gateway::GatewayTransport;
use vigil_session::ChatGateway;

/// Connection settings for the REST chat adapter.
#[derive(Debug, Clone)]
pub struct RestChatGatewayConfig {
    pub api_base: String,
    pub bot_token: String,
    pub request_timeout_ms: u64,
    pub retry_max_attempts: usize,
    pub retry_base_delay_ms: u64,
}

/// Chat-platform adapter over plain REST calls with bounded retry on
/// rate limits and server errors.
pub struct RestChatGateway {
    config: RestChatGatewayConfig,
    client: Client,
}

impl RestChatGateway {
    pub fn new(config: RestChatGatewayConfig) -> Result<Self> {
        if config.api_base.trim().is_empty() {
            bail!("chat api base cannot be empty");
        }
        if config.bot_token.trim().is_empty() {
            bail!("chat bot token cannot be empty");
        }
        let client = Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms.max(1)))
            .build()
            .context("failed to build chat http client")?;
        Ok(Self { config, client })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.config.api_base.trim_end_matches('/'))
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        builder.header("authorization", format!("Bot {}", self.config.bot_token))
    }

    /// Sends a request, retrying 429s and 5xx responses with linear
    /// backoff. Other failures surface immediately.
    async fn send_with_retry<F>(&self, label: &str, build: F) -> Result<reqwest::Response>
    where
        F: Fn() -> RequestBuilder,
    {
        let max_attempts = self.config.retry_max_attempts.max(1);
        let mut attempt = 0usize;
        loop {
            attempt += 1;
            let response = self.authorized(build()).send().await;
            match response {
                Ok(response) => {
                    let status = response.status();
                    let retryable =
                        status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error();
                    if !retryable || attempt >= max_attempts {
                        return Ok(response);
                    }
                    tracing::debug!(label, attempt, %status, "chat request retrying");
                }
                Err(error) => {
                    if attempt >= max_attempts {
                        return Err(
                            anyhow!(error).context(format!("chat request '{label}' failed"))
                        );
                    }
                    tracing::debug!(label, attempt, %error, "chat transport retrying");
                }
            }
            let delay_ms = self
                .config
                .retry_base_delay_ms
                .saturating_mul(attempt as u64);
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        }
    }
}

#[async_trait]
impl ChatGateway for RestChatGateway {
    async fn send_message(&self, channel_id: &str, text: &str) -> Result<()> {
        let url = self.url(&format!("channels/{channel_id}/messages"));
        let body = json!({ "content": text });
        let response = self
            .send_with_retry("send_message", || self.client.post(&url).json(&body))
            .await?;
        let status = response.status();
        if !status.is_success() {
            bail!("send_message to channel {channel_id} failed with status {status}");
        }
        Ok(())
    }

    async fn trigger_typing(&self, channel_id: &str) -> Result<()> {
        let url = self.url(&format!("channels/{channel_id}/typing"));
        let response = self
            .send_with_retry("trigger_typing", || self.client.post(&url))
            .await?;
        let status = response.status();
        if !status.is_success() {
            bail!("trigger_typing on channel {channel_id} failed with status {status}");
        }
        Ok(())
    }

    async fn set_presence(&self, status: &str) -> Result<()> {
        // Presence rides the platform's socket connection, not REST;
        // the adapter records the intent and moves on.
        tracing::debug!(status, "presence change requested (no REST endpoint)");
        Ok(())
    }

    async fn channel_exists(&self, guild_id: &str, channel_id: &str) -> Result<bool> {
        let url = self.url(&format!("channels/{channel_id}"));
        let response = self
            .send_with_retry("channel_exists", || self.client.get(&url))
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(false);
        }
        let status = response.status();
        if !status.is_success() {
            bail!("channel lookup {channel_id} failed with status {status}");
        }
        let payload = response
            .json::<Value>()
            .await
            .context("failed to parse channel lookup response")?;
        Ok(payload.get("guild_id").and_then(Value::as_str) == Some(guild_id))
    }

    async fn member_exists(&self, guild_id: &str, user_id: &str) -> Result<bool> {
        let url = self.url(&format!("guilds/{guild_id}/members/{user_id}"));
        let response = self
            .send_with_retry("member_exists", || self.client.get(&url))
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(false);
        }
        let status = response.status();
        if !status.is_success() {
            bail!("member lookup {user_id} failed with status {status}");
        }
        Ok(true)
    }
}

#[async_trait]
impl GatewayTransport for RestChatGateway {
    /// Polling mode has no socket to dial; an authenticated identity
    /// lookup stands in as the link probe for the reconnect loop.
    async fn connect(&self) -> Result<()> {
        let url = self.url("users/@me");
        let response = self
            .send_with_retry("link_probe", || self.client.get(&url))
            .await?;
        let status = response.status();
        if !status.is_success() {
            bail!("chat link probe failed with status {status}");
        }
        Ok(())
    }
}
