use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use vigil_session::JokeApi;

#[derive(Debug, Deserialize)]
struct JokePayload {
    value: String,
}

/// Joke backend over the `{"value": "..."}` REST shape. Callers apply
/// their own deadline.
pub struct RestJokeClient {
    api_base: String,
    client: Client,
}

impl RestJokeClient {
    pub fn new(api_base: impl Into<String>) -> Self {
        Self {
            api_base: api_base.into(),
            client: Client::new(),
        }
    }
}

#[async_trait]
impl JokeApi for RestJokeClient {
    async fn random_joke(&self) -> Result<String> {
        let url = format!("{}/jokes/random", self.api_base.trim_end_matches('/'));
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("joke request failed")?;
        let status = response.status();
        if !status.is_success() {
            bail!("joke request failed with status {status}");
        }
        let payload = response
            .json::<JokePayload>()
            .await
            .context("failed to parse joke response")?;
        let joke = payload.value.trim().to_string();
        if joke.is_empty() {
            bail!("joke response was empty");
        }
        Ok(joke)
    }
}
