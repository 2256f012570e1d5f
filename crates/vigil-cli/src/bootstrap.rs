use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Deserialize)]
struct SecretFile {
    chat: ChatSecret,
}

#[derive(Debug, Deserialize)]
struct ChatSecret {
    token: String,
}

pub(crate) fn init_tracing() {
    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

/// Resolves the chat bot token: an explicit flag/env value wins, then
/// the secret file. A bot without a token cannot run at all.
pub(crate) fn resolve_chat_token(
    explicit: Option<&str>,
    secret_path: &Path,
) -> Result<String> {
    if let Some(token) = explicit.map(str::trim).filter(|token| !token.is_empty()) {
        return Ok(token.to_string());
    }
    if !secret_path.exists() {
        bail!(
            "no chat token: pass --chat-token (or VIGIL_CHAT_TOKEN) or provide {}",
            secret_path.display()
        );
    }
    let raw = std::fs::read_to_string(secret_path)
        .with_context(|| format!("failed to read secret file {}", secret_path.display()))?;
    let secrets = serde_json::from_str::<SecretFile>(&raw)
        .with_context(|| format!("failed to parse secret file {}", secret_path.display()))?;
    let token = secrets.chat.token.trim().to_string();
    if token.is_empty() {
        bail!("secret file {} has an empty chat token", secret_path.display());
    }
    Ok(token)
}
