mod bootstrap;

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use vigil_command::CommandRouter;
use vigil_config::GuildConfigStore;
use vigil_gateway::{GatewayConnectionSupervisor, GatewayTransport};
use vigil_lang::LanguageRegistry;
use vigil_room::{RoomWatchSupervisor, RoomWatchSupervisorConfig};
use vigil_session::{ProcessStats, SessionDeps, SessionManager};
use vigil_transport::{
    RestChatEventPoller, RestChatGateway, RestChatGatewayConfig, RestJokeClient, WsRoomConnector,
};

use crate::bootstrap::{init_tracing, resolve_chat_token};

/// Multi-tenant chat bot that watches external media rooms and
/// announces their changes per guild.
#[derive(Debug, Parser)]
#[command(name = "vigil", version)]
struct CliArgs {
    /// Directory holding one config snapshot per guild.
    #[arg(long, env = "VIGIL_STATE_DIR", default_value = "state")]
    state_dir: PathBuf,

    /// Directory of `<code>.json` language packs; optional.
    #[arg(long, env = "VIGIL_LANG_DIR", default_value = "lang")]
    lang_dir: PathBuf,

    /// JSON secret file with the chat bot token.
    #[arg(long, env = "VIGIL_SECRET_PATH", default_value = "secret/chat.json")]
    secret_path: PathBuf,

    /// Chat bot token; overrides the secret file.
    #[arg(long, env = "VIGIL_CHAT_TOKEN")]
    chat_token: Option<String>,

    /// Chat platform REST base.
    #[arg(
        long,
        env = "VIGIL_CHAT_API_BASE",
        default_value = "https://discord.com/api/v10"
    )]
    chat_api_base: String,

    /// Room service websocket base, e.g. `wss://rooms.example/r`.
    #[arg(long, env = "VIGIL_ROOM_WS_BASE")]
    room_ws_base: String,

    /// Joke API base for the `chuck` command.
    #[arg(
        long,
        env = "VIGIL_JOKE_API_BASE",
        default_value = "https://api.chucknorris.io"
    )]
    joke_api_base: String,

    /// Language used when a guild's configured code is unknown.
    #[arg(long, env = "VIGIL_DEFAULT_LANGUAGE", default_value = "en-US")]
    default_language: String,

    #[arg(long, default_value_t = 2)]
    poll_interval_seconds: u64,

    #[arg(long, default_value_t = 10)]
    reconnect_delay_seconds: u64,

    #[arg(long, default_value_t = 300)]
    stats_interval_seconds: u64,

    #[arg(long, default_value_t = 10_000)]
    request_timeout_ms: u64,

    #[arg(long, default_value_t = 3)]
    retry_max_attempts: usize,

    #[arg(long, default_value_t = 250)]
    retry_base_delay_ms: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();
    init_tracing();
    run(args).await
}

async fn run(args: CliArgs) -> Result<()> {
    let mut registry = LanguageRegistry::with_builtin_default(&args.default_language);
    let installed = registry
        .load_dir(&args.lang_dir)
        .context("language pack loading failed")?;
    let registry = Arc::new(registry);
    println!("{}", registry.default_pack().messages.boot);
    println!(
        "languages: {} loaded from {} ({} total)",
        installed,
        args.lang_dir.display(),
        registry.codes().count()
    );

    let router = Arc::new(
        CommandRouter::build(Arc::clone(&registry)).context("command table build failed")?,
    );

    let chat_token = resolve_chat_token(args.chat_token.as_deref(), &args.secret_path)?;
    let chat_config = RestChatGatewayConfig {
        api_base: args.chat_api_base.clone(),
        bot_token: chat_token,
        request_timeout_ms: args.request_timeout_ms,
        retry_max_attempts: args.retry_max_attempts,
        retry_base_delay_ms: args.retry_base_delay_ms,
    };
    let gateway = Arc::new(RestChatGateway::new(chat_config.clone())?);
    let mut poller = RestChatEventPoller::new(chat_config)?;

    let rooms = RoomWatchSupervisor::new(
        Arc::new(WsRoomConnector::new(&args.room_ws_base)),
        RoomWatchSupervisorConfig {
            reconnect_delay: Duration::from_secs(args.reconnect_delay_seconds.max(1)),
            ..RoomWatchSupervisorConfig::default()
        },
    );

    let deps = SessionDeps {
        gateway: gateway.clone(),
        rooms,
        jokes: Arc::new(RestJokeClient::new(&args.joke_api_base)),
        store: Arc::new(GuildConfigStore::new(&args.state_dir)),
        languages: registry,
        stats: Arc::new(ProcessStats::default()),
        bot_version: env!("CARGO_PKG_VERSION").to_string(),
    };
    let manager = SessionManager::new(deps, router);

    let link: Arc<dyn GatewayTransport> = gateway;
    let supervisor = GatewayConnectionSupervisor::new(
        link,
        Duration::from_secs(args.reconnect_delay_seconds.max(1)),
    );
    supervisor.start().await?;

    let mut known_guilds: BTreeSet<String> = BTreeSet::new();
    let mut ready_done = false;
    let mut poll_timer = tokio::time::interval(Duration::from_secs(
        args.poll_interval_seconds.max(1),
    ));
    let mut stats_timer = tokio::time::interval(Duration::from_secs(
        args.stats_interval_seconds.max(1),
    ));

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                println!("vigil shutdown requested");
                return Ok(());
            }
            _ = stats_timer.tick() => {
                let snapshot = manager.stats_snapshot().await;
                println!(
                    "vigil stats: guilds={} users={} watched_rooms={}",
                    snapshot.guilds, snapshot.users, snapshot.watched_rooms
                );
                refresh_guilds(&poller, &manager, &mut known_guilds).await;
            }
            _ = poll_timer.tick() => {
                let guild_ids: Vec<String> = known_guilds.iter().cloned().collect();
                match poller.poll_new_messages(&guild_ids).await {
                    Ok(messages) => {
                        let _ = supervisor.handle_connected().await;
                        if !ready_done {
                            // Enumeration may fail independently of the
                            // link; retry it on the next cycle instead
                            // of latching a half-initialized ready.
                            match poller.list_joined_guilds().await {
                                Ok(profiles) => {
                                    known_guilds = profiles
                                        .iter()
                                        .map(|profile| profile.guild_id.clone())
                                        .collect();
                                    manager.handle_ready(profiles).await;
                                    ready_done = true;
                                    println!("{}", manager_ready_line(&manager).await);
                                }
                                Err(error) => {
                                    tracing::warn!(%error, "ready enumeration failed");
                                }
                            }
                        }
                        for message in messages {
                            if let Err(error) = manager.handle_message(message).await {
                                tracing::warn!(%error, "message dispatch failed");
                            }
                        }
                    }
                    Err(error) => {
                        tracing::warn!(%error, "chat poll cycle failed");
                        supervisor.handle_connection_lost("poll cycle failed").await;
                    }
                }
            }
        }
    }
}

async fn manager_ready_line(manager: &SessionManager) -> String {
    format!("vigil ready: sessions={}", manager.session_count().await)
}

/// Discovers newly joined guilds; the polling analog of a guild-join
/// gateway event.
async fn refresh_guilds(
    poller: &RestChatEventPoller,
    manager: &SessionManager,
    known_guilds: &mut BTreeSet<String>,
) {
    match poller.list_joined_guilds().await {
        Ok(profiles) => {
            for profile in profiles {
                if known_guilds.insert(profile.guild_id.clone()) {
                    manager.handle_guild_join(profile).await;
                }
            }
        }
        Err(error) => {
            tracing::warn!(%error, "guild enumeration failed");
        }
    }
}
