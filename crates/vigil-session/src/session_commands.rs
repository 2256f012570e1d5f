//! The command surface bound to a session: rendering, authorization,
//! and the side effects behind each verb.

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use vigil_command::{help_listing, CommandActions, CommandContext};
use vigil_lang::{render_template, CommandKind};

use crate::session::{AnnounceToggle, GuildSession, UnsetAdminOutcome};

/// Deadline for the joke backend, matching the room-query deadline.
const JOKE_TIMEOUT: Duration = Duration::from_secs(10);

fn argument_hint(kind: CommandKind) -> &'static str {
    match kind {
        CommandKind::Cytube | CommandKind::Announce => "<room>",
        CommandKind::Admin => "<@user>",
        CommandKind::Prefix => "<newPrefix>",
        CommandKind::Channel => "[#channel]",
        CommandKind::Help | CommandKind::Info | CommandKind::Booyah | CommandKind::Chuck => "",
    }
}

impl GuildSession {
    async fn send(&self, ctx: &CommandContext, text: &str) -> Result<()> {
        self.deps().gateway.send_message(&ctx.channel_id, text).await
    }

    /// Admin gate for mutating commands. Sends the localized denial
    /// and reports `true` when the caller must stop.
    async fn deny_unless_admin(&self, ctx: &CommandContext, kind: CommandKind) -> Result<bool> {
        if self.is_admin(&ctx.author_id).await {
            return Ok(false);
        }
        let pack = self.resolve_pack(&ctx.language);
        let verb = pack.commands.entry(kind).verb.clone();
        let text = render_template(&pack.messages.command_denied, &[("command", verb.as_str())]);
        self.send(ctx, &text).await?;
        Ok(true)
    }

    async fn send_help(&self, ctx: &CommandContext) -> Result<()> {
        let pack = self.resolve_pack(&ctx.language);
        let prefix = self.prefix().await;
        let listing = help_listing(pack, &prefix);
        let text = render_template(
            &pack.messages.help_response,
            &[("prefix", prefix.as_str()), ("listing", listing.as_str())],
        );
        self.send(ctx, &text).await
    }
}

#[async_trait]
impl CommandActions for GuildSession {
    async fn help(&self, ctx: &CommandContext) -> Result<()> {
        self.send_help(ctx).await
    }

    async fn info(&self, ctx: &CommandContext) -> Result<()> {
        let deps = self.deps();
        let watched_rooms = deps.rooms.watched_rooms().await.len();
        let snapshot = deps.stats.snapshot(watched_rooms);
        let pack = self.resolve_pack(&ctx.language);
        let text = render_template(
            &pack.messages.info_response,
            &[
                ("version", deps.bot_version.as_str()),
                ("guilds", snapshot.guilds.to_string().as_str()),
                ("users", snapshot.users.to_string().as_str()),
                ("rooms", snapshot.watched_rooms.to_string().as_str()),
            ],
        );
        self.send(ctx, &text).await
    }

    async fn booyah(&self, ctx: &CommandContext) -> Result<()> {
        let pack = self.resolve_pack(&ctx.language);
        let text = pack.messages.booyah_response.clone();
        self.send(ctx, &text).await
    }

    async fn chuck(&self, ctx: &CommandContext) -> Result<()> {
        let joke = tokio::time::timeout(JOKE_TIMEOUT, self.deps().jokes.random_joke()).await;
        let pack = self.resolve_pack(&ctx.language);
        let text = match joke {
            Ok(Ok(joke)) => joke,
            Ok(Err(error)) => {
                tracing::warn!(guild_id = ctx.guild_id.as_str(), %error, "joke fetch failed");
                pack.messages.joke_unavailable.clone()
            }
            Err(_) => {
                tracing::warn!(guild_id = ctx.guild_id.as_str(), "joke fetch timed out");
                pack.messages.joke_unavailable.clone()
            }
        };
        self.send(ctx, &text).await
    }

    async fn cytube(&self, ctx: &CommandContext, room: &str) -> Result<()> {
        let pack = self.resolve_pack(&ctx.language);
        match self.deps().rooms.info(room).await {
            Ok(info) => {
                let mut text = render_template(
                    &pack.messages.room_info_response,
                    &[
                        ("room", info.room.as_str()),
                        ("title", info.media_title.as_str()),
                        ("user_count", info.user_count.to_string().as_str()),
                    ],
                );
                if let Some(url) = info.media_url.as_deref() {
                    text.push('\n');
                    text.push_str(&render_template(
                        &pack.messages.room_info_url_line,
                        &[("url", url)],
                    ));
                }
                self.send(ctx, &text).await
            }
            Err(error) => {
                tracing::warn!(guild_id = ctx.guild_id.as_str(), room, %error, "room query failed");
                let text = pack.messages.try_again.clone();
                self.send(ctx, &text).await
            }
        }
    }

    async fn announce(&self, ctx: &CommandContext, room: &str) -> Result<()> {
        if self.deny_unless_admin(ctx, CommandKind::Announce).await? {
            return Ok(());
        }
        let pack = self.resolve_pack(&ctx.language);
        match self.toggle_announce(room).await {
            Ok(AnnounceToggle::Subscribed) => {
                let text =
                    render_template(&pack.messages.announce_subscribed, &[("room", room)]);
                self.send(ctx, &text).await
            }
            Ok(AnnounceToggle::Unsubscribed) => {
                let text =
                    render_template(&pack.messages.announce_unsubscribed, &[("room", room)]);
                self.send(ctx, &text).await
            }
            Err(error) => {
                tracing::warn!(guild_id = ctx.guild_id.as_str(), room, %error, "announce toggle failed");
                let text = pack.messages.try_again.clone();
                self.send(ctx, &text).await
            }
        }
    }

    async fn admin(&self, ctx: &CommandContext, mention: &str) -> Result<()> {
        if self.deny_unless_admin(ctx, CommandKind::Admin).await? {
            return Ok(());
        }
        let pack = self.resolve_pack(&ctx.language);
        let Some(user_id) = self.validate_mention(mention).await? else {
            let text = pack.messages.invalid_mention.clone();
            return self.send(ctx, &text).await;
        };

        // Toggle: demote an existing admin, promote anyone else.
        let text = if self.is_admin(&user_id).await {
            match self.unset_admin(&user_id).await? {
                UnsetAdminOutcome::OwnerProtected => {
                    pack.messages.admin_owner_protected.clone()
                }
                UnsetAdminOutcome::Revoked | UnsetAdminOutcome::NotAdmin => render_template(
                    &pack.messages.admin_revoked,
                    &[("user_id", user_id.as_str())],
                ),
            }
        } else {
            self.set_admin(&user_id).await?;
            render_template(
                &pack.messages.admin_granted,
                &[("user_id", user_id.as_str())],
            )
        };
        self.send(ctx, &text).await
    }

    async fn prefix(&self, ctx: &CommandContext, new_prefix: &str) -> Result<()> {
        if self.deny_unless_admin(ctx, CommandKind::Prefix).await? {
            return Ok(());
        }
        let pack = self.resolve_pack(&ctx.language);
        if self.set_prefix(new_prefix).await? {
            let text = render_template(
                &pack.messages.prefix_updated,
                &[("prefix", new_prefix.trim())],
            );
            self.send(ctx, &text).await
        } else {
            self.usage(ctx, CommandKind::Prefix).await
        }
    }

    async fn channel(&self, ctx: &CommandContext, mention: Option<&str>) -> Result<()> {
        if self.deny_unless_admin(ctx, CommandKind::Channel).await? {
            return Ok(());
        }
        let pack = self.resolve_pack(&ctx.language);
        let target = match mention {
            Some(raw) => match self.validate_channel(raw).await? {
                Some(channel_id) => channel_id,
                None => {
                    let text = pack.messages.invalid_channel.clone();
                    return self.send(ctx, &text).await;
                }
            },
            // Bare `channel` points announcements at the channel the
            // command was issued in.
            None => ctx.channel_id.clone(),
        };
        if self.set_talk_channel(&target).await? {
            let text = render_template(
                &pack.messages.talk_channel_updated,
                &[("channel_id", target.as_str())],
            );
            self.send(ctx, &text).await
        } else {
            let text = pack.messages.invalid_channel.clone();
            self.send(ctx, &text).await
        }
    }

    async fn unknown(&self, ctx: &CommandContext) -> Result<()> {
        self.send_help(ctx).await
    }

    async fn usage(&self, ctx: &CommandContext, kind: CommandKind) -> Result<()> {
        let pack = self.resolve_pack(&ctx.language);
        let prefix = self.prefix().await;
        let verb = pack.commands.entry(kind).verb.clone();
        let text = render_template(
            &pack.messages.usage,
            &[
                ("prefix", prefix.as_str()),
                ("verb", verb.as_str()),
                ("argument", argument_hint(kind)),
            ],
        );
        self.send(ctx, text.trim_end()).await
    }
}
