use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use vigil_lang::{CommandKind, LanguagePack, LanguageRegistry};

use crate::table::CommandTable;

/// Origin of the command being dispatched: which session, which
/// channel, who asked.
#[derive(Debug, Clone)]
pub struct CommandContext {
    pub guild_id: String,
    pub channel_id: String,
    pub author_id: String,
    pub language: String,
}

/// The actions a session binds to the command surface. Side effects
/// (message I/O, config mutation) live entirely behind this trait; the
/// router stays stateless per call.
#[async_trait]
pub trait CommandActions: Send + Sync {
    async fn help(&self, ctx: &CommandContext) -> Result<()>;
    async fn info(&self, ctx: &CommandContext) -> Result<()>;
    async fn booyah(&self, ctx: &CommandContext) -> Result<()>;
    async fn chuck(&self, ctx: &CommandContext) -> Result<()>;
    async fn cytube(&self, ctx: &CommandContext, room: &str) -> Result<()>;
    async fn announce(&self, ctx: &CommandContext, room: &str) -> Result<()>;
    async fn admin(&self, ctx: &CommandContext, mention: &str) -> Result<()>;
    async fn prefix(&self, ctx: &CommandContext, new_prefix: &str) -> Result<()>;
    async fn channel(&self, ctx: &CommandContext, mention: Option<&str>) -> Result<()>;

    /// Unknown verb: reply with localized help/usage.
    async fn unknown(&self, ctx: &CommandContext) -> Result<()>;

    /// Known verb, missing required argument: reply with usage for it.
    async fn usage(&self, ctx: &CommandContext, kind: CommandKind) -> Result<()>;
}

/// Parses `<languageCode> <verb> [argument]` against per-language
/// tables built once at startup, and invokes the matched action.
#[derive(Debug, Clone)]
pub struct CommandRouter {
    registry: Arc<LanguageRegistry>,
    tables: BTreeMap<String, CommandTable>,
}

impl CommandRouter {
    /// Builds one table per registered language. Any alias collision
    /// anywhere is a startup failure.
    pub fn build(registry: Arc<LanguageRegistry>) -> Result<Self> {
        let default_pack = registry.default_pack();
        let mut tables = BTreeMap::new();
        for code in registry.codes() {
            let table = CommandTable::build(code, registry.resolve(code), default_pack)?;
            tables.insert(code.to_string(), table);
        }
        Ok(Self {
            registry: Arc::clone(&registry),
            tables,
        })
    }

    fn table_for(&self, code: &str) -> &CommandTable {
        let resolved = self.registry.resolve_code(code);
        self.tables
            .get(resolved)
            .unwrap_or_else(|| {
                // The default table always exists; resolve_code never
                // returns a code without one.
                self.tables
                    .get(self.registry.default_code())
                    .expect("default command table is always built")
            })
    }

    /// Resolves a verb for tests and diagnostics.
    pub fn resolve(&self, language: &str, verb: &str) -> Option<CommandKind> {
        self.table_for(language).resolve(verb)
    }

    /// Dispatches one prefix-stripped command line. Never fails on bad
    /// user input; only action errors propagate.
    pub async fn dispatch(
        &self,
        line: &str,
        ctx: &CommandContext,
        actions: &dyn CommandActions,
    ) -> Result<()> {
        let mut parts = line.trim().splitn(2, char::is_whitespace);
        let language = parts.next().unwrap_or_default().trim();
        let rest = parts.next().unwrap_or_default().trim();

        let mut rest_parts = rest.splitn(2, char::is_whitespace);
        let verb = rest_parts.next().unwrap_or_default().trim();
        let argument = rest_parts
            .next()
            .map(str::trim)
            .filter(|argument| !argument.is_empty());

        if verb.is_empty() {
            return actions.unknown(ctx).await;
        }
        let Some(kind) = self.table_for(language).resolve(verb) else {
            return actions.unknown(ctx).await;
        };

        match (kind, argument) {
            (CommandKind::Help, _) => actions.help(ctx).await,
            (CommandKind::Info, _) => actions.info(ctx).await,
            (CommandKind::Booyah, _) => actions.booyah(ctx).await,
            (CommandKind::Chuck, _) => actions.chuck(ctx).await,
            (CommandKind::Cytube, Some(room)) => actions.cytube(ctx, room).await,
            (CommandKind::Cytube, None) => actions.usage(ctx, kind).await,
            (CommandKind::Announce, Some(room)) => actions.announce(ctx, room).await,
            (CommandKind::Announce, None) => actions.usage(ctx, kind).await,
            (CommandKind::Admin, Some(mention)) => actions.admin(ctx, mention).await,
            (CommandKind::Admin, None) => actions.usage(ctx, kind).await,
            (CommandKind::Prefix, Some(new_prefix)) => actions.prefix(ctx, new_prefix).await,
            (CommandKind::Prefix, None) => actions.usage(ctx, kind).await,
            (CommandKind::Channel, mention) => actions.channel(ctx, mention).await,
        }
    }
}

/// Renders the per-command help listing shown by the help action.
pub fn help_listing(pack: &LanguagePack, prefix: &str) -> String {
    let mut lines = Vec::new();
    for (_, entry) in pack.commands.entries() {
        lines.push(format!("{prefix}{} - {}", entry.verb, entry.description));
    }
    lines.join("\n")
}
