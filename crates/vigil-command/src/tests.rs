//! Router table construction and dispatch tests.

use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use vigil_lang::{CommandKind, LanguagePack, LanguageRegistry};

use super::*;

fn registry_with_german() -> LanguageRegistry {
    let mut registry = LanguageRegistry::with_builtin_default("en-US");
    let mut german = LanguagePack::builtin_default();
    german.commands.help.verb = "hilfe".to_string();
    german.commands.announce.verb = "ansage".to_string();
    german.commands.prefix.verb = "praefix".to_string();
    registry.install("de-DE", german).expect("install german");
    registry
}

#[derive(Default)]
struct RecordingActions {
    calls: Mutex<Vec<String>>,
}

impl RecordingActions {
    fn record(&self, call: impl Into<String>) {
        self.calls.lock().expect("calls lock").push(call.into());
    }

    fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.calls.lock().expect("calls lock"))
    }
}

#[async_trait]
impl CommandActions for RecordingActions {
    async fn help(&self, _ctx: &CommandContext) -> Result<()> {
        self.record("help");
        Ok(())
    }
    async fn info(&self, _ctx: &CommandContext) -> Result<()> {
        self.record("info");
        Ok(())
    }
    async fn booyah(&self, _ctx: &CommandContext) -> Result<()> {
        self.record("booyah");
        Ok(())
    }
    async fn chuck(&self, _ctx: &CommandContext) -> Result<()> {
        self.record("chuck");
        Ok(())
    }
    async fn cytube(&self, _ctx: &CommandContext, room: &str) -> Result<()> {
        self.record(format!("cytube:{room}"));
        Ok(())
    }
    async fn announce(&self, _ctx: &CommandContext, room: &str) -> Result<()> {
        self.record(format!("announce:{room}"));
        Ok(())
    }
    async fn admin(&self, _ctx: &CommandContext, mention: &str) -> Result<()> {
        self.record(format!("admin:{mention}"));
        Ok(())
    }
    async fn prefix(&self, _ctx: &CommandContext, new_prefix: &str) -> Result<()> {
        self.record(format!("prefix:{new_prefix}"));
        Ok(())
    }
    async fn channel(&self, _ctx: &CommandContext, mention: Option<&str>) -> Result<()> {
        self.record(format!("channel:{}", mention.unwrap_or("<current>")));
        Ok(())
    }
    async fn unknown(&self, _ctx: &CommandContext) -> Result<()> {
        self.record("unknown");
        Ok(())
    }
    async fn usage(&self, _ctx: &CommandContext, kind: CommandKind) -> Result<()> {
        self.record(format!("usage:{}", kind.as_str()));
        Ok(())
    }
}

fn test_context() -> CommandContext {
    CommandContext {
        guild_id: "guild-1".to_string(),
        channel_id: "chan-1".to_string(),
        author_id: "user-1".to_string(),
        language: "en-US".to_string(),
    }
}

#[test]
fn unit_table_resolves_canonical_verbs_and_help_shorthand() {
    let registry = registry_with_german();
    let router = CommandRouter::build(Arc::new(registry)).expect("build router");

    assert_eq!(router.resolve("en-US", "help"), Some(CommandKind::Help));
    assert_eq!(router.resolve("en-US", "?"), Some(CommandKind::Help));
    assert_eq!(router.resolve("de-DE", "hilfe"), Some(CommandKind::Help));
    assert_eq!(router.resolve("de-DE", "?"), Some(CommandKind::Help));
    assert_eq!(router.resolve("en-US", "bogus"), None);
}

#[test]
fn unit_default_language_verbs_work_in_every_language() {
    let registry = registry_with_german();
    let router = CommandRouter::build(Arc::new(registry)).expect("build router");

    // German table accepts both the localized and the default verb.
    assert_eq!(
        router.resolve("de-DE", "ansage"),
        Some(CommandKind::Announce)
    );
    assert_eq!(
        router.resolve("de-DE", "announce"),
        Some(CommandKind::Announce)
    );
}

#[test]
fn unit_unknown_language_falls_back_to_default_table() {
    let registry = registry_with_german();
    let router = CommandRouter::build(Arc::new(registry)).expect("build router");
    assert_eq!(router.resolve("xx-XX", "booyah"), Some(CommandKind::Booyah));
}

#[test]
fn regression_alias_collision_is_a_build_error() {
    let mut registry = LanguageRegistry::with_builtin_default("en-US");
    let mut clashing = LanguagePack::builtin_default();
    // The pack itself is consistent, but localizing "booyah" to the
    // default-language verb of another command makes the alias set map
    // one token to two commands once default verbs are folded in.
    clashing.commands.announce.verb = "ansage".to_string();
    clashing.commands.booyah.verb = "announce".to_string();
    registry.install("xx-XX", clashing).expect("install pack");

    let error = CommandRouter::build(Arc::new(registry)).expect_err("must fail");
    assert!(error.to_string().contains("announce"));
}

#[tokio::test]
async fn functional_dispatch_routes_verbs_and_arguments() {
    let registry = registry_with_german();
    let router = CommandRouter::build(Arc::new(registry)).expect("build router");
    let actions = RecordingActions::default();
    let ctx = test_context();

    router
        .dispatch("en-US help", &ctx, &actions)
        .await
        .expect("dispatch");
    router
        .dispatch("en-US cytube the lobby", &ctx, &actions)
        .await
        .expect("dispatch");
    router
        .dispatch("de-DE ansage lobby", &ctx, &actions)
        .await
        .expect("dispatch");
    router
        .dispatch("en-US channel", &ctx, &actions)
        .await
        .expect("dispatch");

    assert_eq!(
        actions.take(),
        vec![
            "help".to_string(),
            "cytube:the lobby".to_string(),
            "announce:lobby".to_string(),
            "channel:<current>".to_string(),
        ]
    );
}

#[tokio::test]
async fn functional_unknown_verb_and_missing_argument_become_usage_callbacks() {
    let registry = registry_with_german();
    let router = CommandRouter::build(Arc::new(registry)).expect("build router");
    let actions = RecordingActions::default();
    let ctx = test_context();

    router
        .dispatch("en-US frobnicate", &ctx, &actions)
        .await
        .expect("dispatch");
    router
        .dispatch("en-US announce", &ctx, &actions)
        .await
        .expect("dispatch");
    router
        .dispatch("en-US", &ctx, &actions)
        .await
        .expect("dispatch");

    assert_eq!(
        actions.take(),
        vec![
            "unknown".to_string(),
            "usage:announce".to_string(),
            "unknown".to_string(),
        ]
    );
}

#[test]
fn unit_help_listing_contains_every_verb_and_description() {
    let pack = LanguagePack::builtin_default();
    let listing = help_listing(&pack, "!vg");
    for (_, entry) in pack.commands.entries() {
        assert!(listing.contains(&format!("!vg{}", entry.verb)));
        assert!(listing.contains(&entry.description));
    }
}
