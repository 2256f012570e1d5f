use std::collections::BTreeMap;

use anyhow::{bail, Result};
use vigil_lang::{CommandKind, LanguagePack};

/// The fixed cross-language shorthand for help.
const HELP_SHORTHAND: &str = "?";

/// Immutable verb→command mapping for one language, including aliases:
/// `?` for help and, for every command, the default-language verb
/// whenever it differs from the localized one.
#[derive(Debug, Clone)]
pub struct CommandTable {
    code: String,
    verbs: BTreeMap<String, CommandKind>,
}

impl CommandTable {
    /// Builds the table for `code`. A token that would map to two
    /// different commands is a configuration error surfaced at boot.
    pub fn build(code: &str, pack: &LanguagePack, default_pack: &LanguagePack) -> Result<Self> {
        let mut table = Self {
            code: code.to_string(),
            verbs: BTreeMap::new(),
        };
        for (kind, entry) in pack.commands.entries() {
            table.bind(entry.verb.trim(), kind)?;
        }
        table.bind(HELP_SHORTHAND, CommandKind::Help)?;
        for (kind, entry) in default_pack.commands.entries() {
            // The default-language verb always works, whatever the
            // active language.
            table.bind(entry.verb.trim(), kind)?;
        }
        Ok(table)
    }

    fn bind(&mut self, verb: &str, kind: CommandKind) -> Result<()> {
        match self.verbs.get(verb) {
            Some(existing) if *existing != kind => {
                bail!(
                    "language '{}' maps verb '{verb}' to both '{}' and '{}'",
                    self.code,
                    existing.as_str(),
                    kind.as_str()
                );
            }
            Some(_) => Ok(()),
            None => {
                self.verbs.insert(verb.to_string(), kind);
                Ok(())
            }
        }
    }

    pub fn resolve(&self, verb: &str) -> Option<CommandKind> {
        self.verbs.get(verb).copied()
    }

    pub fn code(&self) -> &str {
        &self.code
    }
}
