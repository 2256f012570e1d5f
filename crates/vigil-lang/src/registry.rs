use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};

use crate::pack::LanguagePack;

/// Startup-validated set of language packs keyed by i18n code. Unknown
/// codes resolve to the default pack.
#[derive(Debug, Clone)]
pub struct LanguageRegistry {
    default_code: String,
    packs: BTreeMap<String, LanguagePack>,
}

impl LanguageRegistry {
    /// Creates a registry holding only the built-in pack under
    /// `default_code`.
    pub fn with_builtin_default(default_code: impl Into<String>) -> Self {
        let default_code = default_code.into();
        let mut packs = BTreeMap::new();
        packs.insert(default_code.clone(), LanguagePack::builtin_default());
        Self {
            default_code,
            packs,
        }
    }

    /// Installs a pack after validation. Replaces any pack already
    /// registered under the same code (a disk pack may override the
    /// built-in default wording).
    pub fn install(&mut self, code: impl Into<String>, pack: LanguagePack) -> Result<()> {
        let code = code.into();
        pack.validate(&code)?;
        self.packs.insert(code, pack);
        Ok(())
    }

    /// Loads every `*.json` pack in `dir`, keyed by file stem. A
    /// missing directory is fine (the built-in default still works); a
    /// pack that fails to parse or validate is a startup error.
    pub fn load_dir(&mut self, dir: &Path) -> Result<usize> {
        if !dir.exists() {
            return Ok(0);
        }
        let entries = std::fs::read_dir(dir)
            .with_context(|| format!("failed to read language dir {}", dir.display()))?;
        let mut installed = 0usize;
        for entry in entries {
            let entry = entry.with_context(|| {
                format!("failed to enumerate language dir {}", dir.display())
            })?;
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            let Some(code) = path.file_stem().and_then(|stem| stem.to_str()) else {
                continue;
            };
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read language pack {}", path.display()))?;
            let pack = serde_json::from_str::<LanguagePack>(&raw)
                .with_context(|| format!("failed to parse language pack {}", path.display()))?;
            self.install(code.to_string(), pack)?;
            installed += 1;
        }
        Ok(installed)
    }

    pub fn default_code(&self) -> &str {
        &self.default_code
    }

    /// Resolves `code` to a known code, falling back to the default
    /// for languages that were never loaded.
    pub fn resolve_code<'a>(&'a self, code: &'a str) -> &'a str {
        if self.packs.contains_key(code) {
            code
        } else {
            &self.default_code
        }
    }

    pub fn resolve(&self, code: &str) -> &LanguagePack {
        self.packs
            .get(code)
            .unwrap_or_else(|| self.default_pack())
    }

    pub fn default_pack(&self) -> &LanguagePack {
        self.packs
            .get(&self.default_code)
            .expect("default language pack is always installed")
    }

    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.packs.keys().map(String::as_str)
    }
}
