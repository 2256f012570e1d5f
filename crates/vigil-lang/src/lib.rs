//! Typed language packs for the command surface and user-facing
//! messages.
//!
//! Every pack is a fully typed record parsed and validated at startup,
//! so a missing or duplicated verb is a boot failure instead of a
//! runtime crash. Message templates use `{name}` placeholders rendered
//! by [`render_template`].

mod pack;
mod registry;
mod template;

pub use pack::{CommandEntry, CommandKind, CommandLexicon, LanguagePack, MessageCatalog};
pub use registry::LanguageRegistry;
pub use template::render_template;
