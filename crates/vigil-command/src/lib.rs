//! Localized command routing.
//!
//! One immutable token table per language, built and validated at
//! startup. Dispatch parses `<languageCode> <verb> [argument]` and
//! invokes the matched action on an injected [`CommandActions`]
//! implementation; unknown verbs and missing arguments become usage
//! callbacks, never errors.

mod router;
mod table;

pub use router::{help_listing, CommandActions, CommandContext, CommandRouter};
pub use table::CommandTable;

#[cfg(test)]
mod tests;
