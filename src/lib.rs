//! Translation overlay for a host application's string table.
//!
//! Loads a user-supplied `.po` file for the preferred language, merges it
//! into the host's live strings (fully or one content category at a time),
//! and exports the strings extensions contributed as `.pot` templates for
//! translators.
//!
//! The host drives everything through [`engine::Engine`]; the other modules
//! are usable on their own.

pub mod bundle;
pub mod codec;
pub mod config;
pub mod discovery;
pub mod engine;
pub mod error;
pub mod gate;
pub mod i18n;
pub mod inventory;
pub mod loader;
pub mod repository;
pub mod template;

pub use codec::{DocumentKind, TranslationMap};
pub use config::Config;
pub use engine::Engine;
pub use error::I18nError;
pub use repository::{SharedMap, StringTable, TextRepository};
