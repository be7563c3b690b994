//! Language type: a preferred language validated against the registry.

use crate::i18n::{LanguageConfig, LanguageRegistry};
use anyhow::{bail, Result};

/// A validated language.
///
/// Only supported, enabled languages can be constructed, so `code()` always
/// names a translation file the engine knows how to look for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Language {
    code: &'static str,
}

impl Language {
    /// Default target of the translation overlay.
    pub const SIMPLIFIED_CHINESE: Language = Language { code: "zh-hans" };

    /// Resolve a settings value, given either as a code ("ko") or an English
    /// name ("Korean").
    ///
    /// # Example
    /// ```
    /// use mod_i18n::i18n::Language;
    ///
    /// let korean = Language::resolve("Korean").unwrap();
    /// assert_eq!(korean.code(), "ko");
    /// ```
    pub fn resolve(code_or_name: &str) -> Result<Language> {
        let registry = LanguageRegistry::get();

        match registry.find(code_or_name.trim()) {
            Some(config) if config.enabled => Ok(Language { code: config.code }),
            Some(_) => bail!("Language '{}' is not enabled", code_or_name),
            None => bail!("Unknown language: '{}'", code_or_name),
        }
    }

    /// Code naming the translation file, e.g. `"zh-hans"` for `zh-hans.po`.
    pub fn code(&self) -> &'static str {
        self.code
    }

    /// Translation file name for this language.
    pub fn file_name(&self) -> String {
        format!("{}.po", self.code)
    }

    /// Get the full language configuration from the registry.
    ///
    /// # Panics
    /// Panics if the code is not in the registry, which cannot happen for a
    /// `Language` obtained from `resolve` or the constants.
    pub fn config(&self) -> &'static LanguageConfig {
        LanguageRegistry::get()
            .get_by_code(self.code)
            .expect("Language code should always be valid")
    }

    pub fn name(&self) -> &'static str {
        self.config().name
    }

    pub fn native_name(&self) -> &'static str {
        self.config().native_name
    }

    /// Whether this is the language the host already ships its text in.
    pub fn is_canonical(&self) -> bool {
        self.config().is_canonical
    }
}

impl Default for Language {
    fn default() -> Self {
        Self::SIMPLIFIED_CHINESE
    }
}
