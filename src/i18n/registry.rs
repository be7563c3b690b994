//! Language registry: Single source of truth for the languages a translation
//! file can be selected for.
//!
//! The registry is a `OnceLock` singleton, initialized on first access and
//! immutable afterwards. The language code doubles as the translation file
//! stem (`<code>.po`).

use std::sync::OnceLock;

/// Configuration for a supported language.
#[derive(Debug, Clone)]
pub struct LanguageConfig {
    /// Code used to name the translation file (e.g., "zh-hans", "ko")
    pub code: &'static str,

    /// English name of the language (e.g., "Korean"), also accepted in settings
    pub name: &'static str,

    /// Native name of the language (e.g., "한국어")
    pub native_name: &'static str,

    /// Whether this is the language the host ships its text in
    pub is_canonical: bool,

    /// Whether this language may be selected
    pub enabled: bool,
}

/// Global language registry singleton.
pub struct LanguageRegistry {
    languages: Vec<LanguageConfig>,
}

/// Global registry instance (initialized lazily)
static REGISTRY: OnceLock<LanguageRegistry> = OnceLock::new();

impl LanguageRegistry {
    /// Get the global language registry instance.
    pub fn get() -> &'static LanguageRegistry {
        REGISTRY.get_or_init(|| LanguageRegistry {
            languages: default_languages(),
        })
    }

    /// Get a language configuration by its code (case-insensitive).
    pub fn get_by_code(&self, code: &str) -> Option<&LanguageConfig> {
        self.languages
            .iter()
            .find(|lang| lang.code.eq_ignore_ascii_case(code))
    }

    /// Get a language configuration by code or by English name.
    ///
    /// Settings files written by older versions store the English name
    /// ("SimplifiedChinese" or "Simplified Chinese"); both spellings match.
    pub fn find(&self, code_or_name: &str) -> Option<&LanguageConfig> {
        let wanted = normalize_name(code_or_name);
        self.get_by_code(code_or_name).or_else(|| {
            self.languages
                .iter()
                .find(|lang| normalize_name(lang.name) == wanted)
        })
    }
}

fn normalize_name(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Default language configurations.
fn default_languages() -> Vec<LanguageConfig> {
    vec![
        LanguageConfig {
            code: "en",
            name: "English",
            native_name: "English",
            is_canonical: true,
            enabled: true,
        },
        LanguageConfig {
            code: "zh-hans",
            name: "Simplified Chinese",
            native_name: "简体中文",
            is_canonical: false,
            enabled: true,
        },
        LanguageConfig {
            code: "zh-hant",
            name: "Traditional Chinese",
            native_name: "繁體中文",
            is_canonical: false,
            enabled: true,
        },
        LanguageConfig {
            code: "ja",
            name: "Japanese",
            native_name: "日本語",
            is_canonical: false,
            enabled: true,
        },
        LanguageConfig {
            code: "ko",
            name: "Korean",
            native_name: "한국어",
            is_canonical: false,
            enabled: true,
        },
        LanguageConfig {
            code: "ru",
            name: "Russian",
            native_name: "Русский",
            is_canonical: false,
            enabled: true,
        },
        LanguageConfig {
            code: "fr",
            name: "French",
            native_name: "Français",
            is_canonical: false,
            enabled: true,
        },
        LanguageConfig {
            code: "de",
            name: "German",
            native_name: "Deutsch",
            is_canonical: false,
            enabled: true,
        },
        LanguageConfig {
            code: "es",
            name: "Spanish",
            native_name: "Español",
            is_canonical: false,
            enabled: true,
        },
        LanguageConfig {
            code: "pt-br",
            name: "Brazilian Portuguese",
            native_name: "Português (Brasil)",
            is_canonical: false,
            enabled: true,
        },
        LanguageConfig {
            code: "pl",
            name: "Polish",
            native_name: "Polski",
            is_canonical: false,
            enabled: true,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_get_returns_singleton() {
        let registry1 = LanguageRegistry::get();
        let registry2 = LanguageRegistry::get();

        // Should return the same instance (same memory address)
        assert!(std::ptr::eq(registry1, registry2));
    }

    #[test]
    fn test_get_by_code_simplified_chinese() {
        let registry = LanguageRegistry::get();
        let config = registry.get_by_code("zh-hans").unwrap();

        assert_eq!(config.code, "zh-hans");
        assert_eq!(config.name, "Simplified Chinese");
        assert!(!config.is_canonical);
        assert!(config.enabled);
    }

    #[test]
    fn test_get_by_code_ignores_case() {
        let registry = LanguageRegistry::get();
        assert_eq!(registry.get_by_code("ZH-Hans").unwrap().code, "zh-hans");
    }

    #[test]
    fn test_get_by_code_nonexistent() {
        let registry = LanguageRegistry::get();
        assert!(registry.get_by_code("tlh").is_none());
    }

    #[test]
    fn test_find_by_english_name() {
        let registry = LanguageRegistry::get();
        assert_eq!(registry.find("Korean").unwrap().code, "ko");
        assert_eq!(registry.find("SimplifiedChinese").unwrap().code, "zh-hans");
        assert_eq!(registry.find("simplified chinese").unwrap().code, "zh-hans");
    }

    #[test]
    fn test_find_unknown() {
        let registry = LanguageRegistry::get();
        assert!(registry.find("Klingon").is_none());
    }

    #[test]
    fn test_codes_are_unique() {
        let all = default_languages();
        let mut codes: Vec<_> = all.iter().map(|lang| lang.code).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), all.len());
    }

    #[test]
    fn test_exactly_one_canonical_language() {
        let canonical: Vec<_> = default_languages()
            .into_iter()
            .filter(|lang| lang.is_canonical)
            .map(|lang| lang.code)
            .collect();
        assert_eq!(canonical, vec!["en"]);
    }
}
