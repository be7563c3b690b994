use crate::i18n::Language;
use crate::inventory::default_exclusions;
use crate::loader::MergePolicy;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

/// Name of the engine's own directory under the templates root.
pub const ENGINE_DIR: &str = "ModI18n";

/// User settings persisted by the host's options screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct I18nOptions {
    /// Language code or English language name
    #[serde(rename = "PreferedLanguage", alias = "preferred_language")]
    pub preferred_language: String,

    /// Only use translation files already on disk
    #[serde(rename = "LocalOnly", alias = "local_only")]
    pub local_only: bool,
}

impl Default for I18nOptions {
    fn default() -> Self {
        Self {
            preferred_language: Language::default().code().to_string(),
            local_only: false,
        }
    }
}

impl I18nOptions {
    /// Read settings from `path`, falling back to defaults when the file is
    /// missing or unreadable.
    pub fn load_or_default(path: &Path) -> Self {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("Settings {} not found, using defaults", path.display());
                return Self::default();
            }
            Err(e) => {
                warn!("Failed to read settings {}: {}, using defaults", path.display(), e);
                return Self::default();
            }
        };
        match serde_json::from_str(&content) {
            Ok(options) => options,
            Err(e) => {
                warn!("Invalid settings {}: {}, using defaults", path.display(), e);
                Self::default()
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    // Locations
    pub data_dir: PathBuf,
    pub templates_dir: PathBuf,
    pub baseline_template: PathBuf,

    // User settings
    pub language: Language,
    pub local_only: bool,

    // Engine behavior
    pub excluded_prefixes: Vec<String>,
    pub self_title: String,
    pub merge_policy: MergePolicy,
}

impl Config {
    /// Defaults rooted at `data_dir`, without reading settings or environment.
    pub fn for_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        Self {
            templates_dir: data_dir.join("strings_templates"),
            baseline_template: data_dir.join("strings").join("strings_template.pot"),
            data_dir,
            language: Language::default(),
            local_only: false,
            excluded_prefixes: default_exclusions(),
            self_title: "ModI18nReborn".to_string(),
            merge_policy: MergePolicy::Always,
        }
    }

    pub fn from_env() -> Result<Self> {
        let data_dir = std::env::var("MOD_I18N_DATA_DIR").unwrap_or_else(|_| "./mods".to_string());
        let mut config = Self::for_data_dir(data_dir);

        if let Ok(dir) = std::env::var("MOD_I18N_TEMPLATES_DIR") {
            config.templates_dir = PathBuf::from(dir);
        }
        if let Ok(path) = std::env::var("MOD_I18N_BASELINE_TEMPLATE") {
            config.baseline_template = PathBuf::from(path);
        }
        if let Ok(title) = std::env::var("MOD_I18N_SELF_TITLE") {
            config.self_title = title;
        }
        if let Ok(policy) = std::env::var("MOD_I18N_MERGE_POLICY") {
            config.merge_policy = policy
                .parse()
                .with_context(|| format!("MOD_I18N_MERGE_POLICY has invalid value '{}'", policy))?;
        }

        // Settings file first, environment overrides it
        let mut options = I18nOptions::load_or_default(&config.settings_file());
        if let Ok(language) = std::env::var("MOD_I18N_LANGUAGE") {
            options.preferred_language = language;
        }
        if let Ok(flag) = std::env::var("MOD_I18N_LOCAL_ONLY") {
            options.local_only = parse_flag(&flag)
                .with_context(|| format!("MOD_I18N_LOCAL_ONLY has invalid value '{}'", flag))?;
        }

        config.language = Language::resolve(&options.preferred_language)
            .context("Preferred language is not supported")?;
        config.local_only = options.local_only;

        Ok(config)
    }

    /// Directory holding translation files and the allow-list.
    pub fn i18n_dir(&self) -> PathBuf {
        self.data_dir.join("i18n")
    }

    /// Translation file for the preferred language.
    pub fn translation_file(&self) -> PathBuf {
        self.i18n_dir().join(self.language.file_name())
    }

    pub fn allow_list_file(&self) -> PathBuf {
        self.i18n_dir().join("enableList.txt")
    }

    pub fn settings_file(&self) -> PathBuf {
        self.data_dir.join("config.json")
    }

    /// Directory the engine writes its templates into.
    pub fn engine_templates_dir(&self) -> PathBuf {
        self.templates_dir.join(ENGINE_DIR)
    }

    pub fn aggregate_template(&self) -> PathBuf {
        self.engine_templates_dir()
            .join(crate::template::AGGREGATE_TEMPLATE)
    }
}

fn parse_flag(value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => anyhow::bail!("expected a boolean, got '{}'", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tracing_test::traced_test;

    const VARS: [&str; 7] = [
        "MOD_I18N_DATA_DIR",
        "MOD_I18N_TEMPLATES_DIR",
        "MOD_I18N_BASELINE_TEMPLATE",
        "MOD_I18N_SELF_TITLE",
        "MOD_I18N_MERGE_POLICY",
        "MOD_I18N_LANGUAGE",
        "MOD_I18N_LOCAL_ONLY",
    ];

    fn clear_env() {
        for var in VARS {
            std::env::remove_var(var);
        }
    }

    // ==================== Path Tests ====================

    #[test]
    fn test_paths_follow_data_dir() {
        let config = Config::for_data_dir("/game/mods");
        assert_eq!(config.translation_file(), PathBuf::from("/game/mods/i18n/zh-hans.po"));
        assert_eq!(config.allow_list_file(), PathBuf::from("/game/mods/i18n/enableList.txt"));
        assert_eq!(
            config.aggregate_template(),
            PathBuf::from("/game/mods/strings_templates/ModI18n/curr_mods_templates.pot")
        );
    }

    // ==================== Settings Tests ====================

    #[test]
    #[traced_test]
    fn test_options_missing_file_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let options = I18nOptions::load_or_default(&dir.path().join("config.json"));
        assert_eq!(options, I18nOptions::default());
        assert!(logs_contain("not found, using defaults"));
    }

    #[test]
    fn test_options_reads_host_field_names() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"PreferedLanguage": "Korean", "LocalOnly": true}"#).unwrap();
        let options = I18nOptions::load_or_default(&path);
        assert_eq!(options.preferred_language, "Korean");
        assert!(options.local_only);
    }

    #[test]
    fn test_options_invalid_json_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{not json").unwrap();
        assert_eq!(I18nOptions::load_or_default(&path), I18nOptions::default());
    }

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag("TRUE").unwrap());
        assert!(parse_flag(" 1 ").unwrap());
        assert!(!parse_flag("off").unwrap());
        assert!(parse_flag("maybe").is_err());
    }

    // ==================== Environment Tests ====================

    #[test]
    #[serial]
    fn test_from_env_defaults() {
        clear_env();
        let dir = tempfile::tempdir().unwrap();
        std::env::set_var("MOD_I18N_DATA_DIR", dir.path());

        let config = Config::from_env().unwrap();
        assert_eq!(config.language, Language::SIMPLIFIED_CHINESE);
        assert!(!config.local_only);
        assert_eq!(config.merge_policy, MergePolicy::Always);
        assert_eq!(config.self_title, "ModI18nReborn");
        clear_env();
    }

    #[test]
    #[serial]
    fn test_from_env_overrides_settings_file() {
        clear_env();
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("config.json"),
            r#"{"PreferedLanguage": "ja", "LocalOnly": false}"#,
        )
        .unwrap();
        std::env::set_var("MOD_I18N_DATA_DIR", dir.path());
        std::env::set_var("MOD_I18N_LOCAL_ONLY", "true");
        std::env::set_var("MOD_I18N_MERGE_POLICY", "once");

        let config = Config::from_env().unwrap();
        assert_eq!(config.language.code(), "ja");
        assert!(config.local_only);
        assert_eq!(config.merge_policy, MergePolicy::Once);

        std::env::set_var("MOD_I18N_LANGUAGE", "Polish");
        let config = Config::from_env().unwrap();
        assert_eq!(config.language.code(), "pl");
        clear_env();
    }

    #[test]
    #[serial]
    fn test_from_env_unknown_language_fails() {
        clear_env();
        let dir = tempfile::tempdir().unwrap();
        std::env::set_var("MOD_I18N_DATA_DIR", dir.path());
        std::env::set_var("MOD_I18N_LANGUAGE", "Klingon");

        let err = Config::from_env().unwrap_err();
        assert!(format!("{:#}", err).contains("Klingon"));
        clear_env();
    }

    #[test]
    #[serial]
    fn test_from_env_invalid_policy_fails() {
        clear_env();
        std::env::set_var("MOD_I18N_MERGE_POLICY", "sometimes");
        assert!(Config::from_env().is_err());
        clear_env();
    }
}
