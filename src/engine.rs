//! Engine: the callbacks the host invokes at its lifecycle checkpoints.
//!
//! The host owns the schedule. It calls [`Engine::bindings`] once to learn
//! which checkpoints the engine wants and in what order relative to other
//! callbacks, then invokes the matching `on_*` method each time a checkpoint
//! fires. All calls happen on the host's controlling thread.

use crate::codec::TranslationMap;
use crate::config::Config;
use crate::discovery::{self, DiscoveryContext, DiscoveryReport, Extension, ExtensionHost};
use crate::gate::NamespaceAllowList;
use crate::inventory;
use crate::loader::{Loader, MergeOutcome, MergeReason};
use crate::repository::{SharedMap, TextRepository};
use crate::template;
use anyhow::{Context, Result};
use std::time::Instant;
use tracing::{debug, info, warn};

/// A category of content the host loads lazily.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentCategory {
    /// Element definitions (substance list hookup).
    Elements,
    /// Building definitions, from the plan screen or generated buildings.
    Buildings,
    /// Generated entities; needs every string.
    Entities,
}

impl ContentCategory {
    /// Key prefix whose translations must be live before the category loads,
    /// or `None` when a full load is required.
    pub fn key_prefix(&self) -> Option<&'static str> {
        match self {
            Self::Elements => Some("STRINGS.ELEMENTS."),
            Self::Buildings => Some("STRINGS.BUILDINGS."),
            Self::Entities => None,
        }
    }
}

/// Host checkpoints the engine attaches to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookPoint {
    /// The host finished its own localization bootstrap.
    LocalizationInitialized,
    /// The host finished loading legacy extensions.
    LegacyLoadFinished,
    /// The host registered a string class for translation.
    RegisterForTranslation,
    /// The host is about to overload its strings with a dictionary.
    OverloadStrings,
    /// The host is about to load a content category.
    BeforeCategoryLoad(ContentCategory),
    /// The host is about to create a loose entity.
    CreateLooseEntity,
    /// Every extension has loaded.
    AllExtensionsLoaded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookPriority {
    /// Run before every other callback at the same point.
    First,
    /// Run after every other callback at the same point.
    Last,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HookBinding {
    pub point: HookPoint,
    pub priority: HookPriority,
}

pub struct Engine {
    config: Config,
    loader: Loader,
}

impl Engine {
    pub fn new(config: Config) -> Self {
        let loader = Loader::new(&config);
        Self { config, loader }
    }

    pub fn from_env() -> Result<Self> {
        let config = Config::from_env().context("Failed to load translation settings")?;
        Ok(Self::new(config))
    }

    /// Checkpoints the engine listens on.
    ///
    /// The localization bootstrap runs first so the cache exists before any
    /// other extension reacts to it; every other callback runs last so it sees
    /// strings added by other extensions.
    pub fn bindings() -> Vec<HookBinding> {
        use HookPoint::*;
        let first = |point| HookBinding {
            point,
            priority: HookPriority::First,
        };
        let last = |point| HookBinding {
            point,
            priority: HookPriority::Last,
        };
        vec![
            first(LocalizationInitialized),
            last(LegacyLoadFinished),
            last(RegisterForTranslation),
            last(OverloadStrings),
            last(BeforeCategoryLoad(ContentCategory::Elements)),
            last(BeforeCategoryLoad(ContentCategory::Buildings)),
            last(BeforeCategoryLoad(ContentCategory::Entities)),
            last(CreateLooseEntity),
            last(AllExtensionsLoaded),
        ]
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn loader(&self) -> &Loader {
        &self.loader
    }

    pub fn on_localization_initialized(&mut self) -> Result<()> {
        self.initialize()
    }

    /// Initialize the cache and merge it fully into `repo`.
    pub fn load_strings<R>(&mut self, repo: &mut R, reason: MergeReason) -> Result<MergeOutcome>
    where
        R: TextRepository + ?Sized,
    {
        let started = Instant::now();
        self.initialize()?;
        let outcome = self.loader.merge_all(repo, reason);
        debug!("Load strings took {:.3}s", started.elapsed().as_secs_f64());
        Ok(outcome)
    }

    /// Full load, then export every eligible string to the aggregate template.
    pub fn on_legacy_load_finished<R>(&mut self, repo: &mut R) -> Result<()>
    where
        R: TextRepository + ?Sized,
    {
        let started = Instant::now();
        self.load_strings(repo, MergeReason::Bootstrap)?;
        self.export_aggregate_template(repo)?;
        info!(
            "Legacy load checkpoint took {:.3}s",
            started.elapsed().as_secs_f64()
        );
        Ok(())
    }

    /// Write every eligible repository string to the aggregate template.
    /// Returns the number of entries written.
    pub fn export_aggregate_template<R>(&self, repo: &R) -> Result<usize>
    where
        R: TextRepository + ?Sized,
    {
        let entries = inventory::collect_with_baseline_file(
            repo,
            &self.config.baseline_template,
            &self.config.excluded_prefixes,
        )
        .context("Failed to read the baseline template")?;

        let path = self.config.aggregate_template();
        template::emit_template(&entries, &path)
            .with_context(|| format!("Failed to write template {}", path.display()))?;
        self.loader.metrics().record_template();
        info!("Exported {} strings to {}", entries.len(), path.display());
        Ok(entries.len())
    }

    /// The host registered strings for translation on its own.
    pub fn on_register_for_translation<R>(&mut self, repo: &mut R) -> MergeOutcome
    where
        R: TextRepository + ?Sized,
    {
        self.loader.merge_all(repo, MergeReason::Registration)
    }

    /// The host is about to overload its strings with `translated`.
    pub fn on_overload_strings(&self, translated: &SharedMap) -> MergeOutcome {
        self.loader.overlay(translated)
    }

    /// Make the translations a content category needs live before it loads.
    pub fn on_before_category_load<R>(&mut self, category: ContentCategory, repo: &mut R) -> Result<MergeOutcome>
    where
        R: TextRepository + ?Sized,
    {
        match category.key_prefix() {
            Some(prefix) => Ok(self.loader.merge_by_prefix(repo, prefix)),
            None => self.load_strings(repo, MergeReason::CategoryLoad),
        }
    }

    pub fn on_create_loose_entity(&self, id: &str, name: &mut String, desc: &mut String) {
        self.loader.localize_loose_entity(id, name, desc);
    }

    /// Export per-namespace templates, register allow-listed namespaces, then
    /// run one full load.
    pub fn on_all_extensions_loaded<H>(&mut self, extensions: &[Extension], host: &mut H) -> Result<DiscoveryReport>
    where
        H: ExtensionHost + ?Sized,
    {
        let started = Instant::now();
        info!("Discovering strings of {} extensions", extensions.len());

        let allow_list_path = self.config.allow_list_file();
        let allow_list = NamespaceAllowList::load(&allow_list_path).unwrap_or_else(|e| {
            warn!("Failed to read allow-list {}: {}", allow_list_path.display(), e);
            NamespaceAllowList::default()
        });
        let baseline = inventory::load_baseline(&self.config.baseline_template).unwrap_or_else(|e| {
            warn!("Failed to read baseline template: {}", e);
            TranslationMap::new()
        });
        let templates_dir = self.config.engine_templates_dir();

        let ctx = DiscoveryContext {
            allow_list: &allow_list,
            baseline: &baseline,
            exclusions: &self.config.excluded_prefixes,
            templates_dir: &templates_dir,
            self_title: &self.config.self_title,
        };
        let loader = &mut self.loader;
        let report = discovery::discover(extensions, host, &ctx, |host| {
            loader.merge_all(host, MergeReason::ExtensionDiscovery);
        });

        for _ in &report.exported {
            self.loader.metrics().record_template();
        }
        for _ in &report.failures {
            self.loader.metrics().record_namespace_failure();
        }

        self.load_strings(host, MergeReason::Bootstrap)?;

        match serde_json::to_string(&self.loader.metrics().report()) {
            Ok(json) => info!("Translation metrics: {}", json),
            Err(e) => debug!("Failed to serialize metrics: {}", e),
        }
        info!(
            "Extension discovery took {:.3}s ({} exported, {} registered, {} failed)",
            started.elapsed().as_secs_f64(),
            report.exported.len(),
            report.registered.len(),
            report.failures.len()
        );
        Ok(report)
    }

    fn initialize(&mut self) -> Result<()> {
        let path = self.config.translation_file();
        self.loader
            .initialize()
            .with_context(|| format!("Failed to load translations from {}", path.display()))
    }
}
