//! Incremental loader: owns the process translation cache and pushes it into
//! the host's text repository.
//!
//! # Lifecycle
//!
//! `Uninitialized -> CacheReady -> (Merged | PartiallyMerged)*`
//!
//! The cache is filled at most once per run and never torn down. Everything
//! runs on the host's controlling thread; the hazard is re-entrancy (a host
//! callback asking for a merge while one is in progress), which the state and
//! the shared-table checks cover without locking.
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | No translation file | Language not translated yet | Empty cache, warning |
//! | Malformed file | Broken `.po` | `initialize` fails, state unchanged |
//! | Merge before init | Host hook fired early | Skipped, nothing written |
//! | Merge into the cache | Host passed the cache back | Skipped, nothing written |

use crate::codec::{self, DocumentKind, TranslationMap};
use crate::config::Config;
use crate::error::{I18nError, Result};
use crate::i18n::{Language, MergeMetrics};
use crate::repository::{SharedMap, TextRepository};
use std::cell::RefCell;
use std::fs;
use std::path::PathBuf;
use std::rc::Rc;
use std::str::FromStr;
use std::time::Instant;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoaderState {
    Uninitialized,
    CacheReady,
    /// Only prefix merges have run so far.
    PartiallyMerged,
    /// At least one full merge has run.
    Merged,
}

/// Whether repeated full merges are performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MergePolicy {
    /// Merge on every request. Repeats are idempotent.
    #[default]
    Always,
    /// Skip host registration merges once a full merge has completed.
    Once,
}

impl FromStr for MergePolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "always" => Ok(Self::Always),
            "once" => Ok(Self::Once),
            other => anyhow::bail!("unknown merge policy '{}', expected 'always' or 'once'", other),
        }
    }
}

/// Why a full merge is requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeReason {
    /// The engine's own load sequence.
    Bootstrap,
    /// The host registered a string class for translation.
    Registration,
    /// Registration raised by the engine itself while walking extensions;
    /// the single merge at the end of discovery covers it.
    ExtensionDiscovery,
    /// The host is about to load a content category.
    CategoryLoad,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipCause {
    NotInitialized,
    AlreadyMerged,
    DuringDiscovery,
    /// Target is the cache itself.
    SameTable,
    /// Target table is borrowed elsewhere.
    Busy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    Applied { entries: usize },
    Skipped(SkipCause),
}

impl MergeOutcome {
    pub fn entries(&self) -> usize {
        match self {
            Self::Applied { entries } => *entries,
            Self::Skipped(_) => 0,
        }
    }
}

pub struct Loader {
    translation_file: PathBuf,
    language: Language,
    local_only: bool,
    policy: MergePolicy,
    cache: Option<SharedMap>,
    state: LoaderState,
    metrics: MergeMetrics,
}

impl Loader {
    pub fn new(config: &Config) -> Self {
        Self {
            translation_file: config.translation_file(),
            language: config.language,
            local_only: config.local_only,
            policy: config.merge_policy,
            cache: None,
            state: LoaderState::Uninitialized,
            metrics: MergeMetrics::new(),
        }
    }

    pub fn state(&self) -> LoaderState {
        self.state
    }

    pub fn metrics(&self) -> &MergeMetrics {
        &self.metrics
    }

    /// Handle to the cache, for hosts that keep their own reference to it.
    pub fn cache_handle(&self) -> Option<SharedMap> {
        self.cache.clone()
    }

    /// Number of cached translations (zero before initialization).
    pub fn cached_len(&self) -> usize {
        self.cache.as_ref().map_or(0, |cache| cache.borrow().len())
    }

    /// Cached translation for `key`.
    pub fn lookup(&self, key: &str) -> Option<String> {
        self.cache
            .as_ref()
            .and_then(|cache| cache.borrow().get(key).cloned())
    }

    /// Fill the cache from the preferred language's translation file.
    ///
    /// A second call is a no-op. A missing file leaves an empty cache; any
    /// other failure is returned and the loader stays uninitialized.
    pub fn initialize(&mut self) -> Result<()> {
        if self.state != LoaderState::Uninitialized {
            info!("Translations have already been initialized");
            return Ok(());
        }
        let started = Instant::now();
        info!(
            "Loading {} ({}) translations (local only: {})",
            self.language.name(),
            self.language.native_name(),
            self.local_only
        );
        if self.language.is_canonical() {
            info!("{} is the host's own language, only overrides will apply", self.language.name());
        }

        if let Some(dir) = self.translation_file.parent() {
            fs::create_dir_all(dir).map_err(|e| I18nError::from_io(dir, e))?;
        }

        let map = match codec::decode(&self.translation_file, DocumentKind::Translation) {
            Ok(map) => {
                info!(
                    "Loaded {} translations from {}",
                    map.len(),
                    self.translation_file.display()
                );
                map
            }
            Err(e) if e.is_absent() => {
                warn!(
                    "No translation file at {}, running untranslated",
                    self.translation_file.display()
                );
                TranslationMap::new()
            }
            Err(e) => return Err(e),
        };

        self.cache = Some(Rc::new(RefCell::new(map)));
        self.state = LoaderState::CacheReady;
        debug!("Initialize took {:.3}s", started.elapsed().as_secs_f64());
        Ok(())
    }

    /// Copy every cached translation into `repo`, overwriting existing text.
    ///
    /// Keys not in the cache are left alone, so repeating the merge yields the
    /// same repository.
    pub fn merge_all<R>(&mut self, repo: &mut R, reason: MergeReason) -> MergeOutcome
    where
        R: TextRepository + ?Sized,
    {
        let Some(cache) = self.cache.clone() else {
            debug!("Full merge ({:?}) requested before initialization", reason);
            return MergeOutcome::Skipped(SkipCause::NotInitialized);
        };
        if reason == MergeReason::ExtensionDiscovery {
            debug!("Full merge deferred until discovery completes");
            self.metrics.record_skipped_merge();
            return MergeOutcome::Skipped(SkipCause::DuringDiscovery);
        }
        // Only host registrations are gated; the engine's own loads always run.
        if self.policy == MergePolicy::Once
            && reason == MergeReason::Registration
            && self.state == LoaderState::Merged
        {
            debug!("Full merge ({:?}) skipped, already merged", reason);
            self.metrics.record_skipped_merge();
            return MergeOutcome::Skipped(SkipCause::AlreadyMerged);
        }
        if repo.shares_table(&cache) {
            debug!("Full merge ({:?}) skipped, target is the cache", reason);
            return MergeOutcome::Skipped(SkipCause::SameTable);
        }
        if repo.is_busy() {
            warn!("Target repository is in use, full merge ({:?}) skipped", reason);
            return MergeOutcome::Skipped(SkipCause::Busy);
        }

        let started = Instant::now();
        let cache = cache.borrow();
        for (key, text) in cache.iter() {
            repo.set(key, text);
        }
        let entries = cache.len();

        self.state = LoaderState::Merged;
        self.metrics.record_full_merge(entries);
        info!(
            "Merged {} translations ({:?}) in {:.3}s",
            entries,
            reason,
            started.elapsed().as_secs_f64()
        );
        MergeOutcome::Applied { entries }
    }

    /// Copy only cached translations whose key starts with `prefix`.
    pub fn merge_by_prefix<R>(&mut self, repo: &mut R, prefix: &str) -> MergeOutcome
    where
        R: TextRepository + ?Sized,
    {
        let Some(cache) = self.cache.clone() else {
            debug!("Merge of {} requested before initialization", prefix);
            return MergeOutcome::Skipped(SkipCause::NotInitialized);
        };
        if repo.shares_table(&cache) {
            return MergeOutcome::Skipped(SkipCause::SameTable);
        }
        if repo.is_busy() {
            warn!("Target repository is in use, merge of {} skipped", prefix);
            return MergeOutcome::Skipped(SkipCause::Busy);
        }

        let started = Instant::now();
        let mut entries = 0;
        for (key, text) in cache.borrow().iter() {
            if key.starts_with(prefix) {
                repo.set(key, text);
                entries += 1;
            }
        }

        if self.state == LoaderState::CacheReady {
            self.state = LoaderState::PartiallyMerged;
        }
        self.metrics.record_prefix_merge(entries);
        debug!(
            "Merged {} translations under {} in {:.3}s",
            entries,
            prefix,
            started.elapsed().as_secs_f64()
        );
        MergeOutcome::Applied { entries }
    }

    /// Copy the cache into a dictionary the host is about to overload its
    /// strings with. Does not count as a full merge.
    pub fn overlay(&self, target: &SharedMap) -> MergeOutcome {
        let Some(cache) = self.cache.as_ref() else {
            return MergeOutcome::Skipped(SkipCause::NotInitialized);
        };
        if Rc::ptr_eq(cache, target) {
            return MergeOutcome::Skipped(SkipCause::SameTable);
        }
        let Ok(mut dst) = target.try_borrow_mut() else {
            warn!("Host dictionary is in use, translations not overlaid");
            return MergeOutcome::Skipped(SkipCause::Busy);
        };

        let started = Instant::now();
        let src = cache.borrow();
        for (key, text) in src.iter() {
            dst.insert(key.clone(), text.clone());
        }
        self.metrics.record_overlay(src.len());
        debug!(
            "Overlaid {} translations in {:.3}s",
            src.len(),
            started.elapsed().as_secs_f64()
        );
        MergeOutcome::Applied { entries: src.len() }
    }

    /// Replace a loose entity's display name and description with cached
    /// food translations, if any.
    pub fn localize_loose_entity(&self, id: &str, name: &mut String, desc: &mut String) {
        let base = format!("STRINGS.ITEMS.FOOD.{}", id.to_uppercase());
        if let Some(text) = self.lookup(&format!("{base}.NAME")) {
            *name = text;
        }
        if let Some(text) = self.lookup(&format!("{base}.DESC")) {
            *desc = text;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::StringTable;
    use tempfile::TempDir;

    const SAMPLE_PO: &str = "msgid \"\"\nmsgstr \"\"\n\n\
        msgctxt \"STRINGS.BUILDINGS.DOOR.NAME\"\nmsgid \"Door\"\nmsgstr \"门\"\n\n\
        msgctxt \"STRINGS.ELEMENTS.WATER.NAME\"\nmsgid \"Water\"\nmsgstr \"水\"\n\n\
        msgctxt \"STRINGS.ITEMS.FOOD.MUSHBAR.NAME\"\nmsgid \"Mush Bar\"\nmsgstr \"泥浆棒\"\n";

    fn setup(po: Option<&str>) -> (TempDir, Loader) {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::for_data_dir(dir.path());
        if let Some(content) = po {
            fs::create_dir_all(config.i18n_dir()).unwrap();
            fs::write(config.translation_file(), content).unwrap();
        }
        let loader = Loader::new(&config);
        (dir, loader)
    }

    fn ready_loader() -> (TempDir, Loader) {
        let (dir, mut loader) = setup(Some(SAMPLE_PO));
        loader.initialize().unwrap();
        (dir, loader)
    }

    // ==================== Initialize Tests ====================

    #[test]
    fn test_initialize_loads_translation_file() {
        let (_dir, loader) = ready_loader();
        assert_eq!(loader.state(), LoaderState::CacheReady);
        assert_eq!(loader.cached_len(), 3);
        assert_eq!(loader.lookup("STRINGS.ELEMENTS.WATER.NAME").as_deref(), Some("水"));
    }

    #[test]
    fn test_initialize_missing_file_gives_empty_cache() {
        let (dir, mut loader) = setup(None);
        loader.initialize().unwrap();
        assert_eq!(loader.state(), LoaderState::CacheReady);
        assert_eq!(loader.cached_len(), 0);
        // The translation directory is created for the user to drop files in
        assert!(dir.path().join("i18n").is_dir());
    }

    #[test]
    fn test_initialize_twice_is_noop() {
        let (dir, mut loader) = ready_loader();
        let before = loader.cache_handle().unwrap().borrow().clone();

        // Changing the file afterwards must not change the cache
        let config = Config::for_data_dir(dir.path());
        fs::write(config.translation_file(), "msgctxt \"X\"\nmsgstr \"y\"\n").unwrap();
        loader.initialize().unwrap();

        assert_eq!(*loader.cache_handle().unwrap().borrow(), before);
    }

    #[test]
    fn test_initialize_malformed_file_fails() {
        let (_dir, mut loader) = setup(Some("msgctxt \"K\"\nmsgstr \"broken\n"));
        let err = loader.initialize().unwrap_err();
        assert!(matches!(err, I18nError::MalformedInput { .. }));
        assert_eq!(loader.state(), LoaderState::Uninitialized);
    }

    // ==================== Full Merge Tests ====================

    #[test]
    fn test_merge_all_overwrites_and_preserves() {
        let (_dir, mut loader) = ready_loader();
        let mut repo: StringTable = [
            ("STRINGS.BUILDINGS.DOOR.NAME", "Door"),
            ("STRINGS.UNTRANSLATED", "Keep me"),
        ]
        .into_iter()
        .collect();

        let outcome = loader.merge_all(&mut repo, MergeReason::Bootstrap);

        assert_eq!(outcome, MergeOutcome::Applied { entries: 3 });
        assert_eq!(repo.get("STRINGS.BUILDINGS.DOOR.NAME").as_deref(), Some("门"));
        assert_eq!(repo.get("STRINGS.ELEMENTS.WATER.NAME").as_deref(), Some("水"));
        assert_eq!(repo.get("STRINGS.UNTRANSLATED").as_deref(), Some("Keep me"));
        assert_eq!(loader.state(), LoaderState::Merged);
    }

    #[test]
    fn test_merge_all_is_idempotent() {
        let (_dir, mut loader) = ready_loader();
        let mut once: StringTable = [("A", "a")].into_iter().collect();
        loader.merge_all(&mut once, MergeReason::Bootstrap);
        let mut twice = once.clone();
        loader.merge_all(&mut twice, MergeReason::Registration);

        let mut keys = twice.all_keys();
        keys.sort();
        for key in keys {
            assert_eq!(once.get(&key), twice.get(&key));
        }
        assert_eq!(loader.metrics().full_merges(), 2);
    }

    #[test]
    fn test_merge_all_before_initialize_is_skipped() {
        let (_dir, mut loader) = setup(Some(SAMPLE_PO));
        let mut repo = StringTable::new();
        let outcome = loader.merge_all(&mut repo, MergeReason::Registration);
        assert_eq!(outcome, MergeOutcome::Skipped(SkipCause::NotInitialized));
        assert!(repo.is_empty());
    }

    #[test]
    fn test_merge_all_into_cache_is_skipped() {
        let (_dir, mut loader) = ready_loader();
        let mut cache = loader.cache_handle().unwrap();
        let before = cache.borrow().clone();

        let outcome = loader.merge_all(&mut cache, MergeReason::Registration);

        assert_eq!(outcome, MergeOutcome::Skipped(SkipCause::SameTable));
        assert_eq!(*cache.borrow(), before);
    }

    #[test]
    fn test_merge_all_during_discovery_is_deferred() {
        let (_dir, mut loader) = ready_loader();
        let mut repo = StringTable::new();
        let outcome = loader.merge_all(&mut repo, MergeReason::ExtensionDiscovery);
        assert_eq!(outcome, MergeOutcome::Skipped(SkipCause::DuringDiscovery));
        assert!(repo.is_empty());
        assert_eq!(loader.state(), LoaderState::CacheReady);
    }

    #[test]
    fn test_merge_policy_once_skips_repeat() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::for_data_dir(dir.path());
        config.merge_policy = MergePolicy::Once;
        fs::create_dir_all(config.i18n_dir()).unwrap();
        fs::write(config.translation_file(), SAMPLE_PO).unwrap();
        let mut loader = Loader::new(&config);
        loader.initialize().unwrap();

        let mut repo = StringTable::new();
        assert_eq!(loader.merge_all(&mut repo, MergeReason::Bootstrap).entries(), 3);
        assert_eq!(
            loader.merge_all(&mut repo, MergeReason::Registration),
            MergeOutcome::Skipped(SkipCause::AlreadyMerged)
        );
        assert_eq!(loader.metrics().skipped_merges(), 1);
    }

    #[test]
    fn test_merge_policy_once_still_runs_engine_loads() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::for_data_dir(dir.path());
        config.merge_policy = MergePolicy::Once;
        fs::create_dir_all(config.i18n_dir()).unwrap();
        fs::write(config.translation_file(), SAMPLE_PO).unwrap();
        let mut loader = Loader::new(&config);
        loader.initialize().unwrap();

        let mut repo = StringTable::new();
        loader.merge_all(&mut repo, MergeReason::Bootstrap);

        // The host put source text back; only the engine's own loads restore it
        repo.set("STRINGS.BUILDINGS.DOOR.NAME", "Door");
        assert!(matches!(
            loader.merge_all(&mut repo, MergeReason::Registration),
            MergeOutcome::Skipped(SkipCause::AlreadyMerged)
        ));
        assert_eq!(repo.get("STRINGS.BUILDINGS.DOOR.NAME").as_deref(), Some("Door"));

        assert_eq!(loader.merge_all(&mut repo, MergeReason::Bootstrap).entries(), 3);
        assert_eq!(repo.get("STRINGS.BUILDINGS.DOOR.NAME").as_deref(), Some("门"));
        assert_eq!(loader.merge_all(&mut repo, MergeReason::CategoryLoad).entries(), 3);
    }

    #[test]
    fn test_merge_all_into_borrowed_map_is_busy() {
        let (_dir, mut loader) = ready_loader();
        let host: SharedMap = Rc::new(RefCell::new(TranslationMap::new()));
        let _reader = host.borrow();

        let mut target = Rc::clone(&host);
        assert_eq!(
            loader.merge_all(&mut target, MergeReason::Registration),
            MergeOutcome::Skipped(SkipCause::Busy)
        );
        assert_eq!(
            loader.merge_by_prefix(&mut target, "STRINGS.ELEMENTS."),
            MergeOutcome::Skipped(SkipCause::Busy)
        );
        assert_eq!(loader.state(), LoaderState::CacheReady);
    }

    // ==================== Prefix Merge Tests ====================

    #[test]
    fn test_merge_by_prefix_only_touches_prefix() {
        let (_dir, mut loader) = ready_loader();
        let mut repo = StringTable::new();

        let outcome = loader.merge_by_prefix(&mut repo, "STRINGS.BUILDINGS.");

        assert_eq!(outcome, MergeOutcome::Applied { entries: 1 });
        assert_eq!(repo.get("STRINGS.BUILDINGS.DOOR.NAME").as_deref(), Some("门"));
        assert!(repo.get("STRINGS.ELEMENTS.WATER.NAME").is_none());
        assert_eq!(loader.state(), LoaderState::PartiallyMerged);
    }

    #[test]
    fn test_merge_by_prefix_keeps_merged_state() {
        let (_dir, mut loader) = ready_loader();
        let mut repo = StringTable::new();
        loader.merge_all(&mut repo, MergeReason::Bootstrap);
        loader.merge_by_prefix(&mut repo, "STRINGS.ELEMENTS.");
        assert_eq!(loader.state(), LoaderState::Merged);
    }

    #[test]
    fn test_merge_by_prefix_before_initialize_is_skipped() {
        let (_dir, mut loader) = setup(None);
        let mut repo = StringTable::new();
        assert_eq!(
            loader.merge_by_prefix(&mut repo, "STRINGS."),
            MergeOutcome::Skipped(SkipCause::NotInitialized)
        );
    }

    #[test]
    fn test_merge_by_prefix_into_cache_is_skipped() {
        let (_dir, mut loader) = ready_loader();
        let mut cache = loader.cache_handle().unwrap();
        assert_eq!(
            loader.merge_by_prefix(&mut cache, "STRINGS."),
            MergeOutcome::Skipped(SkipCause::SameTable)
        );
        assert_eq!(cache.borrow().len(), 3);
        assert_eq!(loader.state(), LoaderState::CacheReady);
    }

    // ==================== Overlay Tests ====================

    #[test]
    fn test_overlay_copies_into_host_dictionary() {
        let (_dir, loader) = ready_loader();
        let host: SharedMap = Rc::new(RefCell::new(TranslationMap::new()));
        host.borrow_mut()
            .insert("STRINGS.OTHER".to_string(), "other".to_string());

        let outcome = loader.overlay(&host);

        assert_eq!(outcome.entries(), 3);
        assert_eq!(host.borrow().len(), 4);
        assert_eq!(host.borrow()["STRINGS.ELEMENTS.WATER.NAME"], "水");
    }

    #[test]
    fn test_overlay_onto_cache_is_skipped() {
        let (_dir, loader) = ready_loader();
        let cache = loader.cache_handle().unwrap();
        assert_eq!(loader.overlay(&cache), MergeOutcome::Skipped(SkipCause::SameTable));
        assert_eq!(cache.borrow().len(), 3);
    }

    #[test]
    fn test_overlay_busy_dictionary_is_skipped() {
        let (_dir, loader) = ready_loader();
        let host: SharedMap = Rc::new(RefCell::new(TranslationMap::new()));
        let _guard = host.borrow();
        assert_eq!(loader.overlay(&host), MergeOutcome::Skipped(SkipCause::Busy));
    }

    // ==================== Loose Entity Tests ====================

    #[test]
    fn test_localize_loose_entity_replaces_known_food() {
        let (_dir, loader) = ready_loader();
        let mut name = "Mush Bar".to_string();
        let mut desc = "Gross".to_string();
        loader.localize_loose_entity("MushBar", &mut name, &mut desc);
        assert_eq!(name, "泥浆棒");
        assert_eq!(desc, "Gross");
    }

    #[test]
    fn test_localize_loose_entity_replaces_description() {
        let po = "msgctxt \"STRINGS.ITEMS.FOOD.MUSHBAR.NAME\"\nmsgstr \"泥浆棒\"\n\n\
                  msgctxt \"STRINGS.ITEMS.FOOD.MUSHBAR.DESC\"\nmsgstr \"难吃\"\n";
        let (_dir, mut loader) = setup(Some(po));
        loader.initialize().unwrap();

        let mut name = "Mush Bar".to_string();
        let mut desc = "Gross".to_string();
        loader.localize_loose_entity("mushbar", &mut name, &mut desc);
        assert_eq!(name, "泥浆棒");
        assert_eq!(desc, "难吃");
    }

    #[test]
    fn test_localize_loose_entity_before_initialize_keeps_values() {
        let (_dir, loader) = setup(Some(SAMPLE_PO));
        let mut name = "Mush Bar".to_string();
        let mut desc = "Gross".to_string();
        loader.localize_loose_entity("MushBar", &mut name, &mut desc);
        assert_eq!(name, "Mush Bar");
    }

    // ==================== Policy Parsing Tests ====================

    #[test]
    fn test_merge_policy_from_str() {
        assert_eq!("always".parse::<MergePolicy>().unwrap(), MergePolicy::Always);
        assert_eq!(" ONCE ".parse::<MergePolicy>().unwrap(), MergePolicy::Once);
        assert!("never".parse::<MergePolicy>().is_err());
    }
}
