//! Key-space inventory: which repository entries belong in a template.
//!
//! Stock content (anything already in the host's own baseline template) and
//! the engine's own namespaces are left out, so an exported template only
//! carries text contributed by extensions.

use crate::codec::{self, DocumentKind, TranslationMap};
use crate::error::Result;
use crate::repository::TextRepository;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, warn};

/// Key prefixes owned by the engine and its support library.
pub const ENGINE_PREFIXES: [&str; 2] = ["PeterHan.PLib.", "ModI18n."];

/// Load the host's default-language export.
///
/// A missing baseline is not fatal: every key is then treated as new content.
pub fn load_baseline(path: &Path) -> Result<TranslationMap> {
    match codec::decode(path, DocumentKind::Template) {
        Ok(map) => Ok(map),
        Err(e) if e.is_absent() => {
            warn!(
                "Baseline template not found at {}, exporting every repository key",
                path.display()
            );
            Ok(TranslationMap::new())
        }
        Err(e) => Err(e),
    }
}

/// Sorted `(key, text)` pairs for every eligible repository entry.
///
/// A key is eligible when it is absent from `baseline`, does not start with
/// any of `exclusions`, and has non-empty text. Read-only on `repo`.
pub fn collect_all<R>(repo: &R, baseline: &TranslationMap, exclusions: &[String]) -> Vec<(String, String)>
where
    R: TextRepository + ?Sized,
{
    let started = Instant::now();

    let mut keys = repo.all_keys();
    keys.sort_unstable();
    keys.dedup();
    let total = keys.len();

    let collected: Vec<(String, String)> = keys
        .into_iter()
        .filter(|key| !baseline.contains_key(key.as_str()))
        .filter(|key| !exclusions.iter().any(|prefix| key.starts_with(prefix.as_str())))
        .filter_map(|key| match repo.get(&key) {
            Some(text) if !text.is_empty() => Some((key, text)),
            _ => None,
        })
        .collect();

    debug!(
        "Inventory kept {} of {} keys in {:.3}s",
        collected.len(),
        total,
        started.elapsed().as_secs_f64()
    );
    collected
}

/// Entries of a sorted inventory owned by `namespace` (keys starting with
/// `"<namespace>."`). Owned keys sort next to each other, so this is a
/// sub-slice found by binary search.
pub fn namespace_entries<'a>(inventory: &'a [(String, String)], namespace: &str) -> &'a [(String, String)] {
    let prefix = format!("{namespace}.");
    let start = inventory.partition_point(|(key, _)| key.as_str() < prefix.as_str());
    let len = inventory[start..].partition_point(|(key, _)| key.starts_with(&prefix));
    &inventory[start..start + len]
}

/// [`collect_all`] with the baseline read from the template at `baseline_path`.
pub fn collect_with_baseline_file<R>(
    repo: &R,
    baseline_path: &Path,
    exclusions: &[String],
) -> Result<Vec<(String, String)>>
where
    R: TextRepository + ?Sized,
{
    let baseline = load_baseline(baseline_path)?;
    Ok(collect_all(repo, &baseline, exclusions))
}

/// [`ENGINE_PREFIXES`] as owned strings, the default exclusion set.
pub fn default_exclusions() -> Vec<String> {
    ENGINE_PREFIXES.iter().map(|p| p.to_string()).collect()
}
