//! Template emitter: writes inventory output to `.pot` files.

use crate::codec;
use crate::error::{I18nError, Result};
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::debug;

/// File name of the aggregate template covering every extension.
pub const AGGREGATE_TEMPLATE: &str = "curr_mods_templates.pot";

/// Path of the per-namespace template inside `dir`.
///
/// Names are lowercased so that they line up with allow-list entries, which
/// may be written as the template file name.
pub fn namespace_template_path(dir: &Path, namespace: &str) -> PathBuf {
    dir.join(format!(
        "{}{}",
        namespace.to_lowercase(),
        crate::gate::TEMPLATE_SUFFIX
    ))
}

/// Write `entries` to `path`, replacing any previous content.
///
/// Parent directories are created as needed.
pub fn emit_template(entries: &[(String, String)], path: &Path) -> Result<()> {
    let started = Instant::now();

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| I18nError::from_io(parent, e))?;
    }
    let file = File::create(path).map_err(|e| I18nError::from_io(path, e))?;
    codec::encode(entries, BufWriter::new(file)).map_err(|e| I18nError::from_io(path, e))?;

    debug!(
        "Wrote {} entries to {} in {:.3}s",
        entries.len(),
        path.display(),
        started.elapsed().as_secs_f64()
    );
    Ok(())
}
