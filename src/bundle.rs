//! Bundle exported templates into a single translation file.
//!
//! Translators work on one `.po` per language. This concatenates every `.pot`
//! in a directory behind a hand-written header, dropping the standard header
//! each template starts with so it does not appear more than once.

use crate::codec::{HEADER_APPLICATION, HEADER_POT_VERSION};
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// The four lines every exported template starts with.
const POT_HEADER: [&str; 4] = ["msgid \"\"", "msgstr \"\"", HEADER_APPLICATION, HEADER_POT_VERSION];

/// Remove the standard template header, if present. Comparison ignores
/// surrounding whitespace and line endings.
pub fn strip_pot_header(content: &str) -> &str {
    let mut rest = content;
    for expected in POT_HEADER {
        let (line, tail) = match rest.find('\n') {
            Some(pos) => (&rest[..pos], &rest[pos + 1..]),
            None => (rest, ""),
        };
        if line.trim() != expected {
            return content;
        }
        rest = tail;
    }
    rest
}

/// Concatenate every `.pot` file in `dir` into `output`, behind the header
/// read from `header_file`. Files are taken in name order. Returns the
/// templates that were bundled.
pub fn merge_templates(dir: &Path, header_file: &Path, output: &Path) -> Result<Vec<PathBuf>> {
    let header = fs::read_to_string(header_file)
        .with_context(|| format!("Failed to read header {}", header_file.display()))?;

    let mut templates: Vec<PathBuf> = fs::read_dir(dir)
        .with_context(|| format!("Failed to list {}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "pot"))
        .collect();
    templates.sort();

    let mut bundled = header;
    bundled.push('\n');
    for path in &templates {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read template {}", path.display()))?;
        let body = strip_pot_header(&content);
        if body.len() == content.len() {
            debug!("{} has no standard header, kept as is", path.display());
        }
        bundled.push_str(body);
        bundled.push('\n');
    }

    fs::write(output, bundled).with_context(|| format!("Failed to write {}", output.display()))?;
    info!("Bundled {} templates into {}", templates.len(), output.display());
    Ok(templates)
}
