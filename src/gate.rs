//! Namespace gate: which dynamically discovered namespaces may take part in
//! translation merges.
//!
//! The allow-list is read once, after every extension has loaded. Without a
//! list nothing is allowed.

use crate::error::{I18nError, Result};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

/// Suffix of per-namespace template files; list entries may name the file.
pub const TEMPLATE_SUFFIX: &str = "_template.pot";

/// Immutable set of lowercase namespace names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NamespaceAllowList {
    names: HashSet<String>,
}

impl NamespaceAllowList {
    /// Read the allow-list at `path`.
    ///
    /// One namespace per line; blank lines and `#` comments are skipped, names
    /// are trimmed and lowercased, and a trailing [`TEMPLATE_SUFFIX`] is
    /// removed. A missing file yields an empty list.
    pub fn load(path: &Path) -> Result<Self> {
        match fs::read_to_string(path) {
            Ok(content) => {
                let list = Self::parse(&content);
                debug!("Loaded {} allowed namespaces from {}", list.len(), path.display());
                Ok(list)
            }
            Err(e) => {
                let err = I18nError::from_io(path, e);
                if err.is_absent() {
                    warn!(
                        "Allow-list {} does not exist, no namespace will be registered",
                        path.display()
                    );
                    Ok(Self::default())
                } else {
                    Err(err)
                }
            }
        }
    }

    /// Parse allow-list content already in memory.
    pub fn parse(content: &str) -> Self {
        let names = content
            .lines()
            .map(|line| line.trim().to_lowercase())
            .filter(|name| !name.is_empty() && !name.starts_with('#'))
            .map(|name| match name.strip_suffix(TEMPLATE_SUFFIX) {
                Some(stripped) => stripped.to_string(),
                None => name,
            })
            .inspect(|name| debug!("Allowing namespace {}", name))
            .collect();
        Self { names }
    }

    /// Case-insensitive membership. A namespace-less type is never allowed.
    pub fn is_allowed(&self, namespace: Option<&str>) -> bool {
        match namespace {
            Some(ns) => self.names.contains(&ns.to_lowercase()),
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for NamespaceAllowList {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            names: iter.into_iter().map(|s| s.into().to_lowercase()).collect(),
        }
    }
}
