//! Extension discovery: exports per-namespace templates and registers
//! allow-listed namespaces once every extension has loaded.
//!
//! Each namespace is handled at most once per pass. A failure while
//! exporting or registering one namespace is logged and recorded in the
//! report; the walk carries on with the next one.

use crate::codec::TranslationMap;
use crate::error::{I18nError, Result};
use crate::gate::NamespaceAllowList;
use crate::inventory;
use crate::repository::TextRepository;
use crate::template;
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info, warn};

/// A type contributed by an extension, as reported by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredType {
    /// Owning namespace; `None` for types declared outside any namespace.
    pub namespace: Option<String>,
    pub full_name: String,
}

impl DiscoveredType {
    pub fn new(namespace: Option<&str>, full_name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.map(str::to_string),
            full_name: full_name.into(),
        }
    }
}

/// A loaded extension and the types it brought in.
#[derive(Debug, Clone)]
pub struct Extension {
    pub title: String,
    pub active: bool,
    pub types: Vec<DiscoveredType>,
}

/// Host capabilities needed during discovery, on top of its string table.
pub trait ExtensionHost: TextRepository {
    /// Make the strings declared by `ty` eligible for translation.
    fn register_for_translation(&mut self, ty: &DiscoveredType) -> Result<()>;
}

/// Inputs shared by every namespace in one discovery pass.
#[derive(Debug, Clone, Copy)]
pub struct DiscoveryContext<'a> {
    pub allow_list: &'a NamespaceAllowList,
    pub baseline: &'a TranslationMap,
    pub exclusions: &'a [String],
    pub templates_dir: &'a Path,
    /// Title of the engine's own extension, which is never walked.
    pub self_title: &'a str,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoveryReport {
    /// Namespaces a template was written for.
    pub exported: Vec<String>,
    /// Namespaces registered for translation.
    pub registered: Vec<String>,
    /// `(namespace or type name, error)` for every isolated failure.
    pub failures: Vec<(String, String)>,
}

/// Walk `extensions` once, exporting and registering namespaces on `host`.
///
/// `after_register` runs after each successful registration, where the host
/// would run its own post-registration callbacks.
pub fn discover<H, F>(
    extensions: &[Extension],
    host: &mut H,
    ctx: &DiscoveryContext<'_>,
    mut after_register: F,
) -> DiscoveryReport
where
    H: ExtensionHost + ?Sized,
    F: FnMut(&mut H),
{
    let mut report = DiscoveryReport::default();
    // One snapshot per pass; each namespace takes its slice of it.
    let snapshot = inventory::collect_all(&*host, ctx.baseline, ctx.exclusions);
    // Namespaces already seen in this pass, including the empty namespace.
    let mut seen: HashSet<Option<String>> = HashSet::new();

    for extension in extensions {
        if extension.title == ctx.self_title {
            continue;
        }
        if !extension.active {
            debug!("Skipping inactive extension {}", extension.title);
            continue;
        }

        for ty in &extension.types {
            if !seen.insert(ty.namespace.clone()) {
                continue;
            }

            match export_namespace(&snapshot, ty, ctx) {
                Ok(true) => {
                    if let Some(ns) = &ty.namespace {
                        info!("Exported namespace [{}] {}", extension.title, ns);
                        report.exported.push(ns.clone());
                    }
                }
                Ok(false) => {}
                Err(e) => {
                    warn!("Error exporting [{}] {}: {}", extension.title, ty.full_name, e);
                    report.failures.push((failure_label(ty), e.to_string()));
                }
            }

            if !ctx.allow_list.is_allowed(ty.namespace.as_deref()) {
                continue;
            }
            match host.register_for_translation(ty) {
                Ok(()) => {
                    let ns = ty.namespace.clone().unwrap_or_default();
                    info!("Registered namespace [{}] {}", extension.title, ns);
                    report.registered.push(ns);
                    after_register(host);
                }
                Err(e) => {
                    warn!("Error registering [{}] {}: {}", extension.title, ty.full_name, e);
                    report.failures.push((failure_label(ty), e.to_string()));
                }
            }
        }
    }

    report
}

/// Write the template for `ty`'s namespace. Returns whether a file was written.
fn export_namespace(snapshot: &[(String, String)], ty: &DiscoveredType, ctx: &DiscoveryContext<'_>) -> Result<bool> {
    let Some(namespace) = ty.namespace.as_deref() else {
        debug!("Type {} has no namespace, nothing to export", ty.full_name);
        return Ok(false);
    };
    if namespace.trim().is_empty() {
        return Err(I18nError::HostAccess {
            namespace: namespace.to_string(),
            reason: format!("type {} reports a blank namespace", ty.full_name),
        });
    }

    let entries = inventory::namespace_entries(snapshot, namespace);
    if entries.is_empty() {
        debug!("Namespace {} has no strings, no template written", namespace);
        return Ok(false);
    }
    let path = template::namespace_template_path(ctx.templates_dir, namespace);
    template::emit_template(entries, &path)?;
    Ok(true)
}

fn failure_label(ty: &DiscoveredType) -> String {
    ty.namespace.clone().unwrap_or_else(|| ty.full_name.clone())
}
