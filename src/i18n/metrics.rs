//! Merge metrics: counters for what the overlay actually did this run.
//!
//! One instance lives inside the loader for the whole process run, so the
//! counters describe the same lifetime as the translation cache.

use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug, Default)]
pub struct MergeMetrics {
    /// Full merges of the cache into a repository
    full_merges: AtomicUsize,

    /// Merges restricted to a key prefix
    prefix_merges: AtomicUsize,

    /// Full merges skipped by the merge policy or the merge reason
    skipped_merges: AtomicUsize,

    /// Individual entries written into a repository or host dictionary
    entries_written: AtomicUsize,

    /// Template files written
    templates_emitted: AtomicUsize,

    /// Namespaces whose export or registration failed
    namespace_failures: AtomicUsize,
}

impl MergeMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a full merge that wrote `entries` entries.
    pub fn record_full_merge(&self, entries: usize) {
        self.full_merges.fetch_add(1, Ordering::Relaxed);
        self.entries_written.fetch_add(entries, Ordering::Relaxed);
    }

    /// Record a prefix merge that wrote `entries` entries.
    pub fn record_prefix_merge(&self, entries: usize) {
        self.prefix_merges.fetch_add(1, Ordering::Relaxed);
        self.entries_written.fetch_add(entries, Ordering::Relaxed);
    }

    /// Record entries written through the host's overload entry point.
    pub fn record_overlay(&self, entries: usize) {
        self.entries_written.fetch_add(entries, Ordering::Relaxed);
    }

    pub fn record_skipped_merge(&self) {
        self.skipped_merges.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_template(&self) {
        self.templates_emitted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_namespace_failure(&self) {
        self.namespace_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn full_merges(&self) -> usize {
        self.full_merges.load(Ordering::Relaxed)
    }

    pub fn prefix_merges(&self) -> usize {
        self.prefix_merges.load(Ordering::Relaxed)
    }

    pub fn skipped_merges(&self) -> usize {
        self.skipped_merges.load(Ordering::Relaxed)
    }

    pub fn entries_written(&self) -> usize {
        self.entries_written.load(Ordering::Relaxed)
    }

    pub fn templates_emitted(&self) -> usize {
        self.templates_emitted.load(Ordering::Relaxed)
    }

    pub fn namespace_failures(&self) -> usize {
        self.namespace_failures.load(Ordering::Relaxed)
    }

    /// Snapshot of all counters.
    pub fn report(&self) -> MetricsReport {
        MetricsReport {
            full_merges: self.full_merges(),
            prefix_merges: self.prefix_merges(),
            skipped_merges: self.skipped_merges(),
            entries_written: self.entries_written(),
            templates_emitted: self.templates_emitted(),
            namespace_failures: self.namespace_failures(),
        }
    }
}

/// Metrics snapshot, serialized as JSON into the log after discovery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricsReport {
    pub full_merges: usize,
    pub prefix_merges: usize,
    pub skipped_merges: usize,
    pub entries_written: usize,
    pub templates_emitted: usize,
    pub namespace_failures: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    // ==================== Counter Tests ====================

    #[test]
    fn test_record_full_merge_counts_entries() {
        let metrics = MergeMetrics::new();
        metrics.record_full_merge(10);
        metrics.record_full_merge(5);
        assert_eq!(metrics.full_merges(), 2);
        assert_eq!(metrics.entries_written(), 15);
    }

    #[test]
    fn test_record_prefix_merge() {
        let metrics = MergeMetrics::new();
        metrics.record_prefix_merge(3);
        assert_eq!(metrics.prefix_merges(), 1);
        assert_eq!(metrics.full_merges(), 0);
        assert_eq!(metrics.entries_written(), 3);
    }

    #[test]
    fn test_record_overlay_only_counts_entries() {
        let metrics = MergeMetrics::new();
        metrics.record_overlay(4);
        assert_eq!(metrics.entries_written(), 4);
        assert_eq!(metrics.full_merges(), 0);
    }

    #[test]
    fn test_record_failures_and_templates() {
        let metrics = MergeMetrics::new();
        metrics.record_template();
        metrics.record_template();
        metrics.record_namespace_failure();
        metrics.record_skipped_merge();
        assert_eq!(metrics.templates_emitted(), 2);
        assert_eq!(metrics.namespace_failures(), 1);
        assert_eq!(metrics.skipped_merges(), 1);
    }

    // ==================== Report Tests ====================

    #[test]
    fn test_report_empty() {
        let report = MergeMetrics::new().report();
        assert_eq!(report.full_merges, 0);
        assert_eq!(report.entries_written, 0);
        assert_eq!(report.namespace_failures, 0);
    }

    #[test]
    fn test_report_serializes_to_json() {
        let metrics = MergeMetrics::new();
        metrics.record_full_merge(2);
        let json = serde_json::to_value(metrics.report()).expect("Should serialize");
        assert_eq!(json["full_merges"], 1);
        assert_eq!(json["entries_written"], 2);
    }
}
