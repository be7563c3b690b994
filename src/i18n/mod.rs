//! Language metadata and merge bookkeeping.
//!
//! # Architecture
//!
//! - `registry`: Single source of truth for the selectable languages
//! - `language`: Validated `Language` type resolved from user settings
//! - `metrics`: Counters describing what the overlay did this run
//!
//! # Example
//!
//! ```rust
//! use mod_i18n::i18n::{Language, LanguageRegistry};
//!
//! let korean = Language::resolve("ko").unwrap();
//! assert_eq!(korean.file_name(), "ko.po");
//! assert_eq!(LanguageRegistry::get().find("Korean").unwrap().code, "ko");
//! ```

mod language;
mod metrics;
mod registry;

pub use language::Language;
pub use metrics::{MergeMetrics, MetricsReport};
pub use registry::{LanguageConfig, LanguageRegistry};
