//! Error taxonomy for the translation engine.
//!
//! Only [`I18nError::FileAbsent`] is recoverable: callers degrade to an empty
//! mapping and keep running untranslated. Everything else is reported with the
//! path or namespace that caused it.

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum I18nError {
    #[error("file not found: {}", path.display())]
    FileAbsent { path: PathBuf },

    #[error("malformed input in {} at line {line}: {reason}", path.display())]
    MalformedInput {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("host could not access namespace {namespace}: {reason}")]
    HostAccess { namespace: String, reason: String },
}

pub type Result<T> = std::result::Result<T, I18nError>;

impl I18nError {
    /// Wrap an I/O error, mapping `NotFound` onto [`I18nError::FileAbsent`].
    pub fn from_io(path: &Path, source: io::Error) -> Self {
        if source.kind() == io::ErrorKind::NotFound {
            Self::FileAbsent {
                path: path.to_path_buf(),
            }
        } else {
            Self::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    }

    /// Whether this error only means "the file is not there".
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::FileAbsent { .. })
    }
}
