//! Error taxonomy for the sorting engine.
//!
//! Errors fall into two groups. `Configuration` aborts a run before anything
//! on disk changes. `PathAccess` and `CollisionExhausted` are scoped to a
//! single entry: the executor records them and carries on with the rest of
//! the plan. Malformed configuration documents are reported separately by
//! [`crate::config::ConfigError`].

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while planning or executing a sort run.
#[derive(Debug, Error)]
pub enum SortError {
    /// Invalid or self-referential run configuration.
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// A path could not be read, created or moved.
    #[error("Cannot access {}: {source}", path.display())]
    PathAccess {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Every disambiguated name up to the sanity bound was already taken.
    #[error("Too many name collisions for {} ({attempts} candidates tried)", path.display())]
    CollisionExhausted { path: PathBuf, attempts: u32 },
}

impl SortError {
    pub(crate) fn path_access(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::PathAccess {
            path: path.into(),
            source,
        }
    }

    /// Returns true if this error only affects a single entry.
    pub fn is_entry_scoped(&self) -> bool {
        matches!(
            self,
            Self::PathAccess { .. } | Self::CollisionExhausted { .. }
        )
    }
}

/// Result type for engine operations.
pub type SortResult<T> = Result<T, SortError>;
