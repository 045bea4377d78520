//! Entry classification: project roots, app bundles and plain entries.
//!
//! Classification looks at names only. A directory is inspected one level
//! deep (its immediate children) and never further; file contents are never
//! read.

use crate::config::SortConfig;
use crate::error::{SortError, SortResult};
use std::fs;
use std::path::{Path, PathBuf};

/// Kind of a source entry as seen when the source root is listed.
///
/// Symbolic links are not followed: a link is a `RegularFile` entry and the
/// link itself is what gets moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    RegularFile,
    Directory,
}

impl EntryKind {
    /// Determines the kind from a file type obtained without following links.
    pub fn from_file_type(file_type: fs::FileType) -> Self {
        if file_type.is_dir() {
            Self::Directory
        } else {
            Self::RegularFile
        }
    }
}

/// A top-level entry of the source root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceEntry {
    pub path: PathBuf,
    pub kind: EntryKind,
}

impl SourceEntry {
    pub fn new(path: impl Into<PathBuf>, kind: EntryKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }

    /// The entry's file name, lossily converted for name matching.
    pub fn name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// How an entry is moved.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Classification {
    /// A loose file, or a directory without markers, categorized by its
    /// lowercase extension. `None` when the name has no extension.
    Plain(Option<String>),
    /// A directory holding project markers; moved as one unit.
    ProjectRoot,
    /// A bundle directory (e.g. `Foo.app`) treated as an opaque file.
    AppBundle,
}

impl Classification {
    /// Short label used in logs and previews.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Plain(_) => "File",
            Self::ProjectRoot => "Project",
            Self::AppBundle => "Bundle",
        }
    }
}

/// Classifies source entries against the configured marker sets.
pub struct ProjectDetector<'a> {
    config: &'a SortConfig,
}

impl<'a> ProjectDetector<'a> {
    pub fn new(config: &'a SortConfig) -> Self {
        Self { config }
    }

    /// Classifies a single entry.
    ///
    /// Checks run in a fixed order, stopping at the first match:
    /// 1. Regular files are always `Plain`.
    /// 2. Directories whose own extension is an app-bundle extension are
    ///    `AppBundle`, before any marker is looked at.
    /// 3. Directories with a marker child are `ProjectRoot`.
    /// 4. Anything else is `Plain`, using the directory's own extension.
    ///
    /// # Errors
    ///
    /// Returns `SortError::PathAccess` if a directory's children cannot be
    /// listed.
    pub fn classify(&self, entry: &SourceEntry) -> SortResult<Classification> {
        let name = entry.name();
        let extension = self.config.categories().extension_of(&name);

        match entry.kind {
            EntryKind::RegularFile => {
                if let Some(ext) = extension.as_deref()
                    && self.config.is_application_extension(ext)
                {
                    tracing::debug!(path = %entry.path.display(), "Application executable, categorized by extension");
                }
                Ok(Classification::Plain(extension))
            }
            EntryKind::Directory => {
                if self.is_app_bundle(&name) {
                    return Ok(Classification::AppBundle);
                }
                if self.has_project_marker(&entry.path)? {
                    return Ok(Classification::ProjectRoot);
                }
                Ok(Classification::Plain(extension))
            }
        }
    }

    /// Checks every dot-suffix of the name (`b.app` and `app` for `a.b.app`)
    /// against the bundle extension set.
    fn is_app_bundle(&self, name: &str) -> bool {
        let lower = name.to_lowercase();
        lower
            .match_indices('.')
            .filter(|(index, _)| *index > 0)
            .any(|(index, _)| self.config.is_app_bundle_extension(&lower[index + 1..]))
    }

    fn has_project_marker(&self, dir: &Path) -> SortResult<bool> {
        let children = fs::read_dir(dir).map_err(|e| SortError::path_access(dir, e))?;

        for child in children {
            let child = child.map_err(|e| SortError::path_access(dir, e))?;
            let child_name = child.file_name();
            let child_name = child_name.to_string_lossy();

            if self.config.is_project_file_marker(&child_name) {
                return Ok(true);
            }
            if self.config.is_project_dir_marker(&child_name)
                && child.file_type().is_ok_and(|t| t.is_dir())
            {
                return Ok(true);
            }
        }
        Ok(false)
    }
}
