//! Move planning.
//!
//! The planner lists the source root once and then yields one planned move
//! per top-level entry, lazily, as the executor asks for them. It never looks
//! below the top level: project roots, bundles, plain files and plain
//! directories all move as single units.

use crate::collision::{DestinationCache, MAX_DISAMBIGUATION};
use crate::config::SortConfig;
use crate::error::{SortError, SortResult};
use crate::project_detector::{Classification, EntryKind, ProjectDetector, SourceEntry};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// A single planned move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveOperation {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub kind: Classification,
    pub entry_kind: EntryKind,
}

impl MoveOperation {
    /// Returns true if the destination name differs from the source name,
    /// i.e. a collision was resolved for this move.
    pub fn was_renamed(&self) -> bool {
        self.source.file_name() != self.destination.file_name()
    }

    /// Short label for logs and previews.
    pub fn label(&self) -> &'static str {
        match (&self.kind, self.entry_kind) {
            (Classification::Plain(_), EntryKind::Directory) => "Folder",
            (kind, _) => kind.label(),
        }
    }
}

/// A top-level entry that could not be planned.
#[derive(Debug)]
pub struct SkippedEntry {
    pub path: PathBuf,
    pub error: SortError,
}

/// Outcome of planning one entry.
pub type PlannedEntry = Result<MoveOperation, SkippedEntry>;

/// An entry found while listing the source root; its kind is read lazily.
#[derive(Debug)]
struct PendingEntry {
    path: PathBuf,
    kind: io::Result<EntryKind>,
}

impl PendingEntry {
    /// A listing entry that could not be read; it is reported against the
    /// directory being listed.
    fn unreadable(source_root: &Path, error: io::Error) -> Self {
        Self {
            path: source_root.to_path_buf(),
            kind: Err(error),
        }
    }
}

/// Creates plans for a source/destination pair.
pub struct MovePlanner;

impl MovePlanner {
    /// Validates the roots, lists the source root and returns the lazy plan.
    ///
    /// # Errors
    ///
    /// * `SortError::Configuration` if source and destination are the same
    ///   directory, or the source is not a directory.
    /// * `SortError::PathAccess` if the source root cannot be resolved or
    ///   listed.
    ///
    /// Both are fatal; nothing on disk has changed when they are returned.
    pub fn plan<'c>(
        source_root: &Path,
        dest_root: &Path,
        config: &'c SortConfig,
    ) -> SortResult<Plan<'c>> {
        Self::plan_with_max_attempts(source_root, dest_root, config, MAX_DISAMBIGUATION)
    }

    /// Like [`plan`](Self::plan), with a custom collision bound.
    pub(crate) fn plan_with_max_attempts<'c>(
        source_root: &Path,
        dest_root: &Path,
        config: &'c SortConfig,
        max_attempts: u32,
    ) -> SortResult<Plan<'c>> {
        let source_root =
            fs::canonicalize(source_root).map_err(|e| SortError::path_access(source_root, e))?;
        if !source_root.is_dir() {
            return Err(SortError::Configuration(format!(
                "Input path '{}' is not a directory",
                source_root.display()
            )));
        }
        let dest_root = normalize_root(dest_root)?;

        if source_root == dest_root {
            return Err(SortError::Configuration(format!(
                "Input and output directories cannot be the same: {}",
                source_root.display()
            )));
        }

        let listing =
            fs::read_dir(&source_root).map_err(|e| SortError::path_access(&source_root, e))?;

        let mut entries = Vec::new();
        let mut excluded = Vec::new();
        for entry in listing {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!(path = %source_root.display(), error = %e, "Unreadable directory entry");
                    entries.push(PendingEntry::unreadable(&source_root, e));
                    continue;
                }
            };
            let path = entry.path();
            if dest_root.starts_with(&path) {
                tracing::info!(path = %path.display(), "Skipping entry that contains the output directory");
                excluded.push(path);
                continue;
            }
            let kind = entry.file_type().map(EntryKind::from_file_type);
            entries.push(PendingEntry { path, kind });
        }
        entries.sort_by(|a, b| a.path.cmp(&b.path));

        tracing::debug!(
            source = %source_root.display(),
            destination = %dest_root.display(),
            entries = entries.len(),
            "Planned top-level entries"
        );

        let mut cache = DestinationCache::with_max_attempts(max_attempts);
        for category in config.category_paths() {
            // Failures surface again, per entry, when the category is used.
            if let Err(e) = cache.claim_directory(&dest_root, &dest_root.join(category)) {
                tracing::debug!(category, error = %e, "Could not pre-claim category folder");
            }
        }

        Ok(Plan {
            config,
            total: entries.len(),
            entries: entries.into_iter(),
            excluded,
            source_root,
            dest_root,
            cache,
        })
    }
}

/// Makes a destination root absolute and resolves symlinks in the part of it
/// that already exists.
fn normalize_root(path: &Path) -> SortResult<PathBuf> {
    let absolute = std::path::absolute(path).map_err(|e| SortError::path_access(path, e))?;

    let mut existing = absolute.as_path();
    let mut missing = Vec::new();
    loop {
        match fs::canonicalize(existing) {
            Ok(resolved) => {
                return Ok(missing
                    .iter()
                    .rev()
                    .fold(resolved, |acc: PathBuf, part| acc.join(part)));
            }
            Err(_) => match (existing.parent(), existing.file_name()) {
                (Some(parent), Some(name)) => {
                    missing.push(name.to_os_string());
                    existing = parent;
                }
                _ => return Ok(absolute),
            },
        }
    }
}

/// A lazy, single-pass sequence of planned moves.
///
/// The plan owns the run's [`DestinationCache`]; collisions are resolved as
/// each entry is planned, so names reserved by earlier entries are visible to
/// later ones. Planning again from scratch means calling
/// [`MovePlanner::plan`] again.
pub struct Plan<'c> {
    config: &'c SortConfig,
    entries: std::vec::IntoIter<PendingEntry>,
    total: usize,
    excluded: Vec<PathBuf>,
    source_root: PathBuf,
    dest_root: PathBuf,
    cache: DestinationCache,
}

impl Plan<'_> {
    /// Number of entries the plan will yield in total.
    pub fn total(&self) -> usize {
        self.total
    }

    /// Entries left out because they contain the destination.
    pub fn excluded(&self) -> &[PathBuf] {
        &self.excluded
    }

    pub fn source_root(&self) -> &Path {
        &self.source_root
    }

    pub fn dest_root(&self) -> &Path {
        &self.dest_root
    }

    /// The run's destination cache.
    pub fn cache_mut(&mut self) -> &mut DestinationCache {
        &mut self.cache
    }

    fn plan_entry(&mut self, pending: PendingEntry) -> PlannedEntry {
        let path = pending.path;
        let kind = match pending.kind {
            Ok(kind) => kind,
            Err(e) => {
                return Err(SkippedEntry {
                    error: SortError::path_access(&path, e),
                    path,
                });
            }
        };
        let entry = SourceEntry::new(path, kind);

        match self.plan_source(&entry) {
            Ok(operation) => Ok(operation),
            Err(error) => Err(SkippedEntry {
                path: entry.path,
                error,
            }),
        }
    }

    fn plan_source(&mut self, entry: &SourceEntry) -> SortResult<MoveOperation> {
        let config = self.config;
        let classification = ProjectDetector::new(config).classify(entry)?;

        let category = match &classification {
            Classification::ProjectRoot => config.projects_category(),
            Classification::AppBundle => config.app_bundles_category(),
            Classification::Plain(ext) => config.categories().category_for_optional(ext.as_deref()),
        };
        let target_dir = self.dest_root.join(category);
        self.cache.claim_directory(&self.dest_root, &target_dir)?;

        let file_name = entry.path.file_name().ok_or_else(|| {
            SortError::path_access(
                &entry.path,
                io::Error::new(io::ErrorKind::InvalidInput, "entry has no file name"),
            )
        })?;

        // Only files keep their suffix behind the counter.
        let kept_suffix = match (entry.kind, file_name.to_str()) {
            (EntryKind::RegularFile, Some(name)) => config
                .categories()
                .split_extension(name)
                .map(|(_, ext)| ext.to_string()),
            _ => None,
        };
        let destination = self
            .cache
            .resolve(&target_dir.join(file_name), kept_suffix.as_deref())?;

        Ok(MoveOperation {
            source: entry.path.clone(),
            destination,
            kind: classification,
            entry_kind: entry.kind,
        })
    }
}

impl Iterator for Plan<'_> {
    type Item = PlannedEntry;

    fn next(&mut self) -> Option<Self::Item> {
        let pending = self.entries.next()?;
        Some(self.plan_entry(pending))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.entries.size_hint()
    }
}
