//! Applies planned moves to the filesystem.
//!
//! The executor pulls operations from a [`Plan`] one at a time. In dry-run
//! mode it only records what would happen. Otherwise it creates the category
//! folder and renames the entry into place. A failure affects only the entry
//! at hand: it is logged, recorded in the [`RunStats`], and the run goes on.

use crate::error::{SortError, SortResult};
use crate::planner::{MoveOperation, Plan, SkippedEntry};
use crate::project_detector::{Classification, EntryKind};
use chrono::{DateTime, Local};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use walkdir::WalkDir;

/// Callback invoked after every operation with
/// `(completed, total, current_path)`.
pub type ProgressCallback<'p> = Box<dyn FnMut(usize, usize, &Path) -> io::Result<()> + 'p>;

/// Options for a single execution.
#[derive(Default)]
pub struct ExecuteOptions<'p> {
    /// Record the plan without touching the filesystem.
    pub dry_run: bool,
    /// Remove source directories left empty once all moves are done.
    pub delete_empty_dirs: bool,
    /// Optional progress reporter. Its failures never abort the run.
    pub progress: Option<ProgressCallback<'p>>,
}

/// Counters and records for one run.
#[derive(Debug)]
pub struct RunStats {
    pub dry_run: bool,
    /// Top-level entries considered (excluded ones not counted).
    pub total_entries: usize,
    pub files_moved: usize,
    /// Plain directories moved as a unit.
    pub folders_moved: usize,
    pub projects_moved: usize,
    pub bundles_moved: usize,
    pub collisions_resolved: usize,
    pub directories_removed: usize,
    /// Entries skipped because of an error, with the cause.
    pub failures: Vec<(PathBuf, String)>,
    /// Entries left in place because they contain the destination.
    pub excluded: Vec<PathBuf>,
    /// Every operation applied (or, in dry-run, planned).
    pub operations: Vec<MoveOperation>,
    pub started_at: DateTime<Local>,
    pub elapsed: Duration,
}

impl RunStats {
    fn new(dry_run: bool, total_entries: usize, excluded: Vec<PathBuf>) -> Self {
        Self {
            dry_run,
            total_entries,
            files_moved: 0,
            folders_moved: 0,
            projects_moved: 0,
            bundles_moved: 0,
            collisions_resolved: 0,
            directories_removed: 0,
            failures: Vec::new(),
            excluded,
            operations: Vec::new(),
            started_at: Local::now(),
            elapsed: Duration::ZERO,
        }
    }

    /// Entries moved (or that would be moved, in dry-run).
    pub fn moved_total(&self) -> usize {
        self.files_moved + self.folders_moved + self.projects_moved + self.bundles_moved
    }

    pub fn error_count(&self) -> usize {
        self.failures.len()
    }

    /// Returns true if no entry was skipped because of an error.
    pub fn is_complete_success(&self) -> bool {
        self.failures.is_empty()
    }

    fn record(&mut self, operation: MoveOperation) {
        match (&operation.kind, operation.entry_kind) {
            (Classification::ProjectRoot, _) => self.projects_moved += 1,
            (Classification::AppBundle, _) => self.bundles_moved += 1,
            (Classification::Plain(_), EntryKind::Directory) => self.folders_moved += 1,
            (Classification::Plain(_), EntryKind::RegularFile) => self.files_moved += 1,
        }
        if operation.was_renamed() {
            self.collisions_resolved += 1;
        }
        self.operations.push(operation);
    }

    fn record_failure(&mut self, path: PathBuf, error: &SortError) {
        tracing::error!(path = %path.display(), error = %error, "Skipping entry");
        self.failures.push((path, error.to_string()));
    }
}

/// Executes plans.
pub struct Executor;

impl Executor {
    /// Runs every operation of `plan` and returns the run's statistics.
    ///
    /// Never fails as a whole: per-entry errors end up in
    /// [`RunStats::failures`].
    pub fn execute(mut plan: Plan<'_>, options: ExecuteOptions<'_>) -> RunStats {
        let ExecuteOptions {
            dry_run,
            delete_empty_dirs,
            mut progress,
        } = options;
        let clock = Instant::now();
        let total = plan.total();
        let mut stats = RunStats::new(dry_run, total, plan.excluded().to_vec());

        tracing::info!(
            source = %plan.source_root().display(),
            destination = %plan.dest_root().display(),
            entries = total,
            dry_run,
            "Starting sort"
        );

        let mut completed = 0;
        while let Some(planned) = plan.next() {
            let current = match planned {
                Ok(operation) => {
                    let current = operation.source.clone();
                    match Self::apply(&operation, dry_run) {
                        Ok(()) => stats.record(operation),
                        Err(error) => {
                            plan.cache_mut().release(&operation.destination);
                            stats.record_failure(operation.source, &error);
                        }
                    }
                    current
                }
                Err(SkippedEntry { path, error }) => {
                    stats.record_failure(path.clone(), &error);
                    path
                }
            };

            completed += 1;
            if let Some(callback) = progress.as_mut()
                && let Err(e) = callback(completed, total, &current)
            {
                tracing::warn!(error = %e, "Progress reporting failed, disabling it");
                progress = None;
            }
        }

        if delete_empty_dirs {
            if dry_run {
                tracing::info!("Dry run: empty directories are not removed");
            } else {
                stats.directories_removed =
                    remove_empty_dirs(plan.source_root(), plan.dest_root());
            }
        }

        stats.elapsed = clock.elapsed();
        tracing::info!(
            moved = stats.moved_total(),
            projects = stats.projects_moved,
            bundles = stats.bundles_moved,
            errors = stats.error_count(),
            elapsed_secs = stats.elapsed.as_secs_f64(),
            "Sort completed"
        );
        stats
    }

    fn apply(operation: &MoveOperation, dry_run: bool) -> SortResult<()> {
        let label = operation.label();
        if dry_run {
            tracing::info!(
                path = %operation.source.display(),
                destination = %operation.destination.display(),
                "[DRY RUN] [{label}] Would move"
            );
            return Ok(());
        }

        match operation.kind {
            Classification::Plain(_) => tracing::debug!(
                path = %operation.source.display(),
                destination = %operation.destination.display(),
                "[{label}] Moving"
            ),
            Classification::ProjectRoot | Classification::AppBundle => tracing::info!(
                path = %operation.source.display(),
                destination = %operation.destination.display(),
                "[{label}] Moving"
            ),
        }
        move_entry(&operation.source, &operation.destination, operation.entry_kind)
    }
}

/// Moves one entry, creating the destination's parent folders.
///
/// Uses an atomic rename. When source and destination live on different
/// filesystems the entry is copied and the source removed afterwards; a
/// failed copy is cleaned up and leaves the source untouched.
pub fn move_entry(source: &Path, destination: &Path, kind: EntryKind) -> SortResult<()> {
    if let Some(parent) = destination.parent() {
        fs::create_dir_all(parent).map_err(|e| SortError::path_access(parent, e))?;
    }

    match fs::rename(source, destination) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
            tracing::debug!(path = %source.display(), "Crossing filesystems, copying instead of renaming");
            copy_then_remove(source, destination, kind)
        }
        Err(e) => Err(SortError::path_access(source, e)),
    }
}

fn copy_then_remove(source: &Path, destination: &Path, kind: EntryKind) -> SortResult<()> {
    let copied = match kind {
        EntryKind::RegularFile => copy_file(source, destination),
        EntryKind::Directory => copy_tree(source, destination),
    };
    if let Err(e) = copied {
        let cleanup = match kind {
            EntryKind::RegularFile => fs::remove_file(destination),
            EntryKind::Directory => fs::remove_dir_all(destination),
        };
        if let Err(cleanup_err) = cleanup
            && cleanup_err.kind() != io::ErrorKind::NotFound
        {
            tracing::warn!(path = %destination.display(), error = %cleanup_err, "Could not remove partial copy");
        }
        return Err(e);
    }

    let removed = match kind {
        EntryKind::RegularFile => fs::remove_file(source),
        EntryKind::Directory => fs::remove_dir_all(source),
    };
    if let Err(e) = removed {
        tracing::warn!(path = %source.display(), error = %e, "Copied, but could not remove the original");
    }
    Ok(())
}

fn copy_file(source: &Path, destination: &Path) -> SortResult<()> {
    let metadata = fs::symlink_metadata(source).map_err(|e| SortError::path_access(source, e))?;
    if metadata.file_type().is_symlink() {
        return copy_symlink(source, destination);
    }
    fs::copy(source, destination)
        .map(|_| ())
        .map_err(|e| SortError::path_access(source, e))
}

fn copy_tree(source: &Path, destination: &Path) -> SortResult<()> {
    for entry in WalkDir::new(source) {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(source).to_path_buf();
            SortError::path_access(path, io::Error::other(e))
        })?;
        let relative = entry
            .path()
            .strip_prefix(source)
            .map_err(|e| SortError::path_access(entry.path(), io::Error::other(e)))?;
        let target = destination.join(relative);

        let file_type = entry.file_type();
        if file_type.is_dir() {
            fs::create_dir_all(&target).map_err(|e| SortError::path_access(&target, e))?;
        } else if file_type.is_symlink() {
            copy_symlink(entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), &target).map_err(|e| SortError::path_access(entry.path(), e))?;
        }
    }
    Ok(())
}

#[cfg(unix)]
fn copy_symlink(source: &Path, destination: &Path) -> SortResult<()> {
    let target = fs::read_link(source).map_err(|e| SortError::path_access(source, e))?;
    std::os::unix::fs::symlink(target, destination).map_err(|e| SortError::path_access(destination, e))
}

#[cfg(not(unix))]
fn copy_symlink(source: &Path, _destination: &Path) -> SortResult<()> {
    Err(SortError::path_access(
        source,
        io::Error::new(io::ErrorKind::Unsupported, "cannot copy symbolic link across filesystems"),
    ))
}

/// Removes empty directories below (and including) `root`, deepest first.
///
/// When `protected` (the destination) lives inside `root`, its subtree is
/// never entered. A `root` nested inside `protected` is cleaned normally.
/// Returns the number of directories removed.
pub fn remove_empty_dirs(root: &Path, protected: &Path) -> usize {
    tracing::info!(path = %root.display(), "Cleaning up empty directories");
    let mut removed = 0;

    let guard_protected = protected != root && protected.starts_with(root);
    let walker = WalkDir::new(root)
        .contents_first(true)
        .into_iter()
        .filter_entry(move |entry| !(guard_protected && entry.path().starts_with(protected)));

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::debug!(error = %e, "Skipping unreadable path during cleanup");
                continue;
            }
        };
        if !entry.file_type().is_dir() {
            continue;
        }

        let path = entry.path();
        let is_empty = match fs::read_dir(path) {
            Ok(mut children) => children.next().is_none(),
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "Could not inspect directory");
                false
            }
        };
        if !is_empty {
            continue;
        }

        match fs::remove_dir(path) {
            Ok(()) => {
                tracing::debug!(path = %path.display(), "Deleted empty directory");
                removed += 1;
            }
            Err(e) => tracing::debug!(path = %path.display(), error = %e, "Could not delete directory"),
        }
    }

    if removed > 0 {
        tracing::info!(count = removed, "Deleted empty directories");
    }
    removed
}
