//! Destination listing cache and collision resolution.
//!
//! Each destination directory is listed at most once per run. After that the
//! cached name set is the only source of truth for what exists there, and
//! every name the run hands out is inserted immediately. Two planned moves can
//! therefore never target the same path, and the run never re-reads a
//! directory it is itself filling.

use crate::error::{SortError, SortResult};
use std::collections::{HashMap, HashSet};
use std::ffi::{OsStr, OsString};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Upper bound for the `name (N)` disambiguation counter.
pub const MAX_DISAMBIGUATION: u32 = 10_000;

/// Known names per destination directory, owned by a single run.
#[derive(Debug)]
pub struct DestinationCache {
    listings: HashMap<PathBuf, HashSet<OsString>>,
    max_attempts: u32,
}

impl Default for DestinationCache {
    fn default() -> Self {
        Self::with_max_attempts(MAX_DISAMBIGUATION)
    }
}

impl DestinationCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a cache with a custom disambiguation bound.
    pub fn with_max_attempts(max_attempts: u32) -> Self {
        Self {
            listings: HashMap::new(),
            max_attempts,
        }
    }

    /// Returns the cached listing for `dir`, seeding it from disk on first use.
    ///
    /// A directory that does not exist yet seeds an empty set.
    fn listing(&mut self, dir: &Path) -> SortResult<&mut HashSet<OsString>> {
        if !self.listings.contains_key(dir) {
            let names = read_names(dir)?;
            tracing::debug!(path = %dir.display(), entries = names.len(), "Cached destination listing");
            self.listings.insert(dir.to_path_buf(), names);
        }
        self.listings
            .get_mut(dir)
            .ok_or_else(|| SortError::path_access(dir, io::Error::other("listing cache miss")))
    }

    /// Returns true if `path` is known to exist (or be reserved).
    pub fn contains(&mut self, path: &Path) -> SortResult<bool> {
        let (dir, name) = split_path(path)?;
        Ok(self.listing(dir)?.contains(name))
    }

    /// Number of directories listed so far.
    pub fn cached_directories(&self) -> usize {
        self.listings.len()
    }

    /// Records every directory between `root` and `dir` in its parent's
    /// listing, so no later entry is planned onto a path that the run will
    /// create as a category folder.
    pub fn claim_directory(&mut self, root: &Path, dir: &Path) -> SortResult<()> {
        let Ok(relative) = dir.strip_prefix(root) else {
            return Ok(());
        };
        let mut parent = root.to_path_buf();
        for component in relative.components() {
            let name = component.as_os_str();
            self.listing(&parent)?.insert(name.to_os_string());
            parent.push(name);
        }
        Ok(())
    }

    /// Returns a path in the same directory as `desired` that is free, and
    /// reserves it.
    ///
    /// `extension` is the name's trailing suffix (without the dot) that must
    /// stay at the end of disambiguated names, so `notes.txt` becomes
    /// `notes (1).txt`. Pass `None` for directories and extensionless names,
    /// which become `name (1)`.
    ///
    /// # Errors
    ///
    /// `SortError::PathAccess` if the directory cannot be listed, and
    /// `SortError::CollisionExhausted` once every candidate up to the bound
    /// ([`MAX_DISAMBIGUATION`] by default) is taken.
    pub fn resolve(&mut self, desired: &Path, extension: Option<&str>) -> SortResult<PathBuf> {
        let (dir, name) = split_path(desired)?;
        let max_attempts = self.max_attempts;
        let names = self.listing(dir)?;

        if names.insert(name.to_os_string()) {
            return Ok(desired.to_path_buf());
        }

        let (stem, suffix) = split_suffix(name, extension);
        for counter in 1..=max_attempts {
            let mut candidate = stem.clone();
            candidate.push(format!(" ({counter})"));
            candidate.push(&suffix);
            if names.insert(candidate.clone()) {
                return Ok(dir.join(candidate));
            }
        }

        Err(SortError::CollisionExhausted {
            path: desired.to_path_buf(),
            attempts: max_attempts,
        })
    }

    /// Drops a reservation made by [`resolve`](Self::resolve), e.g. after the
    /// move into it failed.
    pub fn release(&mut self, path: &Path) {
        if let (Some(dir), Some(name)) = (path.parent(), path.file_name())
            && let Some(names) = self.listings.get_mut(dir)
        {
            names.remove(name);
        }
    }
}

fn read_names(dir: &Path) -> SortResult<HashSet<OsString>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(HashSet::new()),
        Err(e) => return Err(SortError::path_access(dir, e)),
    };
    entries
        .map(|entry| {
            entry
                .map(|e| e.file_name())
                .map_err(|e| SortError::path_access(dir, e))
        })
        .collect()
}

fn split_path(path: &Path) -> SortResult<(&Path, &OsStr)> {
    match (path.parent(), path.file_name()) {
        (Some(dir), Some(name)) => Ok((dir, name)),
        _ => Err(SortError::path_access(
            path,
            io::Error::new(io::ErrorKind::InvalidInput, "path has no file name"),
        )),
    }
}

/// Splits `name` into the part before the counter and the suffix kept after it.
fn split_suffix(name: &OsStr, extension: Option<&str>) -> (OsString, String) {
    if let (Some(name), Some(ext)) = (name.to_str(), extension) {
        let tail_len = ext.len() + 1;
        if name.len() > tail_len && name.ends_with(ext) && name[..name.len() - ext.len()].ends_with('.') {
            let (stem, suffix) = name.split_at(name.len() - tail_len);
            return (OsString::from(stem), suffix.to_string());
        }
    }
    (name.to_os_string(), String::new())
}
