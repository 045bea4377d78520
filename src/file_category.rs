//! Extension to category mapping.
//!
//! A category is a relative destination subpath such as `Images/Photos`.
//! Lookups are case-insensitive: keys are stored lowercased with any leading
//! dot stripped, so `".JPG"`, `"jpg"` and `"Jpg"` all address the same entry.
//!
//! # Examples
//!
//! ```
//! use dirsort::file_category::CategoryMap;
//!
//! let map = CategoryMap::new(
//!     [("jpg", "Images/Photos"), ("tar.gz", "Archives/Tarballs")],
//!     "Miscellaneous/Other",
//! );
//! assert_eq!(map.category_for("JPG"), "Images/Photos");
//! assert_eq!(map.category_for("xyz"), "Miscellaneous/Other");
//! assert_eq!(map.split_extension("backup.TAR.GZ"), Some(("backup", "TAR.GZ")));
//! ```

use std::collections::HashMap;

/// Maps normalized file extensions to destination category paths.
#[derive(Debug, Clone)]
pub struct CategoryMap {
    extension_map: HashMap<String, String>,
    default_category: String,
    /// Multi-part extensions known to the map, longest first.
    compound_extensions: Vec<String>,
}

impl CategoryMap {
    /// Creates a map from `(extension, category)` pairs and a fallback category.
    pub fn new<I, K, V>(mappings: I, default_category: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut map = Self {
            extension_map: HashMap::new(),
            default_category: default_category.into(),
            compound_extensions: Vec::new(),
        };
        for (ext, category) in mappings {
            map.add_extension_mapping(ext.as_ref(), category);
        }
        map
    }

    /// Adds (or replaces) an extension mapping.
    pub fn add_extension_mapping(&mut self, ext: &str, category: impl Into<String>) {
        let key = normalize_extension(ext);
        if key.contains('.') && !self.compound_extensions.contains(&key) {
            self.compound_extensions.push(key.clone());
            self.compound_extensions
                .sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        }
        self.extension_map.insert(key, category.into());
    }

    /// Returns the category path for an extension, or the default category.
    ///
    /// The extension may be given with or without its leading dot and in any
    /// case.
    pub fn category_for(&self, extension: &str) -> &str {
        self.extension_map
            .get(&normalize_extension(extension))
            .map(String::as_str)
            .unwrap_or(&self.default_category)
    }

    /// Returns the category for an optional extension.
    pub fn category_for_optional(&self, extension: Option<&str>) -> &str {
        extension.map_or(self.default_category(), |ext| self.category_for(ext))
    }

    /// All mapped category paths (may repeat).
    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.extension_map.values().map(String::as_str)
    }

    /// The category used when no mapping matches.
    pub fn default_category(&self) -> &str {
        &self.default_category
    }

    /// Number of extension mappings.
    pub fn len(&self) -> usize {
        self.extension_map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.extension_map.is_empty()
    }

    /// Splits a file name into stem and extension, preserving case.
    ///
    /// Known compound extensions (e.g. `tar.gz`) are matched longest first;
    /// otherwise the final dot-separated suffix is used. Names whose only dot
    /// is the leading one (`.bashrc`) and names ending in a dot have no
    /// extension.
    pub fn split_extension<'n>(&self, name: &'n str) -> Option<(&'n str, &'n str)> {
        for compound in &self.compound_extensions {
            let tail_len = compound.len() + 1;
            if name.len() <= tail_len || !name.is_char_boundary(name.len() - tail_len) {
                continue;
            }
            let (stem, tail) = name.split_at(name.len() - tail_len);
            if let Some(ext) = tail.strip_prefix('.')
                && ext.to_lowercase() == *compound
            {
                return Some((stem, ext));
            }
        }

        let dot = name.rfind('.')?;
        if dot == 0 || dot + 1 == name.len() {
            return None;
        }
        Some((&name[..dot], &name[dot + 1..]))
    }

    /// Returns the normalized (lowercase) extension of a name, if any.
    pub fn extension_of(&self, name: &str) -> Option<String> {
        self.split_extension(name).map(|(_, ext)| ext.to_lowercase())
    }
}

/// Lowercases an extension and strips any leading dots.
pub fn normalize_extension(ext: &str) -> String {
    ext.trim_start_matches('.').to_lowercase()
}
