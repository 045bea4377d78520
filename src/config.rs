//! Sorting configuration: loading, schema validation and resolution.
//!
//! The configuration document is JSON (or TOML, selected by a `.toml` file
//! extension) with the following structure:
//!
//! ```json
//! {
//!   "FILE_CATEGORIES": { "txt": "Documents/Text", "jpg": "Images/Photos" },
//!   "DEFAULT_CATEGORY": "Miscellaneous/Other",
//!   "PROJECT_FILE_MARKERS": [".git", "package.json"],
//!   "PROJECT_DIR_MARKERS": ["node_modules", ".idea"],
//!   "APPLICATION_EXECUTABLE_EXTENSIONS": [".exe", ".msi"],
//!   "SPECIAL_APP_DIRS_AS_FILES": [".app"],
//!   "PROJECTS_CATEGORY": "Applications_And_Projects",
//!   "APP_BUNDLES_CATEGORY": "Applications_And_Projects"
//! }
//! ```
//!
//! The last two keys are optional. Everything else is required, and the whole
//! document is checked before any of it reaches the engine: a document with
//! problems is rejected with every problem listed, never partially applied.

use crate::file_category::{CategoryMap, normalize_extension};
use serde::Deserialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

/// Name of the configuration file looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "default_config.json";

/// Folder that receives project roots and app bundles unless overridden.
pub const DEFAULT_PROJECTS_CATEGORY: &str = "Applications_And_Projects";

const BUILTIN_CONFIG: &str = include_str!("../default_config.json");

const REQUIRED_LIST_KEYS: [&str; 4] = [
    "PROJECT_FILE_MARKERS",
    "PROJECT_DIR_MARKERS",
    "APPLICATION_EXECUTABLE_EXTENSIONS",
    "SPECIAL_APP_DIRS_AS_FILES",
];

const OPTIONAL_CATEGORY_KEYS: [&str; 2] = ["PROJECTS_CATEGORY", "APP_BUNDLES_CATEGORY"];

/// Errors that can occur while loading a configuration document.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration file not found at the specified path.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// IO error while reading the configuration.
    #[error("Cannot read configuration file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The document is not valid JSON or TOML.
    #[error("Invalid configuration syntax in {origin}: {reason}")]
    Syntax { origin: String, reason: String },

    /// The document parsed but does not match the schema.
    #[error("Configuration validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),
}

/// Serde model of the configuration document.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ConfigDocument {
    #[serde(rename = "FILE_CATEGORIES")]
    pub file_categories: BTreeMap<String, String>,

    #[serde(rename = "DEFAULT_CATEGORY")]
    pub default_category: String,

    #[serde(rename = "PROJECT_FILE_MARKERS")]
    pub project_file_markers: Vec<String>,

    #[serde(rename = "PROJECT_DIR_MARKERS")]
    pub project_dir_markers: Vec<String>,

    #[serde(rename = "APPLICATION_EXECUTABLE_EXTENSIONS")]
    pub application_extensions: Vec<String>,

    #[serde(rename = "SPECIAL_APP_DIRS_AS_FILES")]
    pub app_bundle_extensions: Vec<String>,

    #[serde(rename = "PROJECTS_CATEGORY", default = "default_projects_category")]
    pub projects_category: String,

    #[serde(rename = "APP_BUNDLES_CATEGORY", default = "default_projects_category")]
    pub app_bundles_category: String,
}

fn default_projects_category() -> String {
    DEFAULT_PROJECTS_CATEGORY.to_string()
}

impl ConfigDocument {
    /// Loads the configuration document.
    ///
    /// Sources are tried in this order:
    /// 1. `config_path`, if given (it must exist)
    /// 2. `default_config.json` in the current directory
    /// 3. `~/.config/dirsort/config.json`
    /// 4. The built-in document
    ///
    /// # Errors
    ///
    /// Returns an error if the chosen document cannot be read, does not
    /// parse, or fails validation. A broken file is never silently replaced
    /// by the defaults.
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = config_path {
            return Self::load_from_file(path);
        }

        let local_config = PathBuf::from(LOCAL_CONFIG_FILE);
        if local_config.is_file() {
            return Self::load_from_file(&local_config);
        }

        if let Ok(home) = std::env::var("HOME") {
            let home_config = PathBuf::from(home)
                .join(".config")
                .join("dirsort")
                .join("config.json");
            if home_config.is_file() {
                return Self::load_from_file(&home_config);
            }
        }

        tracing::info!("No configuration file found, using built-in defaults");
        Self::builtin()
    }

    /// The configuration document shipped with the binary.
    pub fn builtin() -> Result<Self, ConfigError> {
        Self::from_json_str(BUILTIN_CONFIG, "built-in configuration")
    }

    /// Loads and validates a document from a specific file.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        tracing::info!(path = %path.display(), "Loading configuration");
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let origin = path.display().to_string();
        let is_toml = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
        if is_toml {
            Self::from_toml_str(&content, &origin)
        } else {
            Self::from_json_str(&content, &origin)
        }
    }

    /// Parses and validates a JSON document.
    pub fn from_json_str(content: &str, origin: &str) -> Result<Self, ConfigError> {
        let value: Value = serde_json::from_str(content).map_err(|e| ConfigError::Syntax {
            origin: origin.to_string(),
            reason: e.to_string(),
        })?;
        Self::from_value(value)
    }

    /// Parses and validates a TOML document.
    pub fn from_toml_str(content: &str, origin: &str) -> Result<Self, ConfigError> {
        let syntax_error = |reason: String| ConfigError::Syntax {
            origin: origin.to_string(),
            reason,
        };
        let table: toml::Table = toml::from_str(content).map_err(|e| syntax_error(e.to_string()))?;
        let value = serde_json::to_value(table).map_err(|e| syntax_error(e.to_string()))?;
        Self::from_value(value)
    }

    fn from_value(value: Value) -> Result<Self, ConfigError> {
        let problems = validate_document(&value);
        if !problems.is_empty() {
            return Err(ConfigError::Validation(problems));
        }
        serde_json::from_value(value).map_err(|e| ConfigError::Validation(vec![e.to_string()]))
    }

    /// Normalizes the document into the immutable run configuration.
    pub fn resolve(self) -> SortConfig {
        SortConfig {
            categories: CategoryMap::new(self.file_categories, self.default_category),
            project_file_markers: self.project_file_markers.into_iter().collect(),
            project_dir_markers: self.project_dir_markers.into_iter().collect(),
            application_extensions: normalized_set(&self.application_extensions),
            app_bundle_extensions: normalized_set(&self.app_bundle_extensions),
            projects_category: self.projects_category,
            app_bundles_category: self.app_bundles_category,
        }
    }
}

fn normalized_set(extensions: &[String]) -> HashSet<String> {
    extensions.iter().map(|ext| normalize_extension(ext)).collect()
}

/// Checks a raw document against the schema and returns every problem found.
pub fn validate_document(value: &Value) -> Vec<String> {
    let mut problems = Vec::new();

    let Some(root) = value.as_object() else {
        problems.push("Configuration must be an object".to_string());
        return problems;
    };

    match root.get("FILE_CATEGORIES") {
        None => problems.push("Missing required configuration key: FILE_CATEGORIES".to_string()),
        Some(Value::Object(categories)) => {
            for (ext, category) in categories {
                if normalize_extension(ext).is_empty() {
                    problems.push(format!("FILE_CATEGORIES contains an empty extension key '{ext}'"));
                }
                match category.as_str() {
                    Some(path) => {
                        if let Some(problem) = check_category_path(path) {
                            problems.push(format!("FILE_CATEGORIES['{ext}'] {problem}"));
                        }
                    }
                    None => problems.push(format!("FILE_CATEGORIES['{ext}'] must be a string")),
                }
            }
        }
        Some(_) => problems.push("Configuration key 'FILE_CATEGORIES' must be of type object".to_string()),
    }

    match root.get("DEFAULT_CATEGORY") {
        None => problems.push("Missing required configuration key: DEFAULT_CATEGORY".to_string()),
        Some(Value::String(path)) => {
            if let Some(problem) = check_category_path(path) {
                problems.push(format!("DEFAULT_CATEGORY {problem}"));
            }
        }
        Some(_) => problems.push("Configuration key 'DEFAULT_CATEGORY' must be of type string".to_string()),
    }

    for key in REQUIRED_LIST_KEYS {
        match root.get(key) {
            None => problems.push(format!("Missing required configuration key: {key}")),
            Some(Value::Array(items)) => {
                for (index, item) in items.iter().enumerate() {
                    match item.as_str() {
                        Some(s) if !normalize_extension(s).is_empty() => {}
                        Some(_) => problems.push(format!("{key}[{index}] must not be empty")),
                        None => problems.push(format!("{key}[{index}] must be a string")),
                    }
                }
            }
            Some(_) => problems.push(format!("Configuration key '{key}' must be of type list")),
        }
    }

    for key in OPTIONAL_CATEGORY_KEYS {
        match root.get(key) {
            None => {}
            Some(Value::String(path)) => {
                if let Some(problem) = check_category_path(path) {
                    problems.push(format!("{key} {problem}"));
                }
            }
            Some(_) => problems.push(format!("Configuration key '{key}' must be of type string")),
        }
    }

    problems
}

/// Category values must be non-empty relative paths that stay below the
/// destination root.
fn check_category_path(path: &str) -> Option<String> {
    if path.trim().is_empty() {
        return Some("must not be empty".to_string());
    }
    let path = Path::new(path);
    if path.has_root() {
        return Some(format!("must be a relative path, got '{}'", path.display()));
    }
    if path
        .components()
        .any(|c| matches!(c, Component::ParentDir | Component::Prefix(_)))
    {
        return Some(format!("must not leave the destination, got '{}'", path.display()));
    }
    None
}

/// Resolved, immutable configuration threaded through every engine component.
#[derive(Debug, Clone)]
pub struct SortConfig {
    categories: CategoryMap,
    project_file_markers: HashSet<String>,
    project_dir_markers: HashSet<String>,
    application_extensions: HashSet<String>,
    app_bundle_extensions: HashSet<String>,
    projects_category: String,
    app_bundles_category: String,
}

impl SortConfig {
    /// Loads, validates and resolves the configuration in one step.
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        ConfigDocument::load(config_path).map(ConfigDocument::resolve)
    }

    /// The built-in configuration, resolved.
    pub fn builtin() -> Result<Self, ConfigError> {
        ConfigDocument::builtin().map(ConfigDocument::resolve)
    }

    pub fn categories(&self) -> &CategoryMap {
        &self.categories
    }

    /// Returns true if a child with this exact name marks a project root.
    pub fn is_project_file_marker(&self, name: &str) -> bool {
        self.project_file_markers.contains(name)
    }

    /// Returns true if a child directory with this exact name marks a project root.
    pub fn is_project_dir_marker(&self, name: &str) -> bool {
        self.project_dir_markers.contains(name)
    }

    /// Returns true if the (normalized) extension names an application executable.
    pub fn is_application_extension(&self, ext: &str) -> bool {
        self.application_extensions.contains(&normalize_extension(ext))
    }

    /// Returns true if directories with this (normalized) extension are app bundles.
    pub fn is_app_bundle_extension(&self, ext: &str) -> bool {
        self.app_bundle_extensions.contains(&normalize_extension(ext))
    }

    pub fn projects_category(&self) -> &str {
        &self.projects_category
    }

    pub fn app_bundles_category(&self) -> &str {
        &self.app_bundles_category
    }

    /// Every destination subpath the configuration can route an entry to.
    pub fn category_paths(&self) -> impl Iterator<Item = &str> {
        self.categories
            .categories()
            .chain([
                self.categories.default_category(),
                self.projects_category.as_str(),
                self.app_bundles_category.as_str(),
            ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn valid_document() -> Value {
        json!({
            "FILE_CATEGORIES": {"txt": "Documents/Text", "JPG": "Images/Photos"},
            "DEFAULT_CATEGORY": "Miscellaneous/Other",
            "PROJECT_FILE_MARKERS": [".git", "package.json"],
            "PROJECT_DIR_MARKERS": ["node_modules"],
            "APPLICATION_EXECUTABLE_EXTENSIONS": [".exe"],
            "SPECIAL_APP_DIRS_AS_FILES": [".app"]
        })
    }

    #[test]
    fn test_valid_document_has_no_problems() {
        assert!(validate_document(&valid_document()).is_empty());
    }

    #[test]
    fn test_missing_keys_are_all_reported() {
        let problems = validate_document(&json!({"DEFAULT_CATEGORY": "Other"}));
        assert_eq!(problems.len(), 5);
        assert!(problems.iter().any(|p| p.contains("FILE_CATEGORIES")));
        assert!(problems.iter().any(|p| p.contains("SPECIAL_APP_DIRS_AS_FILES")));
    }

    #[test]
    fn test_wrong_types_are_rejected() {
        let mut doc = valid_document();
        doc["FILE_CATEGORIES"] = json!("not_a_dict");
        doc["PROJECT_DIR_MARKERS"] = json!({"a": 1});
        let problems = validate_document(&doc);
        assert_eq!(problems.len(), 2);
        assert!(problems[0].contains("must be of type object"));
        assert!(problems[1].contains("must be of type list"));
    }

    #[test]
    fn test_non_string_entries_are_rejected() {
        let mut doc = valid_document();
        doc["FILE_CATEGORIES"]["zip"] = json!(3);
        doc["PROJECT_FILE_MARKERS"] = json!([".git", 7, ""]);
        let problems = validate_document(&doc);
        assert!(problems.iter().any(|p| p.contains("FILE_CATEGORIES['zip'] must be a string")));
        assert!(problems.iter().any(|p| p.contains("PROJECT_FILE_MARKERS[1] must be a string")));
        assert!(problems.iter().any(|p| p.contains("PROJECT_FILE_MARKERS[2] must not be empty")));
    }

    #[test]
    fn test_category_paths_must_be_relative() {
        let mut doc = valid_document();
        doc["DEFAULT_CATEGORY"] = json!("/etc");
        doc["FILE_CATEGORIES"]["log"] = json!("../outside");
        doc["PROJECTS_CATEGORY"] = json!("");
        let problems = validate_document(&doc);
        assert_eq!(problems.len(), 3);
    }

    #[test]
    fn test_resolve_normalizes_extensions() {
        let config = ConfigDocument::from_json_str(&valid_document().to_string(), "test")
            .expect("document should be valid")
            .resolve();
        assert_eq!(config.categories().category_for("jpg"), "Images/Photos");
        assert!(config.is_app_bundle_extension("APP"));
        assert!(config.is_application_extension("exe"));
        assert!(config.is_project_file_marker("package.json"));
        assert!(!config.is_project_file_marker("Package.json"));
        assert_eq!(config.projects_category(), DEFAULT_PROJECTS_CATEGORY);
    }

    #[test]
    fn test_invalid_json_is_a_syntax_error() {
        let result = ConfigDocument::from_json_str("{ not json", "inline");
        assert!(matches!(result, Err(ConfigError::Syntax { .. })));
    }

    #[test]
    fn test_builtin_document_is_valid() {
        let config = SortConfig::builtin().expect("built-in configuration must validate");
        assert_eq!(config.categories().category_for("txt"), "Documents/Text");
        assert_eq!(config.categories().category_for("tar.gz"), "Archives/Tarballs");
        assert!(config.is_project_dir_marker("node_modules"));
    }

    #[test]
    fn test_load_explicit_missing_file_fails() {
        let result = ConfigDocument::load(Some(Path::new("/non/existent/config.json")));
        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn test_load_from_json_file() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("config.json");
        fs::write(&path, valid_document().to_string()).expect("Failed to write config");

        let doc = ConfigDocument::load(Some(&path)).expect("Failed to load config");
        assert_eq!(doc.default_category, "Miscellaneous/Other");
    }

    #[test]
    fn test_load_from_toml_file() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("config.toml");
        let content = r#"
DEFAULT_CATEGORY = "Other"
PROJECT_FILE_MARKERS = [".git"]
PROJECT_DIR_MARKERS = ["node_modules"]
APPLICATION_EXECUTABLE_EXTENSIONS = [".exe"]
SPECIAL_APP_DIRS_AS_FILES = [".app"]
PROJECTS_CATEGORY = "Projects"

[FILE_CATEGORIES]
txt = "Documents/Text"
"tar.gz" = "Archives/Tarballs"
"#;
        fs::write(&path, content).expect("Failed to write config");

        let config = SortConfig::load(Some(&path)).expect("Failed to load config");
        assert_eq!(config.categories().category_for("tar.gz"), "Archives/Tarballs");
        assert_eq!(config.projects_category(), "Projects");
        assert_eq!(config.app_bundles_category(), DEFAULT_PROJECTS_CATEGORY);
    }

    #[test]
    fn test_load_invalid_file_is_not_replaced_by_defaults() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("config.json");
        fs::write(&path, r#"{"FILE_CATEGORIES": "not_a_dict"}"#).expect("Failed to write config");

        let result = ConfigDocument::load(Some(&path));
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }
}
