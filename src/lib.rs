//! dirsort - sorts the top level of a directory into category folders
//!
//! Files are routed by extension through a configurable category map.
//! Project roots and application bundles are recognized and moved intact.
//! Name collisions are resolved with `name (N).ext` suffixes, and a dry run
//! shows the full plan without touching anything.

pub mod cli;
pub mod collision;
pub mod config;
pub mod error;
pub mod executor;
pub mod file_category;
pub mod logging;
pub mod output;
pub mod planner;
pub mod project_detector;

pub use cli::{Cli, default_output_dir, run_cli};
pub use collision::DestinationCache;
pub use config::{ConfigDocument, ConfigError, SortConfig};
pub use error::{SortError, SortResult};
pub use executor::{ExecuteOptions, Executor, RunStats};
pub use file_category::CategoryMap;
pub use planner::{MoveOperation, MovePlanner, Plan};
pub use project_detector::{Classification, EntryKind, ProjectDetector};
