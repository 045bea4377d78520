//! Command-line interface module for dirsort.
//!
//! Parses arguments, loads the configuration, and drives one run of the
//! planner and executor. Fatal problems come back as `anyhow` errors with
//! context; per-entry failures are part of the returned [`RunStats`].

use crate::config::SortConfig;
use crate::executor::{ExecuteOptions, Executor, ProgressCallback, RunStats};
use crate::output::OutputFormatter;
use crate::planner::MovePlanner;
use anyhow::{Context, Result};
use clap::Parser;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Sort the top level of a directory into category folders.
#[derive(Debug, Clone, Parser)]
#[command(name = "dirsort", version, about)]
pub struct Cli {
    /// Directory whose contents should be sorted.
    pub input_dir: PathBuf,

    /// Where the category folders are created [default: <parent>/<name>_Sorted].
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Show what would be moved without touching anything.
    #[arg(long)]
    pub dry_run: bool,

    /// Remove directories left empty in the input directory afterwards.
    #[arg(long)]
    pub delete_empty_dirs: bool,

    /// Configuration file (JSON, or TOML with a .toml extension).
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Log debug details to the console.
    #[arg(short, long)]
    pub verbose: bool,

    /// Also write a full debug log to this file.
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Show a progress bar.
    #[arg(long)]
    pub progress: bool,
}

/// Returns the default output directory for `input`: a sibling named
/// `<name>_Sorted`.
///
/// ```
/// use dirsort::cli::default_output_dir;
/// use std::path::Path;
///
/// assert_eq!(
///     default_output_dir(Path::new("/data/Downloads")),
///     Path::new("/data/Downloads_Sorted")
/// );
/// ```
pub fn default_output_dir(input: &Path) -> PathBuf {
    let resolved = fs::canonicalize(input)
        .or_else(|_| std::path::absolute(input))
        .unwrap_or_else(|_| input.to_path_buf());

    match (resolved.parent(), resolved.file_name()) {
        (Some(parent), Some(name)) => {
            let mut sorted = name.to_os_string();
            sorted.push("_Sorted");
            parent.join(sorted)
        }
        _ => resolved.join("Sorted"),
    }
}

/// Runs one sort as described by `cli`.
///
/// # Errors
///
/// Configuration that cannot be loaded or fails validation, an input
/// directory that cannot be read, or input and output resolving to the same
/// directory. Nothing on disk has changed when an error is returned.
pub fn run_cli(cli: &Cli) -> Result<RunStats> {
    let config = SortConfig::load(cli.config.as_deref()).context("Error loading configuration")?;

    let output_dir = cli
        .output_dir
        .clone()
        .unwrap_or_else(|| default_output_dir(&cli.input_dir));

    let plan = MovePlanner::plan(&cli.input_dir, &output_dir, &config)
        .with_context(|| format!("Cannot sort {}", cli.input_dir.display()))?;
    let source_root = plan.source_root().to_path_buf();
    let dest_root = plan.dest_root().to_path_buf();

    if cli.dry_run {
        OutputFormatter::dry_run_notice(&format!(
            "Analyzing {} (output: {})",
            source_root.display(),
            dest_root.display()
        ));
    } else {
        OutputFormatter::info(&format!(
            "Sorting {} into {}",
            source_root.display(),
            dest_root.display()
        ));
    }
    for path in plan.excluded() {
        OutputFormatter::warning(&format!(
            "Leaving {} in place: it contains the output directory",
            path.display()
        ));
    }

    let bar = cli
        .progress
        .then(|| OutputFormatter::create_progress_bar(plan.total() as u64));
    let progress = bar.as_ref().map(|pb| {
        Box::new(move |_done: usize, _total: usize, path: &Path| -> io::Result<()> {
            pb.inc(1);
            if let Some(name) = path.file_name() {
                pb.set_message(name.to_string_lossy().into_owned());
            }
            Ok(())
        }) as ProgressCallback<'_>
    });

    let options = ExecuteOptions {
        dry_run: cli.dry_run,
        delete_empty_dirs: cli.delete_empty_dirs,
        progress,
    };
    let stats = Executor::execute(plan, options);

    if let Some(pb) = bar {
        pb.finish_and_clear();
    }

    if stats.dry_run {
        OutputFormatter::dry_run_preview(&stats.operations, &source_root, &dest_root);
    }
    OutputFormatter::summary_table(&stats);

    if stats.dry_run {
        OutputFormatter::dry_run_notice("No files were modified.");
    } else if stats.is_complete_success() {
        OutputFormatter::success("Sorting complete!");
    } else {
        OutputFormatter::warning("Some entries could not be moved. Please review errors above.");
    }

    Ok(stats)
}
