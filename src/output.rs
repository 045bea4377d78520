//! Output formatting and styling module.
//!
//! Everything the CLI prints for the user goes through [`OutputFormatter`]:
//! status lines, the progress bar, the dry-run preview and the end-of-run
//! summary. Diagnostics go through `tracing` instead (see [`crate::logging`]).

use crate::executor::RunStats;
use crate::planner::MoveOperation;
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;

/// Manages all CLI output with consistent styling and formatting.
///
/// - Success messages (green with ✓)
/// - Error messages (red with ✗, on stderr)
/// - Warning messages (yellow with ⚠)
/// - Info messages (cyan)
/// - Progress bars and summary tables
pub struct OutputFormatter;

impl OutputFormatter {
    /// Prints a success message in green with a checkmark.
    ///
    /// ```no_run
    /// use dirsort::output::OutputFormatter;
    /// OutputFormatter::success("Sorting complete");
    /// ```
    pub fn success(message: &str) {
        println!("{} {}", "✓".green(), message);
    }

    /// Prints an error message in red with an X mark.
    pub fn error(message: &str) {
        eprintln!("{} {}", "✗".red(), message);
    }

    /// Prints a warning message in yellow with a warning symbol.
    pub fn warning(message: &str) {
        println!("{} {}", "⚠".yellow(), message);
    }

    /// Prints an info message in cyan.
    pub fn info(message: &str) {
        println!("{}", message.cyan());
    }

    pub fn plain(message: &str) {
        println!("{}", message);
    }

    /// Prints a section header.
    pub fn header(header: &str) {
        println!("\n{}", header.bold());
    }

    pub fn dry_run_notice(message: &str) {
        println!("{}", format!("[DRY RUN] {}", message).yellow());
    }

    /// Creates a progress bar for `total` top-level entries.
    ///
    /// Falls back to indicatif's default bar if the template is rejected.
    pub fn create_progress_bar(total: u64) -> ProgressBar {
        let pb = ProgressBar::new(total);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.cyan} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .map(|style| style.progress_chars("█▓░"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        pb.set_style(style);
        pb
    }

    /// Lists the moves of a dry run, relative to the two roots.
    pub fn dry_run_preview(operations: &[MoveOperation], source_root: &Path, dest_root: &Path) {
        Self::header("PLANNED MOVES");
        if operations.is_empty() {
            Self::plain("Nothing to move.");
            return;
        }
        for op in operations {
            let from = op
                .source
                .strip_prefix(source_root)
                .unwrap_or(op.source.as_path());
            let to = op
                .destination
                .strip_prefix(dest_root)
                .unwrap_or(op.destination.as_path());
            println!(
                "  {:<8} {} {} {}",
                format!("[{}]", op.label()).dimmed(),
                from.display(),
                "->".cyan(),
                to.display()
            );
        }
    }

    /// Prints the end-of-run summary.
    pub fn summary_table(stats: &RunStats) {
        Self::header(if stats.dry_run {
            "SUMMARY (DRY RUN)"
        } else {
            "SUMMARY"
        });

        let moved_label = if stats.dry_run { "Would move" } else { "Moved" };
        let rows = [
            ("Files", stats.files_moved),
            ("Folders", stats.folders_moved),
            ("Projects", stats.projects_moved),
            ("App bundles", stats.bundles_moved),
        ];
        let width = rows
            .iter()
            .map(|(name, _)| name.len())
            .max()
            .unwrap_or(0)
            .max("Renamed on collision".len());

        println!("{:<width$} | {}", "Kind".bold(), moved_label.bold());
        println!("{}", "-".repeat(width + 12));
        for (name, count) in rows {
            println!("{:<width$} | {}", name, count.to_string().green());
        }
        println!("{}", "-".repeat(width + 12));
        println!(
            "{:<width$} | {}",
            "Total".bold(),
            stats.moved_total().to_string().green().bold()
        );
        println!(
            "{:<width$} | {}",
            "Renamed on collision",
            stats.collisions_resolved
        );
        if !stats.dry_run && stats.directories_removed > 0 {
            println!(
                "{:<width$} | {}",
                "Empty dirs removed", stats.directories_removed
            );
        }
        if !stats.excluded.is_empty() {
            println!(
                "{:<width$} | {}",
                "Left in place",
                stats.excluded.len().to_string().yellow()
            );
        }
        let errors = stats.error_count();
        println!(
            "{:<width$} | {}",
            "Skipped (error)",
            if errors == 0 {
                errors.to_string().green()
            } else {
                errors.to_string().red()
            }
        );

        println!();
        println!(
            "Started {} ({:.2}s)",
            stats.started_at.format("%Y-%m-%d %H:%M:%S"),
            stats.elapsed.as_secs_f64()
        );

        if errors > 0 {
            Self::header("SKIPPED ENTRIES");
            for (path, reason) in &stats.failures {
                Self::error(&format!("{}: {}", path.display(), reason));
            }
        }
    }
}
