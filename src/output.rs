use std::path::Path;
use std::time::Duration;

use colored::Colorize;
use indicatif::{HumanBytes, HumanDuration};
use serde::Serialize;

use crate::actions::Action;

/// Counters for one run
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunStatistics {
    /// Files visited
    pub files: usize,
    /// Folders visited below the source root
    pub folders: usize,
    /// Files moved to their target path
    pub moved: usize,
    /// Files moved under an alternate name because a different file held the target
    pub renamed: usize,
    /// Identical duplicates deleted
    pub duplicates_deleted: usize,
    /// Identical duplicates moved to the duplicates folder
    pub duplicates_kept: usize,
    /// Cleanup artifacts deleted
    pub cleaned_up: usize,
    /// Files left in place
    pub skipped: usize,
    /// Files whose metadata could not be decoded (counted in `skipped` too)
    pub decode_errors: usize,
    /// Emptied folders removed
    pub folders_removed: usize,
    /// Bytes freed by deleting identical duplicates
    pub bytes_reclaimed: u64,
    pub elapsed_secs: f64,
}

/// Complete report of a run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub dry_run: bool,
    pub stats: RunStatistics,
    pub actions: Vec<Action>,
}

impl RunReport {
    pub fn summary_line(&self) -> String {
        format!(
            "Processed {} files in {} folders, elapsed time = {}",
            self.stats.files,
            self.stats.folders,
            HumanDuration(Duration::from_secs_f64(self.stats.elapsed_secs))
        )
    }

    /// Output as human-readable colored text
    pub fn print_human(&self, verbose: bool, log_file: &Path) {
        let title = if self.dry_run {
            "Media Sort Report (dry run)"
        } else {
            "Media Sort Report"
        };
        println!("\n{}", title.bold().underline());
        println!("  {}", self.summary_line());
        println!("  Moved: {}", self.stats.moved.to_string().cyan());
        println!(
            "  Renamed (different file at target): {}",
            self.stats.renamed.to_string().cyan()
        );
        println!(
            "  Duplicates deleted: {} ({})",
            self.stats.duplicates_deleted.to_string().cyan(),
            HumanBytes(self.stats.bytes_reclaimed).to_string().yellow()
        );
        println!(
            "  Duplicates kept: {}",
            self.stats.duplicates_kept.to_string().cyan()
        );
        println!(
            "  Cleanup files deleted: {}",
            self.stats.cleaned_up.to_string().cyan()
        );
        println!("  Skipped: {}", self.stats.skipped.to_string().cyan());
        if self.stats.decode_errors > 0 {
            println!(
                "  Unreadable metadata: {}",
                self.stats.decode_errors.to_string().red()
            );
        }
        println!(
            "  Folders removed: {}",
            self.stats.folders_removed.to_string().cyan()
        );

        if verbose && !self.actions.is_empty() {
            println!("\n{}", "Actions".bold());
            for action in &self.actions {
                println!("  {}", describe(action));
            }
        }

        println!("\nDetails in log file {}", log_file.display());
    }

    /// Output as JSON
    pub fn print_json(&self) {
        match serde_json::to_string_pretty(self) {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("Error serializing to JSON: {}", e),
        }
    }
}

fn describe(action: &Action) -> String {
    match action {
        Action::CreateDir { path } => format!("{} {}", "[mkdir]".blue(), path.display()),
        Action::Move { from, to } => {
            format!("{} {} -> {}", "[move]".green(), from.display(), to.display())
        }
        Action::DeleteFile { path, .. } => format!("{} {}", "[delete]".red(), path.display()),
        Action::RemoveDir { path } => format!("{} {}", "[rmdir]".yellow(), path.display()),
        Action::WriteNote { path, .. } => format!("{} {}", "[note]".blue(), path.display()),
    }
}
