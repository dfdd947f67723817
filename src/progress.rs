//! Progress reporting for build and verify runs
//!
//! Provides a live counter using an indicatif spinner and styled summaries
//! printed once a run finishes.

use crate::engine::EngineStats;
use crate::manifest::MismatchReport;
use console::style;
use humansize::{format_size, BINARY};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Spinner with a running count of processed files
pub struct ProgressReporter {
    bar: ProgressBar,
    label: &'static str,
}

impl ProgressReporter {
    /// Create a new progress reporter, e.g. `ProgressReporter::new("Hashing files...")`
    pub fn new(label: &'static str) -> Self {
        let bar = ProgressBar::new_spinner();

        if let Ok(spinner) = ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}") {
            bar.set_style(spinner.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"));
        }

        bar.enable_steady_tick(Duration::from_millis(100));
        bar.set_message(label);

        Self { bar, label }
    }

    /// Count one more processed file
    pub fn record(&self) {
        self.bar.inc(1);
        self.bar
            .set_message(format!("{} {}", self.label, format_number(self.bar.position())));
    }

    /// Number of files recorded so far
    pub fn count(&self) -> u64 {
        self.bar.position()
    }

    /// Finish the progress display with a final message
    pub fn finish(&self, message: &str) {
        self.bar.finish_with_message(message.to_string());
    }

    /// Finish and clear the progress display
    pub fn finish_and_clear(&self) {
        self.bar.finish_and_clear();
    }
}

/// Format a number with thousands separators
fn format_number(n: u64) -> String {
    let s = n.to_string();
    let bytes: Vec<_> = s.bytes().rev().collect();

    let chunks: Vec<String> = bytes
        .chunks(3)
        .map(|chunk| chunk.iter().rev().map(|&b| b as char).collect::<String>())
        .collect();

    chunks.into_iter().rev().collect::<Vec<_>>().join(",")
}

/// Totals shown after a run
#[derive(Debug, Clone)]
pub struct RunSummary<'a> {
    pub title: &'a str,
    pub files: u64,
    pub failures: u64,
    pub stats: EngineStats,
    pub output_path: &'a str,
    pub output_size: Option<u64>,
}

/// Print a summary of the run results
pub fn print_summary(summary: &RunSummary<'_>) {
    let duration_secs = summary.stats.duration.as_secs_f64();
    let rate = summary.stats.items_per_second();

    println!();
    println!("{}", style(summary.title).green().bold());
    println!("{}", style("─".repeat(50)).dim());
    println!("  {} {}", style("Files:").bold(), format_number(summary.files));
    println!(
        "  {} {:.1}s ({:.0} files/sec)",
        style("Duration:").bold(),
        duration_secs,
        rate
    );
    if summary.failures > 0 {
        println!(
            "  {} {}",
            style("Failed:").yellow().bold(),
            format_number(summary.failures)
        );
    }
    if let Some(size) = summary.output_size {
        println!(
            "  {} {} ({})",
            style("Manifest:").bold(),
            summary.output_path,
            format_size(size, BINARY)
        );
    } else {
        println!("  {} {}", style("Manifest:").bold(), summary.output_path);
    }
    println!();
}

/// Print a header at the start of a run
pub fn print_header(mode: &str, directory: &str, workers: usize, manifest: &str) {
    println!();
    println!(
        "{} {}",
        style("dir-verifier").cyan().bold(),
        env!("CARGO_PKG_VERSION")
    );
    println!("{}", style("─".repeat(50)).dim());
    println!("  {} {}", style("Mode:").bold(), mode);
    println!("  {} {}", style("Directory:").bold(), directory);
    println!("  {} {}", style("Workers:").bold(), workers);
    println!("  {} {}", style("Manifest:").bold(), manifest);
    println!();
}

/// List every failing file with its diagnostic
pub fn print_mismatches(report: &MismatchReport) {
    println!();
    println!("{}", style("Verifying files failed.").red().bold());
    println!("Failed: ");
    for (path, check) in report.iter() {
        println!("\"{}\" Reason: \"{}\"", path, check);
    }
}
