//! Consistent CLI output formatting.
//!
//! Styled status lines via `console`, live progress bars via `indicatif`,
//! and the standard rendering of a finished job report.

use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};

use crate::job::{JobReport, Outcome};
use crate::utils::format_file_size;

/// Output handler for consistent CLI formatting
pub struct Output {
    verbose: bool,
    quiet: bool,
}

impl Output {
    pub fn new(verbose: bool, quiet: bool) -> Self {
        Self { verbose, quiet }
    }

    pub fn success(&self, message: &str) {
        if !self.quiet {
            println!("{} {}", style("✔").green(), message);
        }
    }

    /// Errors are always shown, even in quiet mode.
    pub fn error(&self, message: &str) {
        eprintln!("{} {}", style("✖").red(), message);
    }

    pub fn warning(&self, message: &str) {
        if !self.quiet {
            println!("{} {}", style("⚠").yellow(), message);
        }
    }

    pub fn info(&self, message: &str) {
        if !self.quiet {
            println!("{} {}", style("ℹ").blue(), message);
        }
    }

    pub fn verbose(&self, message: &str) {
        if self.verbose {
            println!("{} {}", style("ℹ").dim(), style(message).dim());
        }
    }

    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    pub fn header(&self, title: &str) {
        if !self.quiet {
            println!("\n{}", style(title).bold().underlined());
        }
    }

    pub fn table_row(&self, key: &str, value: &str) {
        println!("  {:<22} {}", style(key).dim(), value);
    }

    pub fn list_item(&self, item: &str) {
        println!("  • {}", item);
    }

    /// Create a progress bar for a batch; hidden in quiet mode.
    pub fn progress_bar(&self, len: u64, message: &str) -> ProgressBar {
        if self.quiet {
            return ProgressBar::hidden();
        }
        let bar = ProgressBar::new(len);
        bar.set_style(
            ProgressStyle::default_bar()
                .template(
                    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
                )
                .unwrap()
                .progress_chars("#>-"),
        );
        bar.set_message(message.to_string());
        bar
    }

    /// Ask for user confirmation
    pub fn confirm(&self, message: &str) -> bool {
        print!("{} {} (y/N): ", style("❯").cyan(), message);
        io::stdout().flush().ok();

        let mut input = String::new();
        if io::stdin().read_line(&mut input).is_err() {
            return false;
        }
        matches!(input.trim().to_lowercase().as_str(), "y" | "yes")
    }

    /// Render the standard summary of a finished batch: counts, elapsed
    /// time, and every failure with its reason.
    pub fn report_summary(&self, report: &JobReport) {
        if !self.quiet {
            println!();
            let headline = format!(
                "{} succeeded, {} failed, {} skipped ({} items, {} in {:.2}s)",
                style(report.succeeded).green().bold(),
                if report.failed > 0 {
                    style(report.failed).red().bold()
                } else {
                    style(report.failed).dim()
                },
                style(report.skipped).yellow(),
                report.total,
                format_file_size(report.bytes_processed()),
                report.elapsed.as_secs_f64(),
            );
            println!("{headline}");
        }

        for result in report.failures() {
            if let Outcome::Failed { kind, message } = &result.outcome {
                self.error(&format!("item {} [{kind}]: {message}", result.item_id));
            }
        }

        if self.verbose {
            for result in &report.per_item {
                if let Outcome::Skipped { reason } = &result.outcome {
                    self.verbose(&format!("item {} skipped: {reason}", result.item_id));
                }
            }
        }
    }
}
