//! Command-line interface.
//!
//! One subcommand per tool family; every batch tool runs through the same
//! job pipeline and renders the same progress stream and report summary.

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};

pub mod commands;
mod output;

pub use output::Output;

/// fileforge - batch file utilities with a concurrent job pipeline
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE", global = true)]
    pub config: Option<String>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Enable quiet output (minimal)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Worker threads for batch execution (0 = auto-detect)
    #[arg(long, global = true)]
    pub concurrency: Option<usize>,

    /// Per-item deadline in milliseconds (0 = none)
    #[arg(long, global = true)]
    pub timeout_ms: Option<u64>,

    /// Subcommands
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Document conversion tools
    #[command(subcommand)]
    Convert(ConvertCommands),
    /// PDF merge and split
    #[command(subcommand)]
    Pdf(PdfCommands),
    /// Compress files into zip archives
    Compress(commands::compress::CompressArgs),
    /// Find duplicate files by content
    Duplicates(commands::duplicates::DuplicatesArgs),
    /// Securely overwrite and delete files
    Shred(commands::shred::ShredArgs),
    /// Clean temporary files and caches
    Cleanup(commands::cleanup::CleanupArgs),
    /// Analyze disk usage under a folder
    Analyze(commands::analyze::AnalyzeArgs),
    /// Show system information
    Info(commands::info::InfoArgs),
    /// List the tool catalogue
    Tools,
}

/// Conversion subcommands
#[derive(Subcommand)]
pub enum ConvertCommands {
    /// Render PDF pages to PNG or JPEG images
    PdfToImage(commands::convert::PdfToImageArgs),
    /// Convert word-processor documents to PDF
    DocxToPdf(commands::convert::DocToPdfArgs),
    /// Combine images into a single PDF
    ImagesToPdf(commands::convert::ImagesToPdfArgs),
    /// Convert plain-text files to PDF
    TextToPdf(commands::convert::DocToPdfArgs),
}

/// PDF subcommands
#[derive(Subcommand)]
pub enum PdfCommands {
    /// Merge several PDFs into one
    Merge(commands::pdfops::MergeArgs),
    /// Split a PDF into page ranges
    Split(commands::pdfops::SplitArgs),
}

/// Global settings threaded through to every command.
pub struct Globals {
    pub config: Option<String>,
    pub concurrency: Option<usize>,
    pub timeout_ms: Option<u64>,
}

impl Globals {
    /// Job-section overrides derived from global CLI flags.
    pub(crate) fn job_overrides(&self) -> serde_json::Value {
        let mut job = serde_json::Map::new();
        if let Some(concurrency) = self.concurrency {
            job.insert("max_workers".into(), concurrency.into());
        }
        if let Some(timeout_ms) = self.timeout_ms {
            job.insert("item_timeout_ms".into(), timeout_ms.into());
        }
        serde_json::json!({ "job": job })
    }
}

impl Cli {
    /// Execute the CLI command
    pub async fn run(self) -> Result<()> {
        let output = Output::new(self.verbose, self.quiet);
        let globals = Globals {
            config: self.config,
            concurrency: self.concurrency,
            timeout_ms: self.timeout_ms,
        };

        match self.command {
            Some(Commands::Convert(cmd)) => commands::convert::execute(cmd, &globals, &output).await,
            Some(Commands::Pdf(cmd)) => commands::pdfops::execute(cmd, &globals, &output).await,
            Some(Commands::Compress(args)) => {
                commands::compress::execute(args, &globals, &output).await
            }
            Some(Commands::Duplicates(args)) => {
                commands::duplicates::execute(args, &globals, &output).await
            }
            Some(Commands::Shred(args)) => commands::shred::execute(args, &globals, &output).await,
            Some(Commands::Cleanup(args)) => {
                commands::cleanup::execute(args, &globals, &output).await
            }
            Some(Commands::Analyze(args)) => {
                commands::analyze::execute(args, &globals, &output).await
            }
            Some(Commands::Info(args)) => commands::info::execute(args, &globals, &output).await,
            Some(Commands::Tools) => commands::tools::execute(&output),
            None => {
                // Show help when no command is provided
                let mut cmd = Cli::command();
                cmd.print_help()?;
                Ok(())
            }
        }
    }
}
