use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

use super::{exit_for, load_config, run_job};
use crate::cli::{Globals, Output};
use crate::job::Outcome;
use crate::tools::{InputSpec, ToolKind, ToolRegistry};
use crate::utils::{file_size, format_file_size};

#[derive(Args)]
pub struct CompressArgs {
    /// Files or folders to compress (one archive each)
    #[arg(value_name = "PATH", required = true)]
    pub paths: Vec<PathBuf>,

    /// Output folder (default: next to each source)
    #[arg(short, long)]
    pub out: Option<PathBuf>,

    /// Deflate level (0-9)
    #[arg(long)]
    pub level: Option<i64>,
}

pub async fn execute(args: CompressArgs, globals: &Globals, output: &Output) -> Result<()> {
    let mut compress = serde_json::Map::new();
    if let Some(level) = args.level {
        compress.insert("level".into(), level.into());
    }
    let config = load_config(globals, serde_json::json!({ "compress": compress }))?;
    let registry = ToolRegistry::new(config);

    let adapter = registry.build(ToolKind::Compress);
    let input = InputSpec::new(args.paths).with_output(args.out);
    let report = run_job(registry.config(), adapter, &input, output, "compressing").await?;

    let original = report.bytes_processed();
    let compressed: u64 = report
        .per_item
        .iter()
        .filter_map(|result| match &result.outcome {
            Outcome::Success {
                artifact: Some(path),
            } => Some(file_size(path)),
            _ => None,
        })
        .sum();
    if report.succeeded > 0 && original > 0 {
        let saved = 100.0 * (original.saturating_sub(compressed)) as f64 / original as f64;
        output.info(&format!(
            "{} -> {} ({saved:.1}% saved)",
            format_file_size(original),
            format_file_size(compressed),
        ));
    }

    exit_for(&report)
}
