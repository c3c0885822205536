use anyhow::Result;
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;

use super::{exit_for, load_config, run_job, OutputFormat};
use crate::cli::{Globals, Output};
use crate::tools::duplicates::{duplicate_stats, DuplicateFinderAdapter};
use crate::tools::{InputSpec, ToolAdapter};
use crate::utils::format_file_size;

#[derive(Args)]
pub struct DuplicatesArgs {
    /// Folders to scan
    #[arg(value_name = "FOLDER", required = true)]
    pub folders: Vec<PathBuf>,

    /// Ignore files smaller than this many bytes
    #[arg(long)]
    pub min_size: Option<u64>,

    /// Only consider these extensions (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub extensions: Vec<String>,

    /// Do not descend into subdirectories
    #[arg(long)]
    pub no_recursive: bool,

    /// Output format
    #[arg(long, value_enum, default_value = "text")]
    pub format: OutputFormat,
}

pub async fn execute(args: DuplicatesArgs, globals: &Globals, output: &Output) -> Result<()> {
    let mut duplicates = serde_json::Map::new();
    if let Some(min_size) = args.min_size {
        duplicates.insert("min_size_bytes".into(), min_size.into());
    }
    if !args.extensions.is_empty() {
        duplicates.insert("extensions".into(), serde_json::to_value(&args.extensions)?);
    }
    if args.no_recursive {
        duplicates.insert("recursive".into(), false.into());
    }
    let config = load_config(globals, serde_json::json!({ "duplicates": duplicates }))?;

    // Built directly rather than through the registry: the post-run group
    // confirmation needs the concrete adapter.
    let adapter = Arc::new(DuplicateFinderAdapter::new(config.duplicates.clone()));
    let input = InputSpec::new(args.folders);
    let report = run_job(
        &config,
        Arc::clone(&adapter) as Arc<dyn ToolAdapter>,
        &input,
        output,
        "hashing candidates",
    )
    .await?;

    let groups = adapter.groups()?;
    let stats = duplicate_stats(&groups);

    match args.format {
        OutputFormat::Json => {
            let payload = serde_json::json!({
                "groups": groups,
                "stats": stats,
            });
            println!("{}", serde_json::to_string_pretty(&payload)?);
        }
        OutputFormat::Text => {
            if groups.is_empty() {
                output.success("no duplicates found");
            } else {
                for (index, group) in groups.iter().enumerate() {
                    output.header(&format!(
                        "Group {} - {} copies of {}",
                        index + 1,
                        group.paths.len(),
                        format_file_size(group.file_size)
                    ));
                    for path in &group.paths {
                        output.list_item(&path.display().to_string());
                    }
                }
                println!();
                output.warning(&format!(
                    "{} duplicate files in {} groups, {} wasted",
                    stats.duplicate_files,
                    stats.groups,
                    format_file_size(stats.wasted_bytes)
                ));
            }
        }
    }

    exit_for(&report)
}
