use anyhow::{bail, Result};
use clap::Args;

use super::{exit_for, load_config, run_job};
use crate::cli::{Globals, Output};
use crate::tools::cleanup::{find_location, scan_locations};
use crate::tools::{InputSpec, ToolKind, ToolRegistry};
use crate::utils::format_file_size;

#[derive(Args)]
pub struct CleanupArgs {
    /// Locations to clean, by name (see --list)
    #[arg(value_name = "LOCATION")]
    pub locations: Vec<String>,

    /// Show known locations and their sizes, delete nothing
    #[arg(long)]
    pub list: bool,

    /// Clean every known location
    #[arg(long)]
    pub all: bool,

    /// Skip the confirmation prompt
    #[arg(short = 'y', long)]
    pub yes: bool,
}

pub async fn execute(args: CleanupArgs, globals: &Globals, output: &Output) -> Result<()> {
    if args.list {
        output.header("Temp locations");
        for usage in scan_locations() {
            let value = if usage.exists {
                format!(
                    "{} ({} files) - {}",
                    format_file_size(usage.bytes),
                    usage.files,
                    usage.location.path.display()
                )
            } else {
                "not present".to_string()
            };
            output.table_row(usage.location.name, &value);
        }
        return Ok(());
    }

    let selected = if args.all {
        scan_locations()
            .into_iter()
            .filter(|usage| usage.exists)
            .map(|usage| usage.location)
            .collect()
    } else {
        if args.locations.is_empty() {
            bail!("name locations to clean, or pass --all (see --list)");
        }
        let mut selected = Vec::new();
        for name in &args.locations {
            match find_location(name) {
                Some(location) => selected.push(location),
                None => bail!("unknown location '{name}' (see --list)"),
            }
        }
        selected
    };

    if selected.is_empty() {
        output.info("nothing to clean");
        return Ok(());
    }

    if !args.yes {
        let names: Vec<&str> = selected.iter().map(|l| l.name).collect();
        let prompt = format!(
            "Permanently delete the contents of: {}?",
            names.join(", ")
        );
        if !output.confirm(&prompt) {
            output.info("aborted");
            return Ok(());
        }
    }

    let config = load_config(globals, serde_json::json!({}))?;
    let registry = ToolRegistry::new(config);
    let adapter = registry.build(ToolKind::DiskCleanup);
    let input = InputSpec::new(selected.into_iter().map(|l| l.path).collect());
    let report = run_job(registry.config(), adapter, &input, output, "cleaning").await?;

    output.success(&format!(
        "freed {}",
        format_file_size(report.bytes_processed())
    ));
    exit_for(&report)
}
