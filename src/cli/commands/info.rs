use anyhow::Result;
use clap::Args;

use super::OutputFormat;
use crate::cli::{Globals, Output};
use crate::system::SystemSnapshot;
use crate::utils::format_file_size;

#[derive(Args)]
pub struct InfoArgs {
    /// Output format
    #[arg(long, value_enum, default_value = "text")]
    pub format: OutputFormat,
}

pub async fn execute(args: InfoArgs, _globals: &Globals, output: &Output) -> Result<()> {
    let snapshot = SystemSnapshot::collect();

    match args.format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&snapshot)?);
        }
        OutputFormat::Text => {
            output.header("System");
            output.table_row("hostname", &snapshot.hostname);
            output.table_row(
                "os",
                &format!("{} {}", snapshot.os_name, snapshot.os_version),
            );
            output.table_row("kernel", &snapshot.kernel_version);
            output.table_row("cpus", &snapshot.cpu_count.to_string());
            output.table_row(
                "memory",
                &format!(
                    "{} / {}",
                    format_file_size(snapshot.used_memory),
                    format_file_size(snapshot.total_memory)
                ),
            );

            output.header("Disks");
            for disk in &snapshot.disks {
                output.table_row(
                    &disk.mount_point,
                    &format!(
                        "{} used of {}",
                        format_file_size(disk.used_bytes()),
                        format_file_size(disk.total_bytes)
                    ),
                );
            }

            output.header("Networks");
            for network in &snapshot.networks {
                output.table_row(
                    &network.interface,
                    &format!(
                        "rx {} / tx {}",
                        format_file_size(network.received_bytes),
                        format_file_size(network.transmitted_bytes)
                    ),
                );
            }
        }
    }
    Ok(())
}
