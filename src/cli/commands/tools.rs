use anyhow::Result;
use console::style;

use crate::cli::Output;
use crate::tools::ToolKind;

pub fn execute(output: &Output) -> Result<()> {
    output.header("Tool catalogue");
    for &kind in ToolKind::all() {
        println!(
            "  {:<18} {}",
            style(kind.name()).cyan().bold(),
            style(kind.description()).dim()
        );
    }
    Ok(())
}
