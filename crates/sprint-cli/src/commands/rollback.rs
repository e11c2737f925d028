//! `sprint rollback`

use clap::Args;

use crate::config::SprintConfig;
use crate::error::CliResult;
use crate::output::print_success;

#[derive(Debug, Args)]
pub struct RollbackArgs {
    /// Published output root (overrides `out_dir`)
    #[arg(long)]
    pub out: Option<String>,
}

pub fn execute(args: RollbackArgs, config: &SprintConfig) -> CliResult<()> {
    let out_root = match &args.out {
        Some(out) => config.resolve(out)?,
        None => config.out_root()?,
    };
    let backup = sprint_index::restore_previous(&out_root)?;
    print_success(&format!(
        "restored {} from {}",
        out_root.display(),
        backup.display()
    ));
    Ok(())
}
