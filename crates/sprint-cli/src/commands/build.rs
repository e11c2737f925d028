//! `sprint build`

use clap::Args;
use sprint_index::BuildOptions;
use sprint_types::{GenerationSummary, Phase};
use tracing::debug;

use crate::config::{resolve_ledger, SprintConfig};
use crate::error::CliResult;
use crate::output::{print_info, print_json, print_success, OutputFormat};

#[derive(Debug, Args)]
pub struct BuildArgs {
    /// Published output root (overrides `out_dir`)
    #[arg(long)]
    pub out: Option<String>,

    /// Run-id ledger path, or `none` for stateless ids
    #[arg(long)]
    pub ledger_path: Option<String>,

    /// Rebuild even when the source snapshot is unchanged
    #[arg(long)]
    pub full: bool,

    /// Canonical README copied into the generation
    #[arg(long)]
    pub reference_doc: Option<String>,

    /// Layout to publish: 1, 2, 3 or all (overrides `build.phase`)
    #[arg(long)]
    pub phase: Option<Phase>,
}

pub fn options(args: &BuildArgs, config: &SprintConfig) -> CliResult<BuildOptions> {
    let out_root = match &args.out {
        Some(out) => config.resolve(out)?,
        None => config.out_root()?,
    };
    let ledger_path = match &args.ledger_path {
        Some(value) => resolve_ledger(value, &out_root, |v| config.resolve(v))?,
        None => config.ledger_path(&out_root)?,
    };
    let reference_doc = match &args.reference_doc {
        Some(doc) => config.resolve(doc)?,
        None => config.reference_doc()?,
    };
    Ok(BuildOptions {
        repo_root: config.repo_root()?,
        out_root,
        ledger_path,
        incremental: config.build.incremental && !args.full,
        reference_doc: Some(reference_doc),
        layouts: config.discovery.layouts.clone(),
        phase: match args.phase {
            Some(phase) => phase,
            None => config.build_phase()?,
        },
    })
}

pub fn execute(args: BuildArgs, config: &SprintConfig, format: OutputFormat) -> CliResult<()> {
    let options = options(&args, config)?;
    debug!(?options, "resolved build options");
    let summaries = sprint_index::build_phases(&options)?;

    match (format, summaries.as_slice()) {
        (OutputFormat::Json, [summary]) => print_json(summary)?,
        (OutputFormat::Json, all) => print_json(&all)?,
        (OutputFormat::Table, all) => all.iter().for_each(print_summary),
    }
    Ok(())
}

fn print_summary(summary: &GenerationSummary) {
    let version = &summary.evolution;
    if summary.skipped_no_changes {
        print_info(&format!(
            "{version} incremental skip: no source changes detected; reused output at {}",
            summary.output_path
        ));
        return;
    }
    match summary.copied_files {
        Some(files) => print_success(&format!(
            "{version} complete: runs={} files={files} out={}",
            summary.source_run_count, summary.output_path
        )),
        None => print_success(&format!(
            "{version} complete: runs={} indexed_artifacts={} out={}",
            summary.source_run_count, summary.indexed_artifacts, summary.output_path
        )),
    }
}
