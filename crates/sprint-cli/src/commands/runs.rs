//! `sprint runs`: inspect discovered runs without publishing anything

use std::collections::BTreeMap;

use clap::Subcommand;
use serde::Serialize;
use sprint_index::{assign, discover, preview_runs, RunIdLedger};
use sprint_types::AssignedRun;
use tabled::Tabled;

use crate::config::SprintConfig;
use crate::error::CliResult;
use crate::output::{print_json, print_json_lines, print_rows, OutputFormat};

/// Prompts listed by `runs summary`.
const TOP_PROMPTS: usize = 20;

#[derive(Debug, Subcommand)]
pub enum RunsCommands {
    /// Run and prompt counts per source family
    Summary,

    /// List runs in index order
    List {
        /// Only runs whose prompt slug contains this text
        #[arg(short, long)]
        prompt: Option<String>,

        /// Maximum rows to print
        #[arg(short, long)]
        limit: Option<usize>,
    },
}

#[derive(Debug, Serialize, Tabled)]
struct RunRow {
    #[tabled(rename = "RUN KEY")]
    run_key: String,
    #[tabled(rename = "FAMILY")]
    source_family: String,
    #[tabled(rename = "LABEL")]
    source_run_label: String,
    #[tabled(rename = "FILES")]
    file_count: usize,
    #[tabled(rename = "BYTES")]
    total_bytes: u64,
}

impl From<&AssignedRun> for RunRow {
    fn from(run: &AssignedRun) -> Self {
        Self {
            run_key: run.run_key.clone(),
            source_family: run.run.source_family.clone(),
            source_run_label: run.run.source_run_label.clone(),
            file_count: run.run.file_count(),
            total_bytes: run.run.total_bytes,
        }
    }
}

#[derive(Debug, Serialize, Tabled)]
struct PromptRow {
    #[tabled(rename = "PROMPT")]
    prompt_slug: String,
    #[tabled(rename = "RUNS")]
    runs: usize,
}

#[derive(Debug, Serialize)]
struct RunsSummary {
    run_count: usize,
    prompt_count: usize,
    families: BTreeMap<String, usize>,
    top_prompts: Vec<PromptRow>,
}

impl RunsSummary {
    fn from_runs(runs: &[AssignedRun]) -> Self {
        let mut families: BTreeMap<String, usize> = BTreeMap::new();
        let mut prompts: BTreeMap<&str, usize> = BTreeMap::new();
        for run in runs {
            *families.entry(run.run.source_family.clone()).or_default() += 1;
            *prompts.entry(run.prompt_slug()).or_default() += 1;
        }

        let prompt_count = prompts.len();
        let mut ranked: Vec<(&str, usize)> = prompts.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        let top_prompts = ranked
            .into_iter()
            .take(TOP_PROMPTS)
            .map(|(slug, runs)| PromptRow {
                prompt_slug: slug.to_string(),
                runs,
            })
            .collect();

        Self {
            run_count: runs.len(),
            prompt_count,
            families,
            top_prompts,
        }
    }
}

/// Discover runs and label them with the configured ledger, read-only.
fn load_runs(config: &SprintConfig) -> CliResult<Vec<AssignedRun>> {
    let repo_root = config.repo_root()?;
    let layouts = &config.discovery.layouts;
    let runs = match config.ledger_path(&config.out_root()?)? {
        Some(path) => assign(discover(&repo_root, layouts), Some(RunIdLedger::load(&path))).0,
        None => preview_runs(&repo_root, layouts),
    };
    Ok(runs)
}

pub fn execute(command: RunsCommands, config: &SprintConfig, format: OutputFormat) -> CliResult<()> {
    let runs = load_runs(config)?;
    match command {
        RunsCommands::Summary => {
            let summary = RunsSummary::from_runs(&runs);
            match format {
                OutputFormat::Json => print_json(&summary)?,
                OutputFormat::Table => {
                    println!("runs:    {}", summary.run_count);
                    println!("prompts: {}", summary.prompt_count);
                    for (family, count) in &summary.families {
                        println!("  {family}: {count}");
                    }
                    print_rows(summary.top_prompts, format)?;
                }
            }
        }
        RunsCommands::List { prompt, limit } => {
            let selected = runs
                .iter()
                .filter(|run| prompt.as_deref().map_or(true, |p| run.prompt_slug().contains(p)))
                .take(limit.unwrap_or(usize::MAX));
            match format {
                OutputFormat::Json => print_json_lines(selected)?,
                OutputFormat::Table => print_rows(selected.map(RunRow::from).collect(), format)?,
            }
        }
    }
    Ok(())
}
