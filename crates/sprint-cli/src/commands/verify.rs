//! `sprint verify`

use std::path::PathBuf;

use clap::Args;
use colored::*;
use sprint_verify::{Phase, Verdict, Verifier};

use crate::config::SprintConfig;
use crate::error::CliResult;
use crate::output::{print_error, print_json, print_warning, OutputFormat};

#[derive(Debug, Args)]
pub struct VerifyArgs {
    /// Published root to verify (overrides `out_dir`)
    #[arg(long)]
    pub root: Option<String>,

    /// Layout contract: 1, 2, 3 or all (overrides `verify.phase`)
    #[arg(long)]
    pub phase: Option<Phase>,

    /// Canonical README used for drift checks
    #[arg(long)]
    pub reference_doc: Option<String>,
}

pub fn verifier(args: &VerifyArgs, config: &SprintConfig) -> CliResult<Verifier> {
    let root: PathBuf = match &args.root {
        Some(root) => config.resolve(root)?,
        None => config.out_root()?,
    };
    let reference_doc = match &args.reference_doc {
        Some(doc) => config.resolve(doc)?,
        None => config.reference_doc()?,
    };
    let phase = match args.phase {
        Some(phase) => phase,
        None => config.phase()?,
    };
    Ok(Verifier::new(root, reference_doc)
        .with_phase(phase)
        .with_guard(config.verify.guardrails.clone()))
}

/// Returns whether the verdict passed.
pub fn execute(args: VerifyArgs, config: &SprintConfig, format: OutputFormat) -> CliResult<bool> {
    let (verdict, path) = verifier(&args, config)?.run_and_record()?;
    match format {
        OutputFormat::Json => print_json(&verdict)?,
        OutputFormat::Table => print_verdict(&verdict, &path),
    }
    Ok(verdict.ok)
}

fn print_verdict(verdict: &Verdict, path: &std::path::Path) {
    let status = if verdict.ok {
        "PASS".green().bold()
    } else {
        "FAIL".red().bold()
    };
    println!(
        "verify result: {} ({}) checks={}",
        status,
        path.display(),
        verdict.checks_run
    );
    for error in &verdict.errors {
        print_error(error);
    }
    for warning in &verdict.warnings {
        print_warning(warning);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_flag_parses_with_from_str() {
        use clap::Parser;

        #[derive(Parser)]
        struct Harness {
            #[command(flatten)]
            args: VerifyArgs,
        }

        let harness = Harness::try_parse_from(["verify", "--phase", "all", "--root", "/x"]).unwrap();
        assert_eq!(harness.args.phase, Some(Phase::All));
        assert!(Harness::try_parse_from(["verify", "--phase", "9"]).is_err());
    }
}
