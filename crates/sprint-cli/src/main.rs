//! Sprint CLI - build, verify and inspect the flat evidence index
//!
//! - `build`: fold legacy run directories into a new published generation
//! - `verify`: check a published generation and record `verify.result.json`
//! - `rollback`: restore the generation kept by the last promotion
//! - `runs`: inspect what discovery finds without publishing

#![deny(unsafe_code)]

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod config;
mod error;
mod output;

use commands::{build, rollback, runs, verify};
use config::SprintConfig;
use error::CliResult;

/// Sprint CLI application
#[derive(Parser)]
#[command(name = "sprint")]
#[command(about = "Sprint - flat evidence index builder and verifier", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path (default: ./sprint.config.json if present)
    #[arg(short, long, env = "SPRINT_CONFIG")]
    config: Option<String>,

    /// Repository root (overrides `repo_root`)
    #[arg(long)]
    repo_root: Option<String>,

    /// Output format (table, json)
    #[arg(short, long, default_value = "table")]
    output: output::OutputFormat,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands
#[derive(Subcommand)]
enum Commands {
    /// Build and publish a new index generation
    Build(build::BuildArgs),

    /// Verify a published index
    Verify(verify::VerifyArgs),

    /// Restore the previous published generation
    Rollback(rollback::RollbackArgs),

    /// Inspect discovered runs
    Runs {
        #[command(subcommand)]
        command: runs::RunsCommands,
    },

    /// Show the effective configuration
    Config,
}

fn init_tracing(verbose: bool, json: bool) {
    let filter = if verbose { "debug" } else { "info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| filter.into());
    let registry = tracing_subscriber::registry().with(env_filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .without_time()
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

fn main() -> CliResult<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose, cli.log_json);

    let mut config = SprintConfig::load(cli.config.as_deref())?;
    if let Some(repo_root) = cli.repo_root {
        config.repo_root = repo_root;
        config.validate()?;
    }
    tracing::debug!(repo_root = %config.repo_root, out_dir = %config.out_dir, "configuration loaded");

    match cli.command {
        Commands::Build(args) => build::execute(args, &config, cli.output),
        Commands::Verify(args) => {
            if !verify::execute(args, &config, cli.output)? {
                std::process::exit(1);
            }
            Ok(())
        }
        Commands::Rollback(args) => rollback::execute(args, &config),
        Commands::Runs { command } => runs::execute(command, &config, cli.output),
        Commands::Config => {
            let out_root = config.out_root()?;
            let effective = serde_json::json!({
                "config": &config,
                "resolved": {
                    "repo_root": config.repo_root()?,
                    "out_root": &out_root,
                    "ledger_path": config.ledger_path(&out_root)?,
                    "reference_doc": config.reference_doc()?,
                },
            });
            output::print_json(&effective)
        }
    }
}
