//! spiderkeeper-deploy: publish a Scrapy project and its job schedule to
//! SpiderKeeper.
//!
//! # Usage
//!
//! ```text
//! spiderkeeper-deploy deploy [--url URL] [--project NAME] [--jobs JSON] [--dry-run] [--json]
//! spiderkeeper-deploy plan   [--url URL] [--project NAME] [--jobs JSON] [--json]
//! ```
//!
//! Settings not given as flags are read from `skdeploy.yaml` (nearest
//! ancestor of the working directory), then from the user config file, then
//! prompted for.

mod commands;
mod config;
mod output;

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use colored::Colorize;

use commands::{deploy::DeployArgs, plan::PlanArgs};
use skdeploy_sync::{DeployError, RemoteState};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "spiderkeeper-deploy",
    version,
    about = "Deploy a Scrapy project and its job schedule to SpiderKeeper",
    long_about = None,
)]
struct Cli {
    /// Log more (-v info, -vv debug). RUST_LOG applies when not given.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build and upload the egg, then reconcile the project's jobs.
    Deploy(DeployArgs),

    /// Show the job changes a deploy would make, without making them.
    Plan(PlanArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Deploy(args) => args.run(),
        Commands::Plan(args) => args.run(),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{} {err:#}", "error:".red().bold());
            if let Some(deploy_err) = err.downcast_ref::<DeployError>() {
                eprintln!("{}", remote_state_hint(deploy_err));
            }
            ExitCode::FAILURE
        }
    }
}

fn remote_state_hint(err: &DeployError) -> String {
    match err.remote_state() {
        RemoteState::Unchanged => format!(
            "{} no jobs on the scheduler were changed",
            "note:".bright_black().bold()
        ),
        RemoteState::PossiblyInconsistent => format!(
            "{} remote job state is possibly inconsistent; re-run deploy to converge",
            "warning:".yellow().bold()
        ),
    }
}

fn init_tracing(verbose: u8) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        _ => EnvFilter::new("debug"),
    };
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
