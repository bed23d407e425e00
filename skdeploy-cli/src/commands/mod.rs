//! Subcommand implementations.

pub mod deploy;
pub mod plan;

use anyhow::{Context, Result};

use skdeploy_build::EggBuilder;
use skdeploy_client::HttpClient;
use skdeploy_sync::{pipeline, DeployError, DeployReport};

use crate::config::{self, Settings, SettingsArgs, TerminalPrompter};

/// Resolve settings relative to the current directory and the user config dir.
fn load_settings(args: &SettingsArgs) -> Result<Settings> {
    let cwd = std::env::current_dir().context("could not determine working directory")?;
    let user_config_dir = dirs::config_dir();
    let settings = config::resolve(args, &cwd, user_config_dir.as_deref(), &TerminalPrompter)?;
    tracing::debug!(
        url = %settings.url,
        project = %settings.project,
        jobs = settings.jobs.len(),
        project_dir = %settings.project_dir.display(),
        "settings resolved"
    );
    Ok(settings)
}

/// Wire the production collaborators into the pipeline.
fn execute(settings: &Settings, dry_run: bool) -> Result<DeployReport, DeployError> {
    let remote = HttpClient::new(settings.remote_config());
    let mut packager = EggBuilder::new(&settings.project_dir, settings.project.to_string());
    if let Some(python) = &settings.python {
        packager = packager.with_interpreter(python);
    }
    pipeline::run(&remote, &packager, &settings.project, &settings.jobs, dry_run)
}
