//! `spiderkeeper-deploy deploy`: build, upload and reconcile jobs.

use anyhow::Result;
use clap::Args;

use crate::config::SettingsArgs;
use crate::output;

/// Arguments for `spiderkeeper-deploy deploy`.
#[derive(Args, Debug)]
pub struct DeployArgs {
    #[command(flatten)]
    pub settings: SettingsArgs,

    /// Show the plan without building, uploading or changing any job.
    #[arg(long)]
    pub dry_run: bool,

    /// Emit a machine-readable JSON report.
    #[arg(long)]
    pub json: bool,
}

impl DeployArgs {
    pub fn run(self) -> Result<()> {
        let settings = super::load_settings(&self.settings)?;
        let report = super::execute(&settings, self.dry_run)?;

        if self.json {
            return output::print_json(&report);
        }
        if report.dry_run {
            output::print_plan(&report);
        } else {
            output::print_deploy(&report);
        }
        Ok(())
    }
}
