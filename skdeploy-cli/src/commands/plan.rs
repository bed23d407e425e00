//! `spiderkeeper-deploy plan`: what `deploy` would change, read-only.

use anyhow::Result;
use clap::Args;

use crate::config::SettingsArgs;
use crate::output;

/// Arguments for `spiderkeeper-deploy plan`.
#[derive(Args, Debug)]
pub struct PlanArgs {
    #[command(flatten)]
    pub settings: SettingsArgs,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

impl PlanArgs {
    pub fn run(self) -> Result<()> {
        let settings = super::load_settings(&self.settings)?;
        let report = super::execute(&settings, true)?;
        if self.json {
            return output::print_json(&report);
        }
        output::print_plan(&report);
        Ok(())
    }
}
