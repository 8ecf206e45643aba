//! Template experiment generation

use std::path::PathBuf;

use clap::Args;
use tracing::info;

use crate::config::ExperimentConfig;
use crate::error::{CliError, CliResult};

/// Write a template experiment file
#[derive(Args, Debug)]
pub struct InitCommand {
    /// Destination of the experiment file
    #[arg(default_value = "experiment.toml")]
    pub path: PathBuf,

    /// Overwrite an existing file
    #[arg(long)]
    pub force: bool,
}

impl InitCommand {
    /// Execute the init command
    pub fn execute(self) -> CliResult<()> {
        if self.path.exists() && !self.force {
            return Err(CliError::invalid_args(format!(
                "{} already exists (use --force to overwrite)",
                self.path.display()
            )));
        }
        let template = ExperimentConfig {
            duration_ms: Some(100.0),
            seed: Some(42),
            ..ExperimentConfig::default()
        };
        template.save_to_file(&self.path)?;
        info!("wrote experiment template to {}", self.path.display());
        Ok(())
    }
}
