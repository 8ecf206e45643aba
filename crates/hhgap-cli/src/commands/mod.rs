//! CLI command implementations for hhgap

use std::path::Path;

use clap::{Parser, Subcommand};

use crate::config::ExperimentConfig;
use crate::error::{CliError, CliResult};
use hhgap_core::{NeuronConfig, StatusUpdate, TraubNeuron};

pub mod init;
pub mod pair;
pub mod run;

/// hhgap - gap-junction Traub neuron driver
#[derive(Parser, Debug)]
#[command(
    name = "hhgap",
    version,
    about = "Drive Traub-Miles neurons with beta synapses and gap junctions",
    long_about = "hhgap integrates single-compartment Traub-Miles neurons from a TOML \
                  experiment file: a single neuron under spike and current stimuli, or a \
                  gap-coupled pair resolved by waveform relaxation."
)]
pub struct HhgapCli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write a template experiment file
    #[command(alias = "new")]
    Init(init::InitCommand),

    /// Simulate a single neuron
    Run(run::RunCommand),

    /// Simulate a gap-coupled pair
    Pair(pair::PairCommand),
}

impl HhgapCli {
    /// Execute the CLI command
    pub fn execute(self) -> CliResult<()> {
        match self.command {
            Commands::Init(cmd) => cmd.execute(),
            Commands::Run(cmd) => cmd.execute(),
            Commands::Pair(cmd) => cmd.execute(),
        }
    }
}

/// Load the experiment file if given, else the defaults
pub(crate) fn load_experiment(path: Option<&Path>) -> CliResult<ExperimentConfig> {
    match path {
        Some(path) if !path.exists() => Err(CliError::invalid_args(format!(
            "experiment file {} not found",
            path.display()
        ))),
        Some(path) => ExperimentConfig::load_from_file(path),
        None => Ok(ExperimentConfig::default()),
    }
}

/// Build a neuron and apply `NAME=value` overrides on top of its config
pub(crate) fn build_neuron(config: &NeuronConfig, overrides: &[(String, f64)]) -> CliResult<TraubNeuron> {
    let mut neuron = TraubNeuron::new(config.clone())?;
    if !overrides.is_empty() {
        let mut update = StatusUpdate::new();
        for (name, value) in overrides {
            update.set(name, *value)?;
        }
        neuron.set_status(&update)?;
    }
    Ok(neuron)
}

/// Write a JSON report to `output` or stdout
pub(crate) fn emit_json<T: serde::Serialize>(report: &T, output: Option<&Path>) -> CliResult<()> {
    let text = serde_json::to_string_pretty(report)?;
    match output {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, text)?;
            tracing::info!("report written to {}", path.display());
        }
        None => println!("{}", text),
    }
    Ok(())
}

/// Parse a single key-value pair
pub(crate) fn parse_key_val<T, U>(
    s: &str,
) -> Result<(T, U), Box<dyn std::error::Error + Send + Sync + 'static>>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    U: std::str::FromStr,
    U::Err: std::error::Error + Send + Sync + 'static,
{
    let pos = s
        .find('=')
        .ok_or_else(|| format!("invalid KEY=value: no `=` found in `{s}`"))?;
    Ok((s[..pos].parse()?, s[pos + 1..].parse()?))
}
