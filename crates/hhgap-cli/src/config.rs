//! Experiment files for the hhgap CLI
//!
//! An experiment is a TOML document with a `[neuron]` table (parameters,
//! time grid, solver and relaxation settings) plus stimulus and recording
//! sections. Every field is optional.

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::error::{CliError, CliResult};
use hhgap_core::NeuronConfig;

/// Full description of one run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    /// Simulated duration (ms)
    pub duration_ms: Option<f64>,
    /// Seed for stochastic stimuli
    pub seed: Option<u64>,
    /// Construction recipe shared by every neuron of the run
    pub neuron: NeuronConfig,
    /// Input to the (leading) neuron
    pub stimulus: StimulusConfig,
    /// Gap-junction settings for the pair command
    pub coupling: CouplingConfig,
    /// What to record
    pub record: RecordConfig,
}

/// Stimulus delivered to a neuron
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StimulusConfig {
    /// Explicit spike arrival times (ms)
    pub spike_times_ms: Vec<f64>,
    /// Weight of the explicit spikes (nS, negative for inhibition)
    pub spike_weight: f64,
    /// Poisson background rate (Hz), 0 disables it
    pub poisson_rate_hz: f64,
    /// Weight of Poisson spikes (nS)
    pub poisson_weight: f64,
    /// Amplitude of a current step (pA)
    pub current_pa: f64,
    /// Step onset (ms)
    pub current_start_ms: f64,
    /// Step offset (ms), unbounded if absent
    pub current_stop_ms: Option<f64>,
}

impl Default for StimulusConfig {
    fn default() -> Self {
        Self {
            spike_times_ms: Vec::new(),
            spike_weight: 1.0,
            poisson_rate_hz: 0.0,
            poisson_weight: 1.0,
            current_pa: 0.0,
            current_start_ms: 0.0,
            current_stop_ms: None,
        }
    }
}

/// Electrical coupling of the pair command
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CouplingConfig {
    /// Gap-junction conductance (nS)
    pub weight: f64,
}

impl Default for CouplingConfig {
    fn default() -> Self {
        Self { weight: 5.0 }
    }
}

/// Recording selection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordConfig {
    /// Recordable names sampled after every step
    pub recordables: Vec<String>,
    /// Sampling interval in steps
    pub interval_steps: u64,
}

impl Default for RecordConfig {
    fn default() -> Self {
        Self {
            recordables: vec!["V_m".to_string()],
            interval_steps: 1,
        }
    }
}

impl ExperimentConfig {
    /// Load an experiment; a missing file yields the defaults
    pub fn load_from_file(path: &Path) -> CliResult<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("reading experiment {}", path.display()))?;
            toml::from_str(&content)
                .map_err(|e| CliError::config(format!("Invalid experiment file: {}", e)))
        } else {
            Ok(Self::default())
        }
    }

    /// Save an experiment
    pub fn save_to_file(&self, path: &Path) -> CliResult<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| CliError::config(format!("Failed to serialize experiment: {}", e)))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, content)
            .with_context(|| format!("writing experiment {}", path.display()))?;
        Ok(())
    }

    /// Check everything the engine does not check itself
    pub fn validate(&self) -> CliResult<()> {
        self.neuron.validate()?;
        if let Some(duration) = self.duration_ms {
            if !(duration > 0.0) {
                return Err(CliError::config(format!("duration_ms must be > 0, got {}", duration)));
            }
        }
        if self.stimulus.poisson_rate_hz < 0.0 {
            return Err(CliError::config("poisson_rate_hz must be >= 0"));
        }
        if self.record.interval_steps == 0 {
            return Err(CliError::config("record.interval_steps must be >= 1"));
        }
        if !(self.coupling.weight >= 0.0) {
            return Err(CliError::config("coupling.weight must be >= 0"));
        }
        Ok(())
    }
}
