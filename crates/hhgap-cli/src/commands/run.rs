//! Single-neuron simulation

use std::collections::BTreeMap;
use std::path::PathBuf;

use clap::Args;
use serde::Serialize;
use tracing::{debug, info};

use super::{build_neuron, emit_json, load_experiment, parse_key_val};
use crate::config::ExperimentConfig;
use crate::error::{CliError, CliResult};
use crate::stimulus::StimulusSource;
use hhgap_core::recordables::Accessor;
use hhgap_core::{Observable, TraubNeuron};

/// Default simulated duration (ms)
pub const DEFAULT_DURATION_MS: f64 = 100.0;

/// Simulate a single neuron
#[derive(Args, Debug)]
pub struct RunCommand {
    /// Experiment file (TOML)
    #[arg(short, long)]
    pub experiment: Option<PathBuf>,

    /// Simulated duration in ms (overrides the experiment)
    #[arg(long)]
    pub duration_ms: Option<f64>,

    /// Random seed for Poisson input (overrides the experiment)
    #[arg(long)]
    pub seed: Option<u64>,

    /// Parameter or state overrides (NAME=value)
    #[arg(long = "set", value_parser = parse_key_val::<String, f64>)]
    pub overrides: Vec<(String, f64)>,

    /// Output file for the JSON report (stdout if absent)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Outcome of a single-neuron run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Simulated duration (ms)
    pub duration_ms: f64,
    /// Spike times (ms)
    pub spike_times_ms: Vec<f64>,
    /// Interval between samples (ms)
    pub sample_interval_ms: f64,
    /// Samples per recordable
    pub samples: BTreeMap<String, Vec<f64>>,
    /// Membrane potential at the end of the run (mV)
    pub final_v_m: f64,
    /// Input spikes delivered
    pub input_spikes: usize,
}

impl RunCommand {
    /// Execute the run command
    pub fn execute(self) -> CliResult<()> {
        let mut experiment = load_experiment(self.experiment.as_deref())?;
        if self.duration_ms.is_some() {
            experiment.duration_ms = self.duration_ms;
        }
        if self.seed.is_some() {
            experiment.seed = self.seed;
        }

        let report = simulate_single(&experiment, &self.overrides)?;
        info!(
            "simulated {} ms: {} spikes, final V_m {:.3} mV",
            report.duration_ms,
            report.spike_times_ms.len(),
            report.final_v_m
        );
        emit_json(&report, self.output.as_deref())
    }
}

/// Resolve recordable names against the neuron registry
pub(crate) fn resolve_recordables(
    names: &[String],
) -> CliResult<Vec<(String, Accessor<TraubNeuron>)>> {
    names
        .iter()
        .map(|name| {
            TraubNeuron::recordables()
                .get(name)
                .map(|accessor| (name.clone(), accessor))
                .ok_or_else(|| {
                    let known: Vec<_> = TraubNeuron::recordables().names().collect();
                    CliError::config(format!(
                        "unknown recordable `{}` (known: {})",
                        name,
                        known.join(", ")
                    ))
                })
        })
        .collect()
}

/// Number of whole slices covering `duration_ms`
pub(crate) fn slice_count(experiment: &ExperimentConfig) -> u64 {
    let slice = &experiment.neuron.slice;
    let duration = experiment.duration_ms.unwrap_or(DEFAULT_DURATION_MS);
    let steps = u64::from(slice.steps(duration)).max(1);
    steps.div_ceil(slice.min_delay as u64)
}

/// Run one neuron through the experiment
pub fn simulate_single(experiment: &ExperimentConfig, overrides: &[(String, f64)]) -> CliResult<RunReport> {
    experiment.validate()?;
    let mut neuron = build_neuron(&experiment.neuron, overrides)?;
    let recorders = resolve_recordables(&experiment.record.recordables)?;

    let slice = experiment.neuron.slice.clone();
    let min_delay = slice.min_delay as u64;
    let slices = slice_count(experiment);
    let interval = experiment.record.interval_steps;
    let mut source = StimulusSource::new(&experiment.stimulus, &slice, experiment.seed.unwrap_or(0));

    let mut samples: BTreeMap<String, Vec<f64>> = recorders
        .iter()
        .map(|(name, _)| (name.clone(), Vec::new()))
        .collect();
    let mut spike_times_ms = Vec::new();
    let mut input_spikes = 0;

    for s in 0..slices {
        let origin = s * min_delay;
        input_spikes += source.deliver(&mut neuron, origin, origin + min_delay)?;

        for lag in 0..slice.min_delay {
            let outcome = neuron.update(origin, lag, lag + 1)?;
            for spike in outcome.spikes {
                debug!("spike at {:.2} ms", spike.time_ms(slice.resolution_ms));
                spike_times_ms.push(spike.time_ms(slice.resolution_ms));
            }
            if (origin + lag as u64 + 1) % interval == 0 {
                for (name, accessor) in &recorders {
                    if let Some(trace) = samples.get_mut(name) {
                        trace.push(accessor(&neuron));
                    }
                }
            }
        }
    }

    Ok(RunReport {
        duration_ms: (slices * min_delay) as f64 * slice.resolution_ms,
        spike_times_ms,
        sample_interval_ms: interval as f64 * slice.resolution_ms,
        samples,
        final_v_m: neuron.membrane_potential(),
        input_spikes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quiet_run_stays_at_rest() {
        let experiment = ExperimentConfig {
            duration_ms: Some(5.0),
            ..ExperimentConfig::default()
        };
        let report = simulate_single(&experiment, &[]).unwrap();
        assert!(report.spike_times_ms.is_empty());
        assert_eq!(report.samples["V_m"].len(), 50);
        assert!((report.duration_ms - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_current_step_drives_spikes() {
        let mut experiment = ExperimentConfig {
            duration_ms: Some(60.0),
            ..ExperimentConfig::default()
        };
        experiment.stimulus.current_pa = 2000.0;
        experiment.record.recordables = vec!["V_m".into(), "Act_n".into()];
        experiment.record.interval_steps = 10;

        let report = simulate_single(&experiment, &[]).unwrap();
        assert!(!report.spike_times_ms.is_empty());
        assert_eq!(report.samples["Act_n"].len(), 60);
        assert!(report.spike_times_ms.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_unknown_recordable_rejected() {
        let mut experiment = ExperimentConfig::default();
        experiment.record.recordables = vec!["I_syn".into()];
        assert!(matches!(
            simulate_single(&experiment, &[]),
            Err(CliError::Config(_))
        ));
    }
}
