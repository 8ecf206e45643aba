//! Gap-coupled pair simulation
//!
//! The leader receives the experiment's stimulus, the follower only the
//! gap-junction current. Every slice is relaxed until both neurons report
//! convergence and then committed.

use std::path::PathBuf;

use clap::Args;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::run::slice_count;
use super::{build_neuron, emit_json, load_experiment, parse_key_val};
use crate::config::ExperimentConfig;
use crate::error::CliResult;
use crate::stimulus::StimulusSource;
use hhgap_core::TraubNeuron;

/// Simulate a gap-coupled pair
#[derive(Args, Debug)]
pub struct PairCommand {
    /// Experiment file (TOML)
    #[arg(short, long)]
    pub experiment: Option<PathBuf>,

    /// Simulated duration in ms (overrides the experiment)
    #[arg(long)]
    pub duration_ms: Option<f64>,

    /// Gap-junction conductance in nS (overrides the experiment)
    #[arg(long)]
    pub weight: Option<f64>,

    /// Leader parameter or state overrides (NAME=value)
    #[arg(long = "set", value_parser = parse_key_val::<String, f64>)]
    pub overrides: Vec<(String, f64)>,

    /// Output file for the JSON report (stdout if absent)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Outcome of a pair run
#[derive(Debug, Clone, Serialize)]
pub struct PairReport {
    /// Simulated duration (ms)
    pub duration_ms: f64,
    /// Gap-junction conductance (nS)
    pub weight: f64,
    /// Leader spike times (ms)
    pub leader_spikes_ms: Vec<f64>,
    /// Follower spike times (ms)
    pub follower_spikes_ms: Vec<f64>,
    /// Relaxation rounds needed per slice
    pub rounds_per_slice: Vec<u32>,
    /// Slices accepted without reaching the tolerance
    pub forced_slices: usize,
    /// Leader potential at the end of every slice (mV)
    pub leader_v_m: Vec<f64>,
    /// Follower potential at the end of every slice (mV)
    pub follower_v_m: Vec<f64>,
}

impl PairCommand {
    /// Execute the pair command
    pub fn execute(self) -> CliResult<()> {
        let mut experiment = load_experiment(self.experiment.as_deref())?;
        if self.duration_ms.is_some() {
            experiment.duration_ms = self.duration_ms;
        }
        if let Some(weight) = self.weight {
            experiment.coupling.weight = weight;
        }

        let report = simulate_pair(&experiment, &self.overrides)?;
        let mean_rounds = report.rounds_per_slice.iter().map(|r| f64::from(*r)).sum::<f64>()
            / report.rounds_per_slice.len().max(1) as f64;
        info!(
            "simulated {} ms: leader {} spikes, follower {} spikes, {:.2} rounds per slice",
            report.duration_ms,
            report.leader_spikes_ms.len(),
            report.follower_spikes_ms.len(),
            mean_rounds
        );
        if report.forced_slices > 0 {
            warn!("{} slices accepted without convergence", report.forced_slices);
        }
        emit_json(&report, self.output.as_deref())
    }
}

fn exchange(leader: &mut TraubNeuron, follower: &mut TraubNeuron, weight: f64) -> CliResult<()> {
    let to_follower = leader.gap_output(weight);
    let to_leader = follower.gap_output(weight);
    leader.handle_gap(&to_leader)?;
    follower.handle_gap(&to_follower)?;
    Ok(())
}

/// Run a leader/follower pair through the experiment
pub fn simulate_pair(experiment: &ExperimentConfig, overrides: &[(String, f64)]) -> CliResult<PairReport> {
    experiment.validate()?;
    let weight = experiment.coupling.weight;
    let mut leader = build_neuron(&experiment.neuron, overrides)?;
    let mut follower = build_neuron(&experiment.neuron, &[])?;

    let slice = experiment.neuron.slice.clone();
    let min_delay = slice.min_delay;
    let slices = slice_count(experiment);
    let mut source = StimulusSource::new(&experiment.stimulus, &slice, experiment.seed.unwrap_or(0));

    let mut report = PairReport {
        duration_ms: (slices * min_delay as u64) as f64 * slice.resolution_ms,
        weight,
        leader_spikes_ms: Vec::new(),
        follower_spikes_ms: Vec::new(),
        rounds_per_slice: Vec::with_capacity(slices as usize),
        forced_slices: 0,
        leader_v_m: Vec::with_capacity(slices as usize),
        follower_v_m: Vec::with_capacity(slices as usize),
    };

    for s in 0..slices {
        let origin = s * min_delay as u64;
        source.deliver(&mut leader, origin, origin + min_delay as u64)?;

        let mut rounds = 0;
        let mut forced = false;
        loop {
            exchange(&mut leader, &mut follower, weight)?;
            let a = leader.wfr_update(origin, 0, min_delay)?;
            let b = follower.wfr_update(origin, 0, min_delay)?;
            rounds += 1;
            forced |= a.forced || b.forced;
            if a.converged && b.converged {
                debug!(
                    "slice {} converged after {} rounds (deviation {:.2e}/{:.2e} mV)",
                    s, rounds, a.max_deviation, b.max_deviation
                );
                break;
            }
        }

        exchange(&mut leader, &mut follower, weight)?;
        let a = leader.update(origin, 0, min_delay)?;
        let b = follower.update(origin, 0, min_delay)?;

        report
            .leader_spikes_ms
            .extend(a.spikes.iter().map(|spike| spike.time_ms(slice.resolution_ms)));
        report
            .follower_spikes_ms
            .extend(b.spikes.iter().map(|spike| spike.time_ms(slice.resolution_ms)));
        report.rounds_per_slice.push(rounds);
        report.forced_slices += usize::from(forced);
        report.leader_v_m.push(a.v_m);
        report.follower_v_m.push(b.v_m);
    }

    Ok(report)
}
