//! Shared drivers for the scenario tests
#![allow(dead_code)]

use hhgap_core::{
    NeuronConfig, Observable, Recordable, Result, SpikeEmission, StatusUpdate, TraubNeuron,
    WfrRound,
};

/// Authoritative-only driver for an uncoupled neuron
pub fn run_slices(neuron: &mut TraubNeuron, slices: u64) -> Result<Vec<SpikeEmission>> {
    let min_delay = neuron.slice_config().min_delay;
    let mut spikes = Vec::new();
    for s in 0..slices {
        let outcome = neuron.update(s * min_delay as u64, 0, min_delay)?;
        spikes.extend(outcome.spikes);
    }
    Ok(spikes)
}

/// Like [`run_slices`] but samples one recordable after every step
pub fn trace(neuron: &mut TraubNeuron, steps: u64, recordable: Recordable) -> Result<Vec<f64>> {
    let min_delay = neuron.slice_config().min_delay as u64;
    let mut samples = Vec::with_capacity(steps as usize);
    for step in 0..steps {
        let origin = step - step % min_delay;
        let lag = (step - origin) as usize;
        neuron.update(origin, lag, lag + 1)?;
        samples.push(neuron.read(recordable));
    }
    Ok(samples)
}

/// Two neurons joined by a symmetric gap junction
pub struct CoupledPair {
    pub a: TraubNeuron,
    pub b: TraubNeuron,
    pub weight: f64,
}

/// Rounds run for one slice, per neuron
#[derive(Debug, Default)]
pub struct SliceReport {
    pub rounds_a: Vec<WfrRound>,
    pub rounds_b: Vec<WfrRound>,
    pub spikes_a: Vec<SpikeEmission>,
    pub spikes_b: Vec<SpikeEmission>,
}

impl CoupledPair {
    pub fn new(a: TraubNeuron, b: TraubNeuron, weight: f64) -> Self {
        Self { a, b, weight }
    }

    fn exchange(&mut self) -> Result<()> {
        let to_b = self.a.gap_output(self.weight);
        let to_a = self.b.gap_output(self.weight);
        self.a.handle_gap(&to_a)?;
        self.b.handle_gap(&to_b)
    }

    /// Relax until both neurons converge, then commit the slice
    pub fn step_slice(&mut self, origin: u64) -> Result<SliceReport> {
        let min_delay = self.a.slice_config().min_delay;
        let mut report = SliceReport::default();
        loop {
            self.exchange()?;
            let ra = self.a.wfr_update(origin, 0, min_delay)?;
            let rb = self.b.wfr_update(origin, 0, min_delay)?;
            let done = ra.converged && rb.converged;
            report.rounds_a.push(ra);
            report.rounds_b.push(rb);
            if done {
                break;
            }
        }
        self.exchange()?;
        report.spikes_a = self.a.update(origin, 0, min_delay)?.spikes;
        report.spikes_b = self.b.update(origin, 0, min_delay)?.spikes;
        Ok(report)
    }

    /// Run `slices` consecutive slices
    pub fn run(&mut self, slices: u64) -> Result<Vec<SliceReport>> {
        let min_delay = self.a.slice_config().min_delay as u64;
        (0..slices).map(|s| self.step_slice(s * min_delay)).collect()
    }
}

/// Neuron starting from the unbiased rest, then switched to a constant
/// bias current
pub fn biased(config: NeuronConfig, i_e: f64) -> Result<TraubNeuron> {
    let mut neuron = TraubNeuron::new(config)?;
    neuron.set_status(&StatusUpdate::new().with("I_e", i_e)?)?;
    Ok(neuron)
}

/// Route core `log` output through the test harness (`RUST_LOG=debug`)
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
