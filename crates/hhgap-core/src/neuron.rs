//! Traub-Miles neuron with beta-function synapses and gap-junction support
//!
//! One integration routine serves both the authoritative pass
//! ([`TraubNeuron::update`]) and the tentative waveform-relaxation rounds
//! ([`TraubNeuron::wfr_update`]). Tentative rounds run between a snapshot and
//! its restore, so only the published interpolation coefficients and the
//! relaxation bookkeeping survive them.

use std::sync::OnceLock;

use crate::buffers::{EventBuffers, GapInput};
use crate::config::{NeuronConfig, SliceConfig};
use crate::dynamics::{traub_dynamics, DynamicsContext};
use crate::error::*;
use crate::events::{check_receptor, CurrentInput, EventKind, GapJunctionInput, SpikeInput};
use crate::kernel::BetaKernel;
use crate::params::{ParamUpdate, TraubParams};
use crate::recordables::{Accessor, Observable, Recordable, RecordablesMap};
use crate::spike::{SpikeDetector, SpikeEmission};
use crate::state::{State, StateIndex, StateUpdate, STATE_VEC_SIZE};
use crate::stepper::AdaptiveStepper;
use crate::wfr::{lag_coefficients, WfrConfig, WfrController, WfrPhase, WfrRound};

/// Parameter and state assignments applied together
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatusUpdate {
    /// Parameter assignments
    pub params: ParamUpdate,
    /// State assignments
    pub state: StateUpdate,
}

impl StatusUpdate {
    /// Create an empty update
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign a state element or parameter by name
    pub fn set(&mut self, name: &str, value: f64) -> Result<()> {
        if self.state.set(name, value) {
            return Ok(());
        }
        self.params.set(name, value)
    }

    /// Builder-style assignment
    pub fn with(mut self, name: &str, value: f64) -> Result<Self> {
        self.set(name, value)?;
        Ok(self)
    }
}

/// Result of an authoritative pass
#[derive(Debug, Clone, PartialEq)]
pub struct SliceOutcome {
    /// Spikes emitted, in chronological order
    pub spikes: Vec<SpikeEmission>,
    /// Membrane potential at the end of the pass (mV)
    pub v_m: f64,
}

/// Whether a pass keeps its result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PassMode {
    Commit,
    Trial,
}

/// Everything a tentative round may touch and must give back
#[derive(Debug, Clone, Copy)]
struct Snapshot {
    state: State,
    integration_step: f64,
    i_stim: f64,
}

struct Pass {
    spikes: Vec<SpikeEmission>,
    max_deviation: f64,
    coefficients: Vec<f64>,
}

/// Single-compartment conductance-based neuron
#[derive(Debug, Clone)]
pub struct TraubNeuron {
    params: TraubParams,
    state: State,
    slice: SliceConfig,

    ex_kernel: BetaKernel,
    in_kernel: BetaKernel,
    detector: SpikeDetector,

    stepper: AdaptiveStepper,
    events: EventBuffers,
    gap: GapInput,
    wfr: WfrController,
    /// Injected current applied during the next lag (pA)
    i_stim: f64,
    /// Coefficients published by the last pass
    coefficients: Vec<f64>,
    last_spike: Option<SpikeEmission>,
}

impl TraubNeuron {
    /// Create a neuron at its resting equilibrium
    pub fn new(config: NeuronConfig) -> Result<Self> {
        config.validate()?;
        let NeuronConfig {
            params,
            slice,
            solver,
            wfr,
        } = config;

        let per_lag = wfr.interpolation_order.coefficients_per_lag();
        let state = State::resting(&params);
        let mut neuron = Self {
            ex_kernel: BetaKernel::new(params.tau_rise_ex, params.tau_decay_ex)?,
            in_kernel: BetaKernel::new(params.tau_rise_in, params.tau_decay_in)?,
            detector: SpikeDetector::new(params.v_t, slice.steps(params.t_ref)),
            stepper: AdaptiveStepper::new(solver, slice.resolution_ms),
            events: EventBuffers::new(slice.buffer_len()),
            gap: GapInput::new(slice.min_delay, per_lag),
            wfr: WfrController::new(wfr, slice.min_delay),
            i_stim: 0.0,
            coefficients: Vec::new(),
            last_spike: None,
            params,
            state,
            slice,
        };
        neuron.coefficients = neuron.constant_coefficients();
        Ok(neuron)
    }

    /// Neuron with default parameters on the default grid
    pub fn with_defaults() -> Result<Self> {
        Self::new(NeuronConfig::default())
    }

    /// Recompute kernel impulses and refractory counts from the parameters
    fn calibrate(&mut self) -> Result<()> {
        self.ex_kernel = BetaKernel::new(self.params.tau_rise_ex, self.params.tau_decay_ex)?;
        self.in_kernel = BetaKernel::new(self.params.tau_rise_in, self.params.tau_decay_in)?;
        self.detector = SpikeDetector::new(self.params.v_t, self.slice.steps(self.params.t_ref));
        log::debug!(
            "calibrated: impulse ex={:.6} in={:.6}, refractory {} steps",
            self.ex_kernel.normalisation(),
            self.in_kernel.normalisation(),
            self.detector.refractory_counts()
        );
        Ok(())
    }

    /// Apply parameter and state assignments atomically
    pub fn set_status(&mut self, update: &StatusUpdate) -> Result<()> {
        let params = self.params.with_update(&update.params)?;
        let state = self.state.with_update(&update.state)?;
        self.params = params;
        self.state = state;
        self.calibrate()?;
        self.coefficients = self.constant_coefficients();
        Ok(())
    }

    /// Return to the resting equilibrium and drop every queued input
    pub fn reset(&mut self) {
        self.state = State::resting(&self.params);
        self.events.clear();
        self.gap.reset();
        self.wfr.abandon();
        self.i_stim = 0.0;
        self.stepper.set_step_size(self.slice.resolution_ms);
        self.last_spike = None;
        self.coefficients = self.constant_coefficients();
    }

    /// Validate a connection of `kind` onto `receptor`
    pub fn connect(&self, kind: EventKind, receptor: u32) -> Result<u32> {
        check_receptor(kind, receptor)
    }

    /// Queue an incoming spike
    pub fn handle_spike(&mut self, spike: &SpikeInput) -> Result<()> {
        check_receptor(EventKind::Spike, spike.receptor)?;
        self.events.add_spike(spike)
    }

    /// Queue an injected current
    pub fn handle_current(&mut self, current: &CurrentInput) -> Result<()> {
        check_receptor(EventKind::Current, current.receptor)?;
        self.events.add_current(current)
    }

    /// Accumulate a neighbour's interpolation data for the next pass
    pub fn handle_gap(&mut self, input: &GapJunctionInput) -> Result<()> {
        check_receptor(EventKind::GapJunction, input.receptor)?;
        self.gap.accumulate(input)
    }

    /// Integrate lags `[from, to)` of the slice at `origin` and commit the
    /// result: inputs are drained, spikes detected, state retained.
    pub fn update(&mut self, origin: u64, from: usize, to: usize) -> Result<SliceOutcome> {
        let pass = self.run_pass(origin, from, to, PassMode::Commit)?;

        for lag in from..to {
            // already applied during the pass
            self.events.take(origin + lag as u64)?;
        }
        self.events.advance_to(origin + to as u64);
        self.wfr.commit();
        self.coefficients = self.constant_coefficients();
        if let Some(last) = pass.spikes.last() {
            self.last_spike = Some(*last);
        }

        Ok(SliceOutcome {
            spikes: pass.spikes,
            v_m: self.state.v_m(),
        })
    }

    /// One tentative waveform-relaxation round over lags `[from, to)`.
    ///
    /// The state is restored afterwards; the round only refreshes the
    /// published coefficients and reports convergence. A round that fails
    /// leaves the neuron as [`abandon_wfr`](Self::abandon_wfr) would.
    pub fn wfr_update(&mut self, origin: u64, from: usize, to: usize) -> Result<WfrRound> {
        let pass = self.run_pass(origin, from, to, PassMode::Trial)?;
        match self.wfr.finish_round(pass.max_deviation) {
            Ok(round) => {
                self.coefficients = pass.coefficients;
                Ok(round)
            }
            Err(err) => {
                self.abandon_wfr();
                Err(err)
            }
        }
    }

    /// Discard the rounds of the current slice and fall back to the last
    /// committed state
    pub fn abandon_wfr(&mut self) {
        self.wfr.abandon();
        self.gap.reset();
        self.coefficients = self.constant_coefficients();
    }

    fn run_pass(&mut self, origin: u64, from: usize, to: usize, mode: PassMode) -> Result<Pass> {
        if from >= to || to > self.slice.min_delay {
            return Err(NeuronError::InvalidSlice {
                from,
                to,
                min_delay: self.slice.min_delay,
            });
        }

        let snapshot = self.snapshot();
        let result = self.integrate_lags(origin, from, to, mode);
        if result.is_err() || mode == PassMode::Trial {
            self.restore(&snapshot);
        }
        if result.is_err() {
            self.wfr.abandon();
        }
        self.gap.reset();
        result
    }

    fn integrate_lags(&mut self, origin: u64, from: usize, to: usize, mode: PassMode) -> Result<Pass> {
        let order = self.wfr.config().interpolation_order;
        let per_lag = order.coefficients_per_lag();
        let h = self.slice.resolution_ms;

        let mut coefficients = vec![0.0; self.slice.min_delay * per_lag];
        let mut spikes = Vec::new();
        let mut max_deviation = 0.0f64;
        let mut f = [0.0; STATE_VEC_SIZE];

        for lag in from..to {
            let step = origin + lag as u64;
            let ctx = DynamicsContext {
                params: &self.params,
                i_stim: self.i_stim,
                gap: self.gap.drive(lag, h),
            };

            let y_i = self.state.v_m();
            let hf_i = if mode == PassMode::Trial && order.needs_slope() {
                traub_dynamics(0.0, &self.state.y, &mut f, &ctx);
                h * f[StateIndex::VM.idx()]
            } else {
                0.0
            };

            self.detector.begin_lag(y_i);
            self.stepper
                .integrate(traub_dynamics, &ctx, &mut self.state.y, h)
                .map_err(|failure| NeuronError::integration_failure(step, failure.to_string()))?;

            let inputs = self.events.peek(step)?;
            self.state.y[StateIndex::DgExc.idx()] += self.ex_kernel.impulse(inputs.spike_exc);
            self.state.y[StateIndex::DgInh.idx()] += self.in_kernel.impulse(inputs.spike_inh);

            match mode {
                PassMode::Commit => {
                    if self.detector.check(&mut self.state) {
                        let spike = SpikeEmission {
                            step: step + 1,
                            lag,
                        };
                        log::trace!("spike at step {} (V_m={:.2} mV)", spike.step, self.state.v_m());
                        spikes.push(spike);
                    }
                    self.i_stim = inputs.current;
                }
                PassMode::Trial => {
                    let y_ip1 = self.state.v_m();
                    max_deviation = max_deviation.max(self.wfr.record_sample(lag, y_ip1));

                    let hf_ip1 = if order.needs_slope() {
                        traub_dynamics(h, &self.state.y, &mut f, &ctx);
                        h * f[StateIndex::VM.idx()]
                    } else {
                        0.0
                    };
                    let slot = lag * per_lag;
                    lag_coefficients(
                        order,
                        y_i,
                        y_ip1,
                        hf_i,
                        hf_ip1,
                        &mut coefficients[slot..slot + per_lag],
                    );
                }
            }
        }

        Ok(Pass {
            spikes,
            max_deviation,
            coefficients,
        })
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            state: self.state,
            integration_step: self.stepper.step_size(),
            i_stim: self.i_stim,
        }
    }

    fn restore(&mut self, snapshot: &Snapshot) {
        self.state = snapshot.state;
        self.stepper.set_step_size(snapshot.integration_step);
        self.i_stim = snapshot.i_stim;
    }

    /// Constant extrapolation of the current potential over a whole slice
    fn constant_coefficients(&self) -> Vec<f64> {
        let per_lag = self.wfr.config().interpolation_order.coefficients_per_lag();
        let mut coefficients = vec![0.0; self.slice.min_delay * per_lag];
        let v = self.state.v_m();
        for lag in 0..self.slice.min_delay {
            coefficients[lag * per_lag] = v;
        }
        coefficients
    }

    /// Interpolation coefficients published by the last pass
    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    /// Package the published coefficients for a neighbour
    pub fn gap_output(&self, weight: f64) -> GapJunctionInput {
        GapJunctionInput::new(weight, self.coefficients.clone())
    }

    /// Model parameters
    pub fn params(&self) -> &TraubParams {
        &self.params
    }

    /// Current state
    pub fn state(&self) -> &State {
        &self.state
    }

    /// Time grid
    pub fn slice_config(&self) -> &SliceConfig {
        &self.slice
    }

    /// Waveform-relaxation settings
    pub fn wfr_config(&self) -> &WfrConfig {
        self.wfr.config()
    }

    /// Phase of the relaxation protocol
    pub fn wfr_phase(&self) -> WfrPhase {
        self.wfr.phase()
    }

    /// Membrane potential (mV)
    pub fn membrane_potential(&self) -> f64 {
        self.state.v_m()
    }

    /// Most recent spike
    pub fn last_spike(&self) -> Option<SpikeEmission> {
        self.last_spike
    }

    /// Impulse added to the excitatory rate variable per unit weight
    pub fn excitatory_impulse(&self) -> f64 {
        self.ex_kernel.normalisation()
    }

    /// Impulse added to the inhibitory rate variable per unit weight
    pub fn inhibitory_impulse(&self) -> f64 {
        self.in_kernel.normalisation()
    }

    /// Refractory period in steps
    pub fn refractory_counts(&self) -> u32 {
        self.detector.refractory_counts()
    }

    /// Persisted step-size estimate of the stepper (ms)
    pub fn integration_step(&self) -> f64 {
        self.stepper.step_size()
    }

    /// Injected current applied during the next lag (pA)
    pub fn stimulus_current(&self) -> f64 {
        self.i_stim
    }
}

fn read_element<const I: usize>(neuron: &TraubNeuron) -> f64 {
    neuron.state.y[I]
}

fn accessor_for(recordable: Recordable) -> Accessor<TraubNeuron> {
    match recordable {
        Recordable::VM => read_element::<{ StateIndex::VM as usize }>,
        Recordable::GEx => read_element::<{ StateIndex::GExc as usize }>,
        Recordable::GIn => read_element::<{ StateIndex::GInh as usize }>,
        Recordable::ActM => read_element::<{ StateIndex::HhM as usize }>,
        Recordable::InactH => read_element::<{ StateIndex::HhH as usize }>,
        Recordable::ActN => read_element::<{ StateIndex::HhN as usize }>,
    }
}

impl Observable for TraubNeuron {
    fn recordables() -> &'static RecordablesMap<Self> {
        static MAP: OnceLock<RecordablesMap<TraubNeuron>> = OnceLock::new();
        MAP.get_or_init(|| {
            RecordablesMap::new(
                Recordable::ALL
                    .into_iter()
                    .map(|r| (r.name(), accessor_for(r)))
                    .collect(),
            )
        })
    }

    fn read(&self, recordable: Recordable) -> f64 {
        self.state.get(recordable.state_index())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_neuron_creation() {
        let neuron = TraubNeuron::with_defaults().unwrap();
        assert_eq!(neuron.refractory_counts(), 20);
        assert_eq!(neuron.wfr_phase(), WfrPhase::Committed);
        assert_eq!(neuron.coefficients().len(), 10 * 4);
        assert_eq!(neuron.coefficients()[4], neuron.membrane_potential());
        assert!(neuron.excitatory_impulse() > 0.0);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = NeuronConfig::default();
        config.params.tau_rise_ex = 6.0;
        assert!(TraubNeuron::new(config).is_err());
    }

    #[test]
    fn test_set_status_atomic() {
        let mut neuron = TraubNeuron::with_defaults().unwrap();
        let before = neuron.params().clone();
        let v_before = neuron.membrane_potential();

        let bad = StatusUpdate::new()
            .with("V_m", -70.0)
            .unwrap()
            .with("tau_decay_in", 0.1)
            .unwrap();
        assert!(neuron.set_status(&bad).is_err());
        assert_eq!(neuron.params(), &before);
        assert_eq!(neuron.membrane_potential(), v_before);

        let good = StatusUpdate::new()
            .with("V_m", -70.0)
            .unwrap()
            .with("t_ref", 3.0)
            .unwrap();
        neuron.set_status(&good).unwrap();
        assert_eq!(neuron.membrane_potential(), -70.0);
        assert_eq!(neuron.refractory_counts(), 30);
    }

    #[test]
    fn test_set_status_republishes_potential() {
        let mut neuron = TraubNeuron::with_defaults().unwrap();
        let update = StatusUpdate::new().with("V_m", -70.0).unwrap();
        neuron.set_status(&update).unwrap();

        assert_eq!(neuron.membrane_potential(), -70.0);
        assert_eq!(neuron.coefficients()[0], neuron.membrane_potential());
        let per_lag = neuron.wfr_config().interpolation_order.coefficients_per_lag();
        for chunk in neuron.coefficients().chunks(per_lag) {
            assert_eq!(chunk[0], -70.0);
            assert!(chunk[1..].iter().all(|&c| c == 0.0));
        }
        assert_eq!(neuron.gap_output(1.0).coefficients[0], -70.0);
    }

    #[test]
    fn test_unknown_receptor() {
        let mut neuron = TraubNeuron::with_defaults().unwrap();
        assert!(neuron.connect(EventKind::DataLogging, 0).is_ok());
        assert!(neuron.connect(EventKind::Spike, 1).is_err());

        let mut spike = SpikeInput::new(0, 1.0);
        spike.receptor = 5;
        assert!(matches!(
            neuron.handle_spike(&spike),
            Err(NeuronError::UnknownReceptor { receptor: 5, .. })
        ));
    }

    #[test]
    fn test_invalid_slice() {
        let mut neuron = TraubNeuron::with_defaults().unwrap();
        assert!(neuron.update(0, 0, 11).is_err());
        assert!(neuron.update(0, 5, 5).is_err());
        assert!(neuron.wfr_update(0, 3, 2).is_err());
    }

    #[test]
    fn test_observable_registry() {
        let neuron = TraubNeuron::with_defaults().unwrap();
        let names: Vec<_> = TraubNeuron::recordables().names().collect();
        assert_eq!(names, vec!["V_m", "g_ex", "g_in", "Act_m", "Inact_h", "Act_n"]);
        assert_eq!(neuron.read_named("V_m"), Some(neuron.membrane_potential()));
        assert_eq!(neuron.read(Recordable::GEx), 0.0);
        assert_eq!(
            neuron.read_named("Act_n"),
            Some(neuron.state().get(StateIndex::HhN))
        );
        assert_eq!(neuron.read_named("E_L"), None);
    }

    #[test]
    fn test_tentative_round_restores_state() {
        let mut neuron = TraubNeuron::with_defaults().unwrap();
        neuron.handle_spike(&SpikeInput::new(0, 50.0)).unwrap();
        let before = *neuron.state();
        let step_before = neuron.integration_step();

        let round = neuron.wfr_update(0, 0, 10).unwrap();
        assert_eq!(round.round, 1);
        assert!(!round.converged);
        assert_eq!(neuron.state(), &before);
        assert_eq!(neuron.integration_step(), step_before);

        // input still queued for the authoritative pass
        neuron.update(0, 0, 10).unwrap();
        assert!(neuron.read(Recordable::GEx) > 0.0);
        assert_eq!(neuron.wfr_phase(), WfrPhase::Committed);
    }

    #[test]
    fn test_current_becomes_stimulus() {
        let mut neuron = TraubNeuron::with_defaults().unwrap();
        neuron.handle_current(&CurrentInput::new(3, 200.0)).unwrap();
        neuron.update(0, 0, 4).unwrap();
        assert_eq!(neuron.stimulus_current(), 200.0);
        neuron.update(0, 4, 10).unwrap();
        assert_eq!(neuron.stimulus_current(), 0.0);
    }

    #[test]
    fn test_events_outside_window_rejected() {
        let mut neuron = TraubNeuron::with_defaults().unwrap();
        neuron.update(0, 0, 10).unwrap();
        assert!(neuron.handle_spike(&SpikeInput::new(5, 1.0)).is_err());
        assert!(neuron.handle_spike(&SpikeInput::new(29, 1.0)).is_ok());
        assert!(neuron.handle_spike(&SpikeInput::new(30, 1.0)).is_err());
    }
}
