//! Events a neuron accepts from the network layer

use crate::error::*;

/// Model name reported in receptor errors
pub const MODEL_NAME: &str = "hh_cond_beta_gap_traub";

/// The only receptor port the model exposes
pub const DEFAULT_PORT: u32 = 0;

/// Kinds of connection a neuron can be the target of
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Weighted spike, excitatory or inhibitory by sign
    Spike,
    /// Injected current
    Current,
    /// Gap-junction interpolation data
    GapJunction,
    /// Recording request
    DataLogging,
}

/// Check that `receptor` is a port accepting `kind` and return the port
pub fn check_receptor(kind: EventKind, receptor: u32) -> Result<u32> {
    if receptor != DEFAULT_PORT {
        log::debug!("rejecting {:?} connection on receptor {}", kind, receptor);
        return Err(NeuronError::unknown_receptor(receptor, MODEL_NAME));
    }
    Ok(DEFAULT_PORT)
}

/// Spike delivered for a given simulation step.
///
/// Positive weights drive the excitatory kernel, negative weights the
/// inhibitory kernel with the weight's magnitude.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpikeInput {
    /// Absolute delivery step
    pub step: u64,
    /// Synaptic weight (nS per unit peak)
    pub weight: f64,
    /// Number of coincident spikes
    pub multiplicity: u32,
    /// Receptor port
    pub receptor: u32,
}

impl SpikeInput {
    /// Single spike on the default port
    pub fn new(step: u64, weight: f64) -> Self {
        Self {
            step,
            weight,
            multiplicity: 1,
            receptor: DEFAULT_PORT,
        }
    }

    /// Single spike at `lag` of the slice starting at `origin`
    pub fn at_lag(origin: u64, lag: usize, weight: f64) -> Self {
        Self::new(origin + lag as u64, weight)
    }

    /// Effective weight including multiplicity
    pub fn total_weight(&self) -> f64 {
        self.weight * f64::from(self.multiplicity)
    }
}

/// Current step delivered for a given simulation step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurrentInput {
    /// Absolute delivery step
    pub step: u64,
    /// Current amplitude (pA)
    pub amplitude: f64,
    /// Receptor port
    pub receptor: u32,
}

impl CurrentInput {
    /// Current on the default port
    pub fn new(step: u64, amplitude: f64) -> Self {
        Self {
            step,
            amplitude,
            receptor: DEFAULT_PORT,
        }
    }

    /// Current at `lag` of the slice starting at `origin`
    pub fn at_lag(origin: u64, lag: usize, amplitude: f64) -> Self {
        Self::new(origin + lag as u64, amplitude)
    }
}

/// Interpolated voltage of one coupled neighbour over the coming slice
#[derive(Debug, Clone, PartialEq)]
pub struct GapJunctionInput {
    /// Coupling conductance (nS)
    pub weight: f64,
    /// Neighbour's coefficients, `coefficients_per_lag` entries per lag
    pub coefficients: Vec<f64>,
    /// Receptor port
    pub receptor: u32,
}

impl GapJunctionInput {
    /// Gap-junction data on the default port
    pub fn new(weight: f64, coefficients: Vec<f64>) -> Self {
        Self {
            weight,
            coefficients,
            receptor: DEFAULT_PORT,
        }
    }
}
