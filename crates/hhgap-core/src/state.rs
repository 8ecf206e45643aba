//! ODE state vector of the neuron

use crate::channels::{resting_potential, GateRates};
use crate::error::*;
use crate::params::TraubParams;

/// Length of the ODE state vector
pub const STATE_VEC_SIZE: usize = 8;

/// Symbolic indices into the state vector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum StateIndex {
    /// Membrane potential (mV)
    VM = 0,
    /// Sodium activation `m`
    HhM = 1,
    /// Sodium inactivation `h`
    HhH = 2,
    /// Potassium activation `n`
    HhN = 3,
    /// Excitatory kernel rate variable (nS/ms)
    DgExc = 4,
    /// Excitatory conductance (nS)
    GExc = 5,
    /// Inhibitory kernel rate variable (nS/ms)
    DgInh = 6,
    /// Inhibitory conductance (nS)
    GInh = 7,
}

impl StateIndex {
    /// Position in the state vector
    #[inline]
    pub const fn idx(self) -> usize {
        self as usize
    }
}

/// Mutable neuron state: ODE vector plus remaining refractory steps
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct State {
    /// ODE state vector
    pub y: [f64; STATE_VEC_SIZE],
    /// Refractory steps remaining
    pub refractory_steps: u32,
}

impl State {
    /// Resting equilibrium for the given parameters.
    ///
    /// Gates sit at their steady state and `V_m` balances the ionic currents
    /// against `I_e`. Without such a balance point within 100 mV of `E_L`
    /// (tonic firing regimes) the membrane starts at `E_L`.
    pub fn resting(params: &TraubParams) -> Self {
        let v = resting_potential(params).unwrap_or_else(|| {
            log::debug!("no resting equilibrium near E_L={} mV, starting at E_L", params.e_l);
            params.e_l
        });
        let (m, h, n) = GateRates::at(v, params.v_t).steady_state();

        let mut y = [0.0; STATE_VEC_SIZE];
        y[StateIndex::VM.idx()] = v;
        y[StateIndex::HhM.idx()] = m;
        y[StateIndex::HhH.idx()] = h;
        y[StateIndex::HhN.idx()] = n;
        Self {
            y,
            refractory_steps: 0,
        }
    }

    /// Read one element
    #[inline]
    pub fn get(&self, index: StateIndex) -> f64 {
        self.y[index.idx()]
    }

    /// Membrane potential (mV)
    #[inline]
    pub fn v_m(&self) -> f64 {
        self.y[StateIndex::VM.idx()]
    }

    /// Whether the neuron is currently refractory
    pub fn is_refractory(&self) -> bool {
        self.refractory_steps > 0
    }

    /// Return a validated copy with the update applied
    pub fn with_update(&self, update: &StateUpdate) -> Result<Self> {
        let mut next = *self;
        if let Some(v) = update.v_m {
            if !v.is_finite() {
                return Err(NeuronError::invalid_parameter("V_m", v.to_string(), "a finite number"));
            }
            next.y[StateIndex::VM.idx()] = v;
        }
        let gates = [
            ("Act_m", StateIndex::HhM, update.act_m),
            ("Inact_h", StateIndex::HhH, update.inact_h),
            ("Act_n", StateIndex::HhN, update.act_n),
        ];
        for (name, index, value) in gates {
            if let Some(x) = value {
                if !(0.0..=1.0).contains(&x) {
                    return Err(NeuronError::invalid_parameter(name, x.to_string(), "in [0, 1]"));
                }
                next.y[index.idx()] = x;
            }
        }
        Ok(next)
    }
}

/// Sparse assignment of the externally settable state elements
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateUpdate {
    /// Membrane potential (mV)
    pub v_m: Option<f64>,
    /// Sodium activation
    pub act_m: Option<f64>,
    /// Sodium inactivation
    pub inact_h: Option<f64>,
    /// Potassium activation
    pub act_n: Option<f64>,
}

impl StateUpdate {
    /// Assign a state element by name; returns `false` for names that are
    /// not state elements so callers can try parameters next
    pub fn set(&mut self, name: &str, value: f64) -> bool {
        let slot = match name {
            "V_m" | "v_m" => &mut self.v_m,
            "Act_m" | "act_m" => &mut self.act_m,
            "Inact_h" | "inact_h" => &mut self.inact_h,
            "Act_n" | "act_n" => &mut self.act_n,
            _ => return false,
        };
        *slot = Some(value);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resting_state() {
        let params = TraubParams::default();
        let state = State::resting(&params);
        assert_eq!(state.y.len(), STATE_VEC_SIZE);
        assert_eq!(state.refractory_steps, 0);
        assert_eq!(state.get(StateIndex::GExc), 0.0);
        assert_eq!(state.get(StateIndex::DgInh), 0.0);
        assert!((state.v_m() - params.e_l).abs() < 0.5);
        assert!(!state.is_refractory());
    }

    #[test]
    fn test_state_update() {
        let state = State::resting(&TraubParams::default());
        let mut update = StateUpdate::default();
        assert!(update.set("V_m", -70.0));
        assert!(update.set("Act_n", 0.5));
        assert!(!update.set("g_Na", 1.0));

        let next = state.with_update(&update).unwrap();
        assert_eq!(next.v_m(), -70.0);
        assert_eq!(next.get(StateIndex::HhN), 0.5);
        assert_eq!(next.get(StateIndex::HhM), state.get(StateIndex::HhM));

        let bad = StateUpdate {
            inact_h: Some(1.5),
            ..Default::default()
        };
        assert!(state.with_update(&bad).is_err());
    }
}
