//! Model parameters and their validated bulk assignment

use crate::error::*;

/// Parameters of the Traub-Miles neuron with beta-function synapses
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct TraubParams {
    /// Sodium peak conductance (nS)
    pub g_na: f64,
    /// Potassium peak conductance (nS)
    pub g_k: f64,
    /// Leak conductance (nS)
    pub g_l: f64,
    /// Membrane capacitance (pF)
    pub c_m: f64,
    /// Sodium reversal potential (mV)
    pub e_na: f64,
    /// Potassium reversal potential (mV)
    pub e_k: f64,
    /// Leak reversal potential (mV)
    pub e_l: f64,
    /// Voltage offset of the gating kinetics (mV)
    pub v_t: f64,
    /// Excitatory reversal potential (mV)
    pub e_ex: f64,
    /// Inhibitory reversal potential (mV)
    pub e_in: f64,
    /// Excitatory beta-function rise time (ms)
    pub tau_rise_ex: f64,
    /// Excitatory beta-function decay time (ms)
    pub tau_decay_ex: f64,
    /// Inhibitory beta-function rise time (ms)
    pub tau_rise_in: f64,
    /// Inhibitory beta-function decay time (ms)
    pub tau_decay_in: f64,
    /// Refractory period (ms)
    pub t_ref: f64,
    /// Constant external current (pA)
    pub i_e: f64,
}

impl Default for TraubParams {
    fn default() -> Self {
        Self {
            g_na: 20000.0,
            g_k: 6000.0,
            g_l: 10.0,
            c_m: 200.0,
            e_na: 50.0,
            e_k: -90.0,
            e_l: -60.0,
            v_t: -50.0,
            e_ex: 0.0,
            e_in: -80.0,
            tau_rise_ex: 0.5,
            tau_decay_ex: 5.0,
            tau_rise_in: 0.5,
            tau_decay_in: 10.0,
            t_ref: 2.0,
            i_e: 0.0,
        }
    }
}

/// Names accepted by [`ParamUpdate::set`], in declaration order
pub const PARAMETER_NAMES: [&str; 16] = [
    "g_Na",
    "g_K",
    "g_L",
    "C_m",
    "E_Na",
    "E_K",
    "E_L",
    "V_T",
    "E_ex",
    "E_in",
    "tau_rise_ex",
    "tau_decay_ex",
    "tau_rise_in",
    "tau_decay_in",
    "t_ref",
    "I_e",
];

impl TraubParams {
    /// Validate parameters
    pub fn validate(&self) -> Result<()> {
        for (name, value) in PARAMETER_NAMES.iter().zip(self.values()) {
            if !value.is_finite() {
                return Err(NeuronError::invalid_parameter(
                    *name,
                    value.to_string(),
                    "a finite number",
                ));
            }
        }
        if self.c_m <= 0.0 {
            return Err(NeuronError::invalid_parameter(
                "C_m",
                self.c_m.to_string(),
                "> 0.0",
            ));
        }
        if self.t_ref < 0.0 {
            return Err(NeuronError::invalid_parameter(
                "t_ref",
                self.t_ref.to_string(),
                ">= 0.0",
            ));
        }
        for (name, g) in [("g_Na", self.g_na), ("g_K", self.g_k), ("g_L", self.g_l)] {
            if g < 0.0 {
                return Err(NeuronError::invalid_parameter(name, g.to_string(), ">= 0.0"));
            }
        }
        check_kernel("ex", self.tau_rise_ex, self.tau_decay_ex)?;
        check_kernel("in", self.tau_rise_in, self.tau_decay_in)?;
        Ok(())
    }

    /// Parameter values in [`PARAMETER_NAMES`] order
    pub fn values(&self) -> [f64; 16] {
        [
            self.g_na,
            self.g_k,
            self.g_l,
            self.c_m,
            self.e_na,
            self.e_k,
            self.e_l,
            self.v_t,
            self.e_ex,
            self.e_in,
            self.tau_rise_ex,
            self.tau_decay_ex,
            self.tau_rise_in,
            self.tau_decay_in,
            self.t_ref,
            self.i_e,
        ]
    }

    /// Look up a parameter by name
    pub fn get(&self, name: &str) -> Option<f64> {
        let slot = slot_of(name)?;
        Some(self.values()[slot])
    }

    /// Return a validated copy with the update applied; `self` is untouched
    pub fn with_update(&self, update: &ParamUpdate) -> Result<Self> {
        let mut next = self.clone();
        for (slot, value) in update.slots.iter().enumerate() {
            if let Some(value) = *value {
                *next.slot_mut(slot) = value;
            }
        }
        next.validate()?;
        Ok(next)
    }

    fn slot_mut(&mut self, slot: usize) -> &mut f64 {
        match slot {
            0 => &mut self.g_na,
            1 => &mut self.g_k,
            2 => &mut self.g_l,
            3 => &mut self.c_m,
            4 => &mut self.e_na,
            5 => &mut self.e_k,
            6 => &mut self.e_l,
            7 => &mut self.v_t,
            8 => &mut self.e_ex,
            9 => &mut self.e_in,
            10 => &mut self.tau_rise_ex,
            11 => &mut self.tau_decay_ex,
            12 => &mut self.tau_rise_in,
            13 => &mut self.tau_decay_in,
            14 => &mut self.t_ref,
            _ => &mut self.i_e,
        }
    }
}

fn check_kernel(suffix: &str, tau_rise: f64, tau_decay: f64) -> Result<()> {
    if tau_rise <= 0.0 {
        return Err(NeuronError::invalid_parameter(
            format!("tau_rise_{}", suffix),
            tau_rise.to_string(),
            "> 0.0",
        ));
    }
    if tau_decay <= 0.0 {
        return Err(NeuronError::invalid_parameter(
            format!("tau_decay_{}", suffix),
            tau_decay.to_string(),
            "> 0.0",
        ));
    }
    if tau_rise >= tau_decay {
        return Err(NeuronError::invalid_parameter(
            format!("tau_rise_{}", suffix),
            format!("{} (with tau_decay_{}={})", tau_rise, suffix, tau_decay),
            format!("< tau_decay_{}", suffix),
        ));
    }
    Ok(())
}

/// Case-insensitive lookup so both `g_Na` and `g_na` resolve
fn slot_of(name: &str) -> Option<usize> {
    PARAMETER_NAMES
        .iter()
        .position(|candidate| candidate.eq_ignore_ascii_case(name))
}

/// Sparse set of named parameter assignments, applied all-or-nothing
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParamUpdate {
    slots: [Option<f64>; 16],
}

impl ParamUpdate {
    /// Create an empty update
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign a parameter by name
    pub fn set(&mut self, name: &str, value: f64) -> Result<()> {
        let slot = slot_of(name).ok_or_else(|| {
            NeuronError::invalid_parameter(name, value.to_string(), "a known parameter name")
        })?;
        self.slots[slot] = Some(value);
        Ok(())
    }

    /// Builder-style assignment
    pub fn with(mut self, name: &str, value: f64) -> Result<Self> {
        self.set(name, value)?;
        Ok(self)
    }

    /// Whether the update assigns nothing
    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_traub_params_default() {
        let params = TraubParams::default();
        assert!(params.validate().is_ok());
        assert!(params.tau_rise_ex < params.tau_decay_ex);
        assert_eq!(params.get("V_T"), Some(-50.0));
        assert_eq!(params.get("v_t"), Some(-50.0));
        assert_eq!(params.get("nope"), None);
    }

    #[test]
    fn test_params_validation() {
        let mut params = TraubParams::default();
        params.c_m = 0.0;
        assert!(params.validate().is_err());

        let mut params = TraubParams::default();
        params.t_ref = -1.0;
        assert!(params.validate().is_err());

        let mut params = TraubParams::default();
        params.tau_rise_in = 10.0;
        let err = params.validate().unwrap_err();
        assert!(format!("{}", err).contains("tau_rise_in"));

        let mut params = TraubParams::default();
        params.g_k = f64::NAN;
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_update_is_atomic() {
        let params = TraubParams::default();
        let update = ParamUpdate::new()
            .with("g_L", 20.0)
            .unwrap()
            .with("tau_rise_ex", 7.0)
            .unwrap();

        assert!(params.with_update(&update).is_err());
        assert_eq!(params, TraubParams::default());

        let update = ParamUpdate::new().with("g_L", 20.0).unwrap();
        let next = params.with_update(&update).unwrap();
        assert_eq!(next.g_l, 20.0);
        assert_eq!(next.g_na, params.g_na);
    }

    #[test]
    fn test_unknown_name_rejected() {
        let mut update = ParamUpdate::new();
        assert!(update.set("tau_syn", 1.0).is_err());
        assert!(update.is_empty());
    }
}
