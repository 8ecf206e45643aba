//! Beta-function synaptic kernel calibration
//!
//! The conductance kernel is driven by two linear ODEs,
//!
//! ```text
//! dDG/dt = -DG / tau_rise
//! dG/dt  =  DG - G / tau_decay
//! ```
//!
//! and an incoming event of weight `w` adds `w * normalisation` to `DG`.
//! The normalisation is chosen so that a unit-weight event produces a
//! conductance excursion with peak value 1.

use crate::error::*;

/// Calibrated beta-function kernel for one synapse type
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BetaKernel {
    tau_rise: f64,
    tau_decay: f64,
    normalisation: f64,
}

impl BetaKernel {
    /// Calibrate a kernel; requires `0 < tau_rise < tau_decay`
    pub fn new(tau_rise: f64, tau_decay: f64) -> Result<Self> {
        if !(tau_rise > 0.0) {
            return Err(NeuronError::invalid_parameter(
                "tau_rise",
                tau_rise.to_string(),
                "> 0.0",
            ));
        }
        if !(tau_decay > 0.0) {
            return Err(NeuronError::invalid_parameter(
                "tau_decay",
                tau_decay.to_string(),
                "> 0.0",
            ));
        }
        if tau_rise >= tau_decay {
            return Err(NeuronError::invalid_parameter(
                "tau_rise",
                format!("{} (with tau_decay={})", tau_rise, tau_decay),
                "< tau_decay",
            ));
        }
        Ok(Self {
            tau_rise,
            tau_decay,
            normalisation: normalisation_factor(tau_rise, tau_decay),
        })
    }

    /// Impulse added to the rate variable per unit weight
    pub fn normalisation(&self) -> f64 {
        self.normalisation
    }

    /// Impulse for an event of the given weight
    pub fn impulse(&self, weight: f64) -> f64 {
        weight * self.normalisation
    }

    /// Time of the conductance maximum after an impulse (ms)
    pub fn peak_time(&self) -> f64 {
        peak_time(self.tau_rise, self.tau_decay).unwrap_or(self.tau_decay)
    }

    /// Closed-form conductance `t` ms after a unit-weight event
    pub fn conductance_at(&self, t: f64) -> f64 {
        if t < 0.0 {
            return 0.0;
        }
        let rate_gap = 1.0 / self.tau_rise - 1.0 / self.tau_decay;
        if rate_gap.abs() <= f64::EPSILON {
            return self.normalisation * t * (-t / self.tau_decay).exp();
        }
        self.normalisation * ((-t / self.tau_decay).exp() - (-t / self.tau_rise).exp()) / rate_gap
    }

    /// Rise time constant (ms)
    pub fn tau_rise(&self) -> f64 {
        self.tau_rise
    }

    /// Decay time constant (ms)
    pub fn tau_decay(&self) -> f64 {
        self.tau_decay
    }
}

fn peak_time(tau_rise: f64, tau_decay: f64) -> Option<f64> {
    let denom = tau_decay - tau_rise;
    if denom.abs() <= f64::EPSILON {
        return None;
    }
    Some(tau_decay * tau_rise * (tau_decay / tau_rise).ln() / denom)
}

/// Factor mapping unit weight to the `DG` impulse that gives a unit peak.
///
/// Falls back to the alpha-function factor `e / tau_decay` when the time
/// constants are too close for the beta expression to be evaluated.
pub fn normalisation_factor(tau_rise: f64, tau_decay: f64) -> f64 {
    if let Some(t_peak) = peak_time(tau_rise, tau_decay) {
        let denom = (-t_peak / tau_decay).exp() - (-t_peak / tau_rise).exp();
        if denom.abs() > f64::EPSILON {
            return (1.0 / tau_rise - 1.0 / tau_decay) / denom;
        }
    }
    std::f64::consts::E / tau_decay
}
