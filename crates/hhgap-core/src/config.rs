//! Construction-time configuration of a neuron
//!
//! Everything a neuron needs from its surroundings is passed in explicitly:
//! the time grid, the solver tolerances and the waveform-relaxation policy.

use crate::error::*;
use crate::params::TraubParams;
use crate::wfr::WfrConfig;

/// External time grid the neuron is integrated on
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SliceConfig {
    /// Simulation resolution, the length of one lag (ms)
    pub resolution_ms: f64,
    /// Slice length in steps (minimum network delay)
    pub min_delay: usize,
    /// Furthest delivery horizon in steps (maximum network delay)
    pub max_delay: usize,
}

impl Default for SliceConfig {
    fn default() -> Self {
        Self {
            resolution_ms: 0.1,
            min_delay: 10,
            max_delay: 10,
        }
    }
}

impl SliceConfig {
    /// Validate the time grid
    pub fn validate(&self) -> Result<()> {
        if !(self.resolution_ms > 0.0 && self.resolution_ms.is_finite()) {
            return Err(NeuronError::invalid_parameter(
                "resolution_ms",
                self.resolution_ms.to_string(),
                "> 0.0",
            ));
        }
        if self.min_delay == 0 {
            return Err(NeuronError::invalid_parameter("min_delay", "0", ">= 1"));
        }
        if self.max_delay < self.min_delay {
            return Err(NeuronError::invalid_parameter(
                "max_delay",
                format!("{} (with min_delay={})", self.max_delay, self.min_delay),
                ">= min_delay",
            ));
        }
        Ok(())
    }

    /// Steps held by the event ring buffers
    pub fn buffer_len(&self) -> usize {
        self.min_delay + self.max_delay
    }

    /// Convert a duration to whole steps, rounding to nearest
    pub fn steps(&self, ms: f64) -> u32 {
        (ms / self.resolution_ms).round() as u32
    }
}

/// Error-control settings of the adaptive stepper
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SolverConfig {
    /// Absolute error bound per state element
    pub eps_abs: f64,
    /// Relative error bound per state element
    pub eps_rel: f64,
    /// Step attempts allowed per lag before giving up
    pub max_attempts: u32,
    /// Smallest step size tolerated (ms)
    pub min_step: f64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            eps_abs: 1e-3,
            eps_rel: 0.0,
            max_attempts: 10_000,
            min_step: 1e-12,
        }
    }
}

impl SolverConfig {
    /// Validate tolerances
    pub fn validate(&self) -> Result<()> {
        if !(self.eps_abs >= 0.0) || !(self.eps_rel >= 0.0) {
            return Err(NeuronError::invalid_parameter(
                "eps_abs/eps_rel",
                format!("{}/{}", self.eps_abs, self.eps_rel),
                ">= 0.0",
            ));
        }
        if self.eps_abs == 0.0 && self.eps_rel == 0.0 {
            return Err(NeuronError::invalid_parameter(
                "eps_abs/eps_rel",
                "0/0",
                "at least one tolerance > 0.0",
            ));
        }
        if self.max_attempts == 0 {
            return Err(NeuronError::invalid_parameter("max_attempts", "0", ">= 1"));
        }
        if !(self.min_step > 0.0) {
            return Err(NeuronError::invalid_parameter(
                "min_step",
                self.min_step.to_string(),
                "> 0.0",
            ));
        }
        Ok(())
    }
}

/// Full construction recipe for a [`crate::TraubNeuron`]
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct NeuronConfig {
    /// Model parameters
    pub params: TraubParams,
    /// Time grid
    pub slice: SliceConfig,
    /// Stepper tolerances
    pub solver: SolverConfig,
    /// Waveform-relaxation policy
    pub wfr: WfrConfig,
}

impl NeuronConfig {
    /// Validate every section
    pub fn validate(&self) -> Result<()> {
        self.params.validate()?;
        self.slice.validate()?;
        self.solver.validate()?;
        self.wfr.validate()?;
        Ok(())
    }

    /// Replace the parameters
    pub fn with_params(mut self, params: TraubParams) -> Self {
        self.params = params;
        self
    }

    /// Replace the waveform-relaxation policy
    pub fn with_wfr(mut self, wfr: WfrConfig) -> Self {
        self.wfr = wfr;
        self
    }

    /// Replace the time grid
    pub fn with_slice(mut self, slice: SliceConfig) -> Self {
        self.slice = slice;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        assert!(NeuronConfig::default().validate().is_ok());
        assert_eq!(SliceConfig::default().buffer_len(), 20);
    }

    #[test]
    fn test_slice_validation() {
        let slice = SliceConfig {
            min_delay: 0,
            ..SliceConfig::default()
        };
        assert!(slice.validate().is_err());

        let slice = SliceConfig {
            min_delay: 10,
            max_delay: 5,
            ..SliceConfig::default()
        };
        assert!(slice.validate().is_err());
    }

    #[test]
    fn test_step_rounding() {
        let slice = SliceConfig::default();
        assert_eq!(slice.steps(2.0), 20);
        assert_eq!(slice.steps(0.26), 3);
        assert_eq!(slice.steps(0.0), 0);
    }

    #[test]
    fn test_solver_validation() {
        let solver = SolverConfig {
            eps_abs: 0.0,
            eps_rel: 0.0,
            ..SolverConfig::default()
        };
        assert!(solver.validate().is_err());
    }
}
