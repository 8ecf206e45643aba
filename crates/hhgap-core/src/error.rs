//! Error types for the neuron engine

use thiserror::Error;

/// Result type for neuron operations
pub type Result<T> = std::result::Result<T, NeuronError>;

/// Errors raised by the Traub gap-junction neuron
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NeuronError {
    /// Malformed or physically inconsistent parameter value
    #[error("Invalid parameter {parameter}: {value} (expected {constraint})")]
    InvalidParameter {
        /// Parameter name
        parameter: String,
        /// Rejected value
        value: String,
        /// Constraint description
        constraint: String,
    },

    /// Event delivered to a port the model does not expose
    #[error("Unknown receptor type {receptor} for model {model}")]
    UnknownReceptor {
        /// Requested receptor port
        receptor: u32,
        /// Model name
        model: &'static str,
    },

    /// Adaptive stepper could not meet its tolerance
    #[error("Integration failed at step {step}: {reason}")]
    IntegrationFailure {
        /// Simulation step in which the failure happened
        step: u64,
        /// Reason for failure
        reason: String,
    },

    /// Waveform relaxation exhausted its round budget
    #[error("Waveform relaxation did not converge after {rounds} rounds (max deviation {max_deviation} mV)")]
    NonConvergence {
        /// Rounds performed
        rounds: u32,
        /// Largest per-lag deviation of the final round
        max_deviation: f64,
    },

    /// Event addressed to a step outside the buffered window
    #[error("Event for step {step} outside buffer window [{window_start}, {window_end})")]
    EventOutOfWindow {
        /// Requested delivery step
        step: u64,
        /// First step held by the buffer
        window_start: u64,
        /// One past the last step held by the buffer
        window_end: u64,
    },

    /// Gap-junction coefficient array of the wrong length
    #[error("Gap-junction coefficient array has {actual} entries, expected {expected}")]
    CoefficientMismatch {
        /// Expected number of coefficients
        expected: usize,
        /// Received number of coefficients
        actual: usize,
    },

    /// Slice bounds outside the configured slice length
    #[error("Invalid slice [{from}, {to}) for slice length {min_delay}")]
    InvalidSlice {
        /// First lag
        from: usize,
        /// One past the last lag
        to: usize,
        /// Configured slice length in steps
        min_delay: usize,
    },
}

impl NeuronError {
    /// Create an invalid parameter error
    pub fn invalid_parameter(
        parameter: impl Into<String>,
        value: impl Into<String>,
        constraint: impl Into<String>,
    ) -> Self {
        Self::InvalidParameter {
            parameter: parameter.into(),
            value: value.into(),
            constraint: constraint.into(),
        }
    }

    /// Create an unknown receptor error
    pub fn unknown_receptor(receptor: u32, model: &'static str) -> Self {
        Self::UnknownReceptor { receptor, model }
    }

    /// Create an integration failure error
    pub fn integration_failure(step: u64, reason: impl Into<String>) -> Self {
        Self::IntegrationFailure {
            step,
            reason: reason.into(),
        }
    }

    /// Create a non-convergence error
    pub fn non_convergence(rounds: u32, max_deviation: f64) -> Self {
        Self::NonConvergence {
            rounds,
            max_deviation,
        }
    }

    /// Whether the error invalidates the slice currently being integrated
    pub fn is_fatal_to_slice(&self) -> bool {
        matches!(
            self,
            Self::IntegrationFailure { .. } | Self::NonConvergence { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = NeuronError::invalid_parameter("tau_rise_ex", "5", "< tau_decay_ex");
        assert!(matches!(err, NeuronError::InvalidParameter { .. }));
        assert!(!err.is_fatal_to_slice());

        let err = NeuronError::integration_failure(12, "step size underflow");
        assert!(err.is_fatal_to_slice());
    }

    #[test]
    fn test_error_display() {
        let err = NeuronError::unknown_receptor(3, "hh_cond_beta_gap_traub");
        let msg = format!("{}", err);
        assert!(msg.contains("Unknown receptor type 3"));

        let err = NeuronError::non_convergence(15, 0.25);
        assert!(format!("{}", err).contains("15 rounds"));
    }
}
