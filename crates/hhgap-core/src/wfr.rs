//! Waveform-relaxation bookkeeping for gap-junction coupled neurons
//!
//! A slice is integrated tentatively once per round using the neighbours'
//! interpolated voltages from the previous round. Each round publishes fresh
//! interpolation coefficients and reports whether the end-of-lag voltages
//! moved by more than the tolerance since the previous round. The external
//! scheduler exchanges coefficients between rounds and, once every coupled
//! neuron reports convergence, runs the authoritative pass.
//!
//! ```text
//!   Committed --tentative round--> Tentative --deviation <= tol--> Converged
//!                                     ^  |                            |
//!                                     +--+ deviation > tol            | authoritative pass
//!                                                                     v
//!                                                                 Committed
//! ```

use crate::error::*;

/// Degree of the polynomial approximating a neighbour voltage over one lag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "u8", into = "u8"))]
pub enum InterpolationOrder {
    /// Piecewise constant
    Constant,
    /// Piecewise linear
    Linear,
    /// Cubic Hermite using the voltage derivative at both lag ends
    Cubic,
}

impl InterpolationOrder {
    /// Polynomial degree
    pub const fn degree(self) -> u8 {
        match self {
            Self::Constant => 0,
            Self::Linear => 1,
            Self::Cubic => 3,
        }
    }

    /// Coefficients emitted per lag
    pub const fn coefficients_per_lag(self) -> usize {
        self.degree() as usize + 1
    }

    /// Whether the derivative at the lag ends is needed
    pub const fn needs_slope(self) -> bool {
        matches!(self, Self::Cubic)
    }
}

impl TryFrom<u8> for InterpolationOrder {
    type Error = NeuronError;

    fn try_from(degree: u8) -> Result<Self> {
        match degree {
            0 => Ok(Self::Constant),
            1 => Ok(Self::Linear),
            3 => Ok(Self::Cubic),
            other => Err(NeuronError::invalid_parameter(
                "interpolation_order",
                other.to_string(),
                "0, 1 or 3",
            )),
        }
    }
}

impl From<InterpolationOrder> for u8 {
    fn from(order: InterpolationOrder) -> Self {
        order.degree()
    }
}

/// What to do when the round budget runs out before convergence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum NonConvergencePolicy {
    /// Log a warning and treat the last iterate as converged
    Accept,
    /// Report a non-convergence error
    Fail,
}

/// Waveform-relaxation settings
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct WfrConfig {
    /// Largest per-lag voltage change accepted as converged (mV)
    pub tolerance: f64,
    /// Round budget per slice
    pub max_iterations: u32,
    /// Neighbour-voltage interpolation order
    pub interpolation_order: InterpolationOrder,
    /// Behaviour when the budget is exhausted
    pub on_non_convergence: NonConvergencePolicy,
}

impl Default for WfrConfig {
    fn default() -> Self {
        Self {
            tolerance: 1e-4,
            max_iterations: 15,
            interpolation_order: InterpolationOrder::Cubic,
            on_non_convergence: NonConvergencePolicy::Accept,
        }
    }
}

impl WfrConfig {
    /// Validate settings
    pub fn validate(&self) -> Result<()> {
        if !(self.tolerance > 0.0) {
            return Err(NeuronError::invalid_parameter(
                "wfr_tol",
                self.tolerance.to_string(),
                "> 0.0",
            ));
        }
        if self.max_iterations == 0 {
            return Err(NeuronError::invalid_parameter("wfr_max_iterations", "0", ">= 1"));
        }
        Ok(())
    }
}

/// Position of a slice in the relaxation protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WfrPhase {
    /// Rounds are still being iterated
    Tentative,
    /// Iterate accepted, awaiting the authoritative pass
    Converged,
    /// Slice integrated authoritatively
    Committed,
}

/// Report of one tentative round
#[derive(Debug, Clone, PartialEq)]
pub struct WfrRound {
    /// Rounds performed in this slice, including this one
    pub round: u32,
    /// Largest end-of-lag voltage change against the previous round (mV)
    pub max_deviation: f64,
    /// Whether the round met the tolerance or was accepted by policy
    pub converged: bool,
    /// Accepted only because the round budget ran out
    pub forced: bool,
    /// Phase after the round
    pub phase: WfrPhase,
}

/// Per-neuron relaxation state carried across rounds of a slice
#[derive(Debug, Clone)]
pub struct WfrController {
    config: WfrConfig,
    phase: WfrPhase,
    rounds: u32,
    /// End-of-lag voltage of the previous round, per lag
    last_y_values: Vec<f64>,
}

impl WfrController {
    /// Controller for slices of `min_delay` lags
    pub fn new(config: WfrConfig, min_delay: usize) -> Self {
        Self {
            config,
            phase: WfrPhase::Committed,
            rounds: 0,
            last_y_values: vec![0.0; min_delay],
        }
    }

    /// Settings
    pub fn config(&self) -> &WfrConfig {
        &self.config
    }

    /// Current phase
    pub fn phase(&self) -> WfrPhase {
        self.phase
    }

    /// Rounds performed in the current slice
    pub fn rounds(&self) -> u32 {
        self.rounds
    }

    /// Last sample recorded for `lag`
    pub fn last_sample(&self, lag: usize) -> f64 {
        self.last_y_values[lag]
    }

    /// Store this round's end-of-lag voltage and return its change
    pub fn record_sample(&mut self, lag: usize, v: f64) -> f64 {
        let deviation = (v - self.last_y_values[lag]).abs();
        self.last_y_values[lag] = v;
        deviation
    }

    /// Close a round given its largest deviation
    pub fn finish_round(&mut self, max_deviation: f64) -> Result<WfrRound> {
        self.rounds += 1;

        let mut forced = false;
        let converged = if max_deviation <= self.config.tolerance {
            true
        } else if self.rounds >= self.config.max_iterations {
            match self.config.on_non_convergence {
                NonConvergencePolicy::Accept => {
                    log::warn!(
                        "waveform relaxation accepted after {} rounds with deviation {:.3e} mV (tolerance {:.3e})",
                        self.rounds,
                        max_deviation,
                        self.config.tolerance
                    );
                    forced = true;
                    true
                }
                NonConvergencePolicy::Fail => {
                    let rounds = self.rounds;
                    self.reset();
                    return Err(NeuronError::non_convergence(rounds, max_deviation));
                }
            }
        } else {
            false
        };

        self.phase = if converged {
            WfrPhase::Converged
        } else {
            WfrPhase::Tentative
        };
        log::debug!(
            "wfr round {} max deviation {:.3e} mV -> {:?}",
            self.rounds,
            max_deviation,
            self.phase
        );

        Ok(WfrRound {
            round: self.rounds,
            max_deviation,
            converged,
            forced,
            phase: self.phase,
        })
    }

    /// The authoritative pass finished; the next slice starts afresh
    pub fn commit(&mut self) {
        self.reset();
        self.phase = WfrPhase::Committed;
    }

    /// Drop the rounds of the current slice
    pub fn abandon(&mut self) {
        self.reset();
        self.phase = WfrPhase::Committed;
    }

    fn reset(&mut self) {
        self.rounds = 0;
        self.last_y_values.iter_mut().for_each(|v| *v = 0.0);
    }
}

/// Interpolation coefficients of one lag.
///
/// `y_i`/`y_ip1` are the voltages at the lag ends and `hf_i`/`hf_ip1` the
/// voltage derivatives scaled by the lag length (only read for cubic order).
pub fn lag_coefficients(
    order: InterpolationOrder,
    y_i: f64,
    y_ip1: f64,
    hf_i: f64,
    hf_ip1: f64,
    out: &mut [f64],
) {
    out[0] = y_i;
    match order {
        InterpolationOrder::Constant => {}
        InterpolationOrder::Linear => {
            out[1] = y_ip1 - y_i;
        }
        InterpolationOrder::Cubic => {
            out[1] = hf_i;
            out[2] = -3.0 * y_i + 3.0 * y_ip1 - 2.0 * hf_i - hf_ip1;
            out[3] = 2.0 * y_i - 2.0 * y_ip1 + hf_i + hf_ip1;
        }
    }
}
