//! Embedded Runge-Kutta-Fehlberg 4(5) stepper with adaptive step control

use thiserror::Error;

use crate::config::SolverConfig;
use crate::dynamics::DynamicsFn;
use crate::state::STATE_VEC_SIZE;

type Vector = [f64; STATE_VEC_SIZE];

/// Reasons the stepper gives up on an interval
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StepFailure {
    /// Error control did not settle within the attempt budget
    #[error("error control exhausted {attempts} attempts at t={t} ms (h={h} ms)")]
    BudgetExhausted {
        /// Attempts made
        attempts: u32,
        /// Time reached within the interval
        t: f64,
        /// Last step size tried
        h: f64,
    },

    /// Step size shrank below the configured minimum
    #[error("step size {h} ms below minimum at t={t} ms")]
    StepUnderflow {
        /// Time reached within the interval
        t: f64,
        /// Rejected step size
        h: f64,
    },

    /// The state vector left the finite range
    #[error("non-finite state at t={t} ms")]
    NonFinite {
        /// Time reached within the interval
        t: f64,
    },
}

// Fehlberg tableau
const C2: f64 = 1.0 / 4.0;
const C3: f64 = 3.0 / 8.0;
const C4: f64 = 12.0 / 13.0;
const C6: f64 = 1.0 / 2.0;

const A21: f64 = 1.0 / 4.0;
const A31: f64 = 3.0 / 32.0;
const A32: f64 = 9.0 / 32.0;
const A41: f64 = 1932.0 / 2197.0;
const A42: f64 = -7200.0 / 2197.0;
const A43: f64 = 7296.0 / 2197.0;
const A51: f64 = 439.0 / 216.0;
const A52: f64 = -8.0;
const A53: f64 = 3680.0 / 513.0;
const A54: f64 = -845.0 / 4104.0;
const A61: f64 = -8.0 / 27.0;
const A62: f64 = 2.0;
const A63: f64 = -3544.0 / 2565.0;
const A64: f64 = 1859.0 / 4104.0;
const A65: f64 = -11.0 / 40.0;

// fifth-order weights
const B1: f64 = 16.0 / 135.0;
const B3: f64 = 6656.0 / 12825.0;
const B4: f64 = 28561.0 / 56430.0;
const B5: f64 = -9.0 / 50.0;
const B6: f64 = 2.0 / 55.0;

// fifth minus fourth order
const E1: f64 = 1.0 / 360.0;
const E3: f64 = -128.0 / 4275.0;
const E4: f64 = -2197.0 / 75240.0;
const E5: f64 = 1.0 / 50.0;
const E6: f64 = 2.0 / 55.0;

const ORDER: f64 = 5.0;
const SAFETY: f64 = 0.9;
const MAX_SHRINK: f64 = 0.2;
const MAX_GROWTH: f64 = 5.0;

/// Outcome of the step-size controller for one trial step
#[derive(Debug, Clone, Copy, PartialEq)]
enum Adjust {
    Decrease(f64),
    Keep(f64),
}

/// Adaptive integrator persisting its step-size estimate across calls
#[derive(Debug, Clone)]
pub struct AdaptiveStepper {
    config: SolverConfig,
    /// Last successful step size (ms)
    h: f64,
    k: [Vector; 6],
    y_err: Vector,
}

impl AdaptiveStepper {
    /// Create a stepper with an initial step-size guess (ms)
    pub fn new(config: SolverConfig, initial_step: f64) -> Self {
        Self {
            config,
            h: initial_step,
            k: [[0.0; STATE_VEC_SIZE]; 6],
            y_err: [0.0; STATE_VEC_SIZE],
        }
    }

    /// Current step-size estimate (ms)
    pub fn step_size(&self) -> f64 {
        self.h
    }

    /// Overwrite the step-size estimate, e.g. when restoring a snapshot
    pub fn set_step_size(&mut self, h: f64) {
        self.h = h;
    }

    /// Solver configuration
    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Advance `y` from time 0 to `span`, returning the accepted step count.
    ///
    /// On failure `y` holds the last accepted state.
    pub fn integrate<C>(
        &mut self,
        rhs: DynamicsFn<C>,
        ctx: &C,
        y: &mut Vector,
        span: f64,
    ) -> Result<u32, StepFailure> {
        let mut t = 0.0;
        let mut attempts = 0u32;
        let mut accepted = 0u32;

        while t < span {
            let remaining = span - t;
            let mut final_step = self.h >= remaining;
            let mut h = if final_step { remaining } else { self.h };

            loop {
                attempts += 1;
                if attempts > self.config.max_attempts {
                    return Err(StepFailure::BudgetExhausted { attempts: attempts - 1, t, h });
                }

                let y_new = self.trial_step(rhs, ctx, t, y, h);
                let outcome = if y_new.iter().all(|x| x.is_finite()) {
                    self.adjust(y, h)
                } else {
                    Adjust::Decrease(h * MAX_SHRINK)
                };

                match outcome {
                    Adjust::Decrease(h_smaller) => {
                        if h_smaller < self.config.min_step {
                            return Err(if y_new.iter().all(|x| x.is_finite()) {
                                StepFailure::StepUnderflow { t, h: h_smaller }
                            } else {
                                StepFailure::NonFinite { t }
                            });
                        }
                        // a shortened step no longer lands on the boundary
                        h = h_smaller;
                        final_step = false;
                    }
                    Adjust::Keep(h_next) => {
                        *y = y_new;
                        accepted += 1;
                        if final_step {
                            t = span;
                            // a clipped final step says nothing about the natural step size
                            self.h = self.h.max(h_next.min(self.h * MAX_GROWTH));
                        } else {
                            t += h;
                            self.h = h_next;
                        }
                        break;
                    }
                }
            }
        }

        Ok(accepted)
    }

    fn trial_step<C>(
        &mut self,
        rhs: DynamicsFn<C>,
        ctx: &C,
        t: f64,
        y: &Vector,
        h: f64,
    ) -> Vector {
        let mut tmp = [0.0; STATE_VEC_SIZE];
        let [k1, k2, k3, k4, k5, k6] = &mut self.k;

        rhs(t, y, k1, ctx);

        for i in 0..STATE_VEC_SIZE {
            tmp[i] = y[i] + h * A21 * k1[i];
        }
        rhs(t + C2 * h, &tmp, k2, ctx);

        for i in 0..STATE_VEC_SIZE {
            tmp[i] = y[i] + h * (A31 * k1[i] + A32 * k2[i]);
        }
        rhs(t + C3 * h, &tmp, k3, ctx);

        for i in 0..STATE_VEC_SIZE {
            tmp[i] = y[i] + h * (A41 * k1[i] + A42 * k2[i] + A43 * k3[i]);
        }
        rhs(t + C4 * h, &tmp, k4, ctx);

        for i in 0..STATE_VEC_SIZE {
            tmp[i] = y[i] + h * (A51 * k1[i] + A52 * k2[i] + A53 * k3[i] + A54 * k4[i]);
        }
        rhs(t + h, &tmp, k5, ctx);

        for i in 0..STATE_VEC_SIZE {
            tmp[i] = y[i]
                + h * (A61 * k1[i] + A62 * k2[i] + A63 * k3[i] + A64 * k4[i] + A65 * k5[i]);
        }
        rhs(t + C6 * h, &tmp, k6, ctx);

        let mut y_new = [0.0; STATE_VEC_SIZE];
        for i in 0..STATE_VEC_SIZE {
            y_new[i] = y[i]
                + h * (B1 * k1[i] + B3 * k3[i] + B4 * k4[i] + B5 * k5[i] + B6 * k6[i]);
            self.y_err[i] =
                h * (E1 * k1[i] + E3 * k3[i] + E4 * k4[i] + E5 * k5[i] + E6 * k6[i]);
        }
        y_new
    }

    /// Standard `y`-control: compare each error against `eps_abs + eps_rel |y|`
    fn adjust(&self, y: &Vector, h: f64) -> Adjust {
        let mut ratio_max = 0.0f64;
        for i in 0..STATE_VEC_SIZE {
            let tolerance = self.config.eps_abs + self.config.eps_rel * y[i].abs();
            let ratio = self.y_err[i].abs() / tolerance;
            ratio_max = ratio_max.max(ratio);
        }

        if ratio_max > 1.1 {
            let factor = (SAFETY / ratio_max.powf(1.0 / ORDER)).max(MAX_SHRINK);
            Adjust::Decrease(h * factor)
        } else if ratio_max < 0.5 {
            let factor = (SAFETY / ratio_max.powf(1.0 / (ORDER + 1.0))).clamp(1.0, MAX_GROWTH);
            Adjust::Keep(h * factor)
        } else {
            Adjust::Keep(h)
        }
    }
}
