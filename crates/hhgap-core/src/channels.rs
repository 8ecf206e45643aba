//! Traub-Miles sodium and potassium channel kinetics

use crate::params::TraubParams;

/// Opening and closing rates of the three gating variables (1/ms)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GateRates {
    /// Sodium activation opening rate
    pub alpha_m: f64,
    /// Sodium activation closing rate
    pub beta_m: f64,
    /// Sodium inactivation opening rate
    pub alpha_h: f64,
    /// Sodium inactivation closing rate
    pub beta_h: f64,
    /// Potassium activation opening rate
    pub alpha_n: f64,
    /// Potassium activation closing rate
    pub beta_n: f64,
}

impl GateRates {
    /// Rates at membrane potential `v` for voltage offset `v_t`
    #[inline]
    pub fn at(v: f64, v_t: f64) -> Self {
        let u = v - v_t;
        Self {
            alpha_m: 0.32 * exp_ratio(13.0 - u, 4.0),
            beta_m: 0.28 * exp_ratio(u - 40.0, 5.0),
            alpha_h: 0.128 * ((17.0 - u) / 18.0).exp(),
            beta_h: 4.0 / (1.0 + ((40.0 - u) / 5.0).exp()),
            alpha_n: 0.032 * exp_ratio(15.0 - u, 5.0),
            beta_n: 0.5 * ((10.0 - u) / 40.0).exp(),
        }
    }

    /// Steady-state values `(m, h, n)`
    pub fn steady_state(&self) -> (f64, f64, f64) {
        (
            self.alpha_m / (self.alpha_m + self.beta_m),
            self.alpha_h / (self.alpha_h + self.beta_h),
            self.alpha_n / (self.alpha_n + self.beta_n),
        )
    }
}

/// `x / (exp(x / scale) - 1)`, taking its limit `scale` near `x = 0`
#[inline]
fn exp_ratio(x: f64, scale: f64) -> f64 {
    if x.abs() < 1e-9 {
        scale
    } else {
        x / ((x / scale).exp() - 1.0)
    }
}

/// Sum of sodium, potassium and leak currents (pA), outward positive
#[inline]
pub fn ionic_current(params: &TraubParams, v: f64, m: f64, h: f64, n: f64) -> f64 {
    let i_na = params.g_na * m * m * m * h * (v - params.e_na);
    let i_k = params.g_k * n * n * n * n * (v - params.e_k);
    let i_l = params.g_l * (v - params.e_l);
    i_na + i_k + i_l
}

/// Net current at `v` with every gate at its steady state
fn steady_state_current(params: &TraubParams, v: f64) -> f64 {
    let (m, h, n) = GateRates::at(v, params.v_t).steady_state();
    params.i_e - ionic_current(params, v, m, h, n)
}

const SCAN_STEP_MV: f64 = 0.1;
const SCAN_RANGE_MV: f64 = 100.0;

/// Membrane potential nearest `E_L` at which the steady-state current
/// balances `I_e`, or `None` if no sign change exists within 100 mV.
pub fn resting_potential(params: &TraubParams) -> Option<f64> {
    let origin = params.e_l;
    if steady_state_current(params, origin) == 0.0 {
        return Some(origin);
    }

    let steps = (SCAN_RANGE_MV / SCAN_STEP_MV) as usize;
    for k in 0..steps {
        for direction in [1.0, -1.0] {
            let a = origin + direction * k as f64 * SCAN_STEP_MV;
            let b = a + direction * SCAN_STEP_MV;
            let fa = steady_state_current(params, a);
            let fb = steady_state_current(params, b);
            if fa.is_finite() && fb.is_finite() && fa * fb <= 0.0 {
                return Some(bisect(params, a.min(b), a.max(b)));
            }
        }
    }
    None
}

fn bisect(params: &TraubParams, mut lo: f64, mut hi: f64) -> f64 {
    let mut f_lo = steady_state_current(params, lo);
    for _ in 0..80 {
        let mid = 0.5 * (lo + hi);
        let f_mid = steady_state_current(params, mid);
        if f_mid == 0.0 {
            return mid;
        }
        if f_lo * f_mid < 0.0 {
            hi = mid;
        } else {
            lo = mid;
            f_lo = f_mid;
        }
    }
    0.5 * (lo + hi)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_steady_state_in_unit_interval() {
        for v in [-90.0, -60.0, -40.0, 0.0, 30.0] {
            let (m, h, n) = GateRates::at(v, -50.0).steady_state();
            for x in [m, h, n] {
                assert!((0.0..=1.0).contains(&x), "gate {} out of range at {} mV", x, v);
            }
        }
    }

    #[test]
    fn test_rates_continuous_at_removable_points() {
        let v_t = -50.0;
        let at = |u: f64| GateRates::at(v_t + u, v_t);

        let r = at(13.0);
        assert_eq!(r.alpha_m, 0.32 * 4.0);
        assert!((at(13.0 + 1e-6).alpha_m - r.alpha_m).abs() < 1e-6);
        assert!((at(13.0 - 1e-6).alpha_m - r.alpha_m).abs() < 1e-6);

        let r = at(15.0);
        assert_eq!(r.alpha_n, 0.032 * 5.0);
        assert!((at(15.0 + 1e-6).alpha_n - r.alpha_n).abs() < 1e-6);

        let r = at(40.0);
        assert_eq!(r.beta_m, 0.28 * 5.0);
        assert!((at(40.0 - 1e-6).beta_m - r.beta_m).abs() < 1e-6);

        for u in [13.0, 15.0, 40.0] {
            let (m, h, n) = at(u).steady_state();
            assert!(m.is_finite() && h.is_finite() && n.is_finite());
        }
    }

    #[test]
    fn test_resting_potential_balances_current() {
        let params = TraubParams::default();
        let v = resting_potential(&params).unwrap();
        assert!((v - params.e_l).abs() < 0.5);
        assert!(steady_state_current(&params, v).abs() < 1e-9);
    }

    #[test]
    fn test_resting_potential_shifts_with_bias() {
        let mut params = TraubParams::default();
        params.i_e = 50.0;
        let v = resting_potential(&params).unwrap();
        assert!(v > params.e_l);
    }
}
