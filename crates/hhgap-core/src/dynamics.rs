//! Right-hand side of the neuron ODE system
//!
//! The dynamics are a free function taking an explicit context handle so the
//! stepper can invoke them through a plain function pointer. The function is
//! pure: identical inputs always yield identical derivatives.

use crate::channels::{ionic_current, GateRates};
use crate::params::TraubParams;
use crate::state::{StateIndex, STATE_VEC_SIZE};

/// Signature of a dynamics function usable by [`crate::stepper::AdaptiveStepper`]
pub type DynamicsFn<C> = fn(f64, &[f64; STATE_VEC_SIZE], &mut [f64; STATE_VEC_SIZE], &C);

/// Gap-junction drive valid over one lag of the current slice
#[derive(Debug, Clone, Copy)]
pub struct GapDrive<'a> {
    /// Summed coupling conductance of all gap junctions (nS)
    pub sum_g: f64,
    /// Conductance-weighted interpolation coefficients of this lag
    pub coefficients: &'a [f64],
    /// Lag length used to normalise time inside the lag (ms)
    pub step_ms: f64,
}

impl<'a> GapDrive<'a> {
    /// No coupling
    pub const fn none() -> Self {
        Self {
            sum_g: 0.0,
            coefficients: &[],
            step_ms: 1.0,
        }
    }

    /// Weighted neighbour voltage at time `t` into the lag
    #[inline]
    pub fn neighbour_term(&self, t: f64) -> f64 {
        let tau = t / self.step_ms;
        self.coefficients
            .iter()
            .rev()
            .fold(0.0, |acc, c| acc * tau + c)
    }

    /// Gap current (pA) at time `t` into the lag for own potential `v`
    #[inline]
    pub fn current(&self, t: f64, v: f64) -> f64 {
        self.neighbour_term(t) - self.sum_g * v
    }
}

/// Everything the dynamics read besides time and state
#[derive(Debug, Clone, Copy)]
pub struct DynamicsContext<'a> {
    /// Model parameters
    pub params: &'a TraubParams,
    /// Injected stimulus current (pA)
    pub i_stim: f64,
    /// Gap-junction input of the current lag
    pub gap: GapDrive<'a>,
}

/// Traub-Miles membrane, gating and beta-kernel derivatives
pub fn traub_dynamics(
    t: f64,
    y: &[f64; STATE_VEC_SIZE],
    f: &mut [f64; STATE_VEC_SIZE],
    ctx: &DynamicsContext<'_>,
) {
    let p = ctx.params;

    let v = y[StateIndex::VM.idx()];
    let m = y[StateIndex::HhM.idx()];
    let h = y[StateIndex::HhH.idx()];
    let n = y[StateIndex::HhN.idx()];
    let dg_ex = y[StateIndex::DgExc.idx()];
    let g_ex = y[StateIndex::GExc.idx()];
    let dg_in = y[StateIndex::DgInh.idx()];
    let g_in = y[StateIndex::GInh.idx()];

    let i_ion = ionic_current(p, v, m, h, n);
    let i_syn_ex = g_ex * (v - p.e_ex);
    let i_syn_in = g_in * (v - p.e_in);
    let i_gap = ctx.gap.current(t, v);

    f[StateIndex::VM.idx()] =
        (-i_ion - i_syn_ex - i_syn_in + ctx.i_stim + p.i_e + i_gap) / p.c_m;

    let r = GateRates::at(v, p.v_t);
    f[StateIndex::HhM.idx()] = r.alpha_m - (r.alpha_m + r.beta_m) * m;
    f[StateIndex::HhH.idx()] = r.alpha_h - (r.alpha_h + r.beta_h) * h;
    f[StateIndex::HhN.idx()] = r.alpha_n - (r.alpha_n + r.beta_n) * n;

    f[StateIndex::DgExc.idx()] = -dg_ex / p.tau_rise_ex;
    f[StateIndex::GExc.idx()] = dg_ex - g_ex / p.tau_decay_ex;
    f[StateIndex::DgInh.idx()] = -dg_in / p.tau_rise_in;
    f[StateIndex::GInh.idx()] = dg_in - g_in / p.tau_decay_in;
}
