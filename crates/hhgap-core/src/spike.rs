//! Threshold-and-local-maximum spike detection with refractory gating

use crate::state::State;

/// Detection margin above `V_T` (mV)
pub const DETECTION_MARGIN_MV: f64 = 30.0;

/// Spike emitted by the neuron
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SpikeEmission {
    /// Simulation step at whose end the spike was detected
    pub step: u64,
    /// Lag within the slice at which it was detected
    pub lag: usize,
}

impl SpikeEmission {
    /// Spike time in ms for a given resolution
    pub fn time_ms(&self, resolution_ms: f64) -> f64 {
        self.step as f64 * resolution_ms
    }
}

/// Post-step spike detector
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpikeDetector {
    threshold: f64,
    refractory_counts: u32,
    /// Membrane potential at the start of the current lag
    u_old: f64,
}

impl SpikeDetector {
    /// Detector firing at `v_t + 30 mV` with the given refractory step count
    pub fn new(v_t: f64, refractory_counts: u32) -> Self {
        Self {
            threshold: v_t + DETECTION_MARGIN_MV,
            refractory_counts,
            u_old: f64::NEG_INFINITY,
        }
    }

    /// Detection threshold (mV)
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Refractory period in steps
    pub fn refractory_counts(&self) -> u32 {
        self.refractory_counts
    }

    /// Remember the potential before a lag is integrated
    pub fn begin_lag(&mut self, v_m: f64) {
        self.u_old = v_m;
    }

    /// Inspect the state after a lag; returns `true` if a spike is emitted.
    ///
    /// A nonzero refractory counter is decremented instead of testing.
    pub fn check(&mut self, state: &mut State) -> bool {
        if state.refractory_steps > 0 {
            state.refractory_steps -= 1;
            return false;
        }
        let v = state.v_m();
        if v >= self.threshold && self.u_old > v {
            state.refractory_steps = self.refractory_counts;
            return true;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::TraubParams;
    use crate::state::StateIndex;

    fn state_at(v: f64) -> State {
        let mut state = State::resting(&TraubParams::default());
        state.y[StateIndex::VM.idx()] = v;
        state
    }

    #[test]
    fn test_rising_flank_is_not_a_spike() {
        let mut detector = SpikeDetector::new(-50.0, 20);
        detector.begin_lag(-10.0);
        let mut state = state_at(10.0);
        assert!(!detector.check(&mut state));
    }

    #[test]
    fn test_falling_flank_above_threshold_spikes() {
        let mut detector = SpikeDetector::new(-50.0, 20);
        detector.begin_lag(30.0);
        let mut state = state_at(20.0);
        assert!(detector.check(&mut state));
        assert_eq!(state.refractory_steps, 20);
    }

    #[test]
    fn test_below_threshold_never_spikes() {
        let mut detector = SpikeDetector::new(-50.0, 20);
        detector.begin_lag(-19.0);
        let mut state = state_at(-21.0);
        assert!(!detector.check(&mut state));
    }

    #[test]
    fn test_refractory_counter_decrements() {
        let mut detector = SpikeDetector::new(-50.0, 2);
        let mut state = state_at(20.0);
        state.refractory_steps = 2;
        detector.begin_lag(30.0);
        assert!(!detector.check(&mut state));
        assert_eq!(state.refractory_steps, 1);
        assert!(!detector.check(&mut state));
        assert_eq!(state.refractory_steps, 0);
        assert!(detector.check(&mut state));
    }
}
