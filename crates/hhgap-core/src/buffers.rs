//! Per-slice input buffers
//!
//! Spike and current inputs are summed into ring buffers indexed by their
//! delivery step; the integration loop drains them lag by lag. Gap-junction
//! data is accumulated per round and cleared after every pass.

use crate::dynamics::GapDrive;
use crate::error::*;
use crate::events::{CurrentInput, GapJunctionInput, SpikeInput};

/// Fixed window of per-step accumulators addressed by absolute step
#[derive(Debug, Clone)]
pub struct RingBuffer {
    values: Vec<f64>,
    window_start: u64,
}

impl RingBuffer {
    /// Buffer holding `len` consecutive steps starting at step 0
    pub fn new(len: usize) -> Self {
        Self {
            values: vec![0.0; len],
            window_start: 0,
        }
    }

    /// First step held
    pub fn window_start(&self) -> u64 {
        self.window_start
    }

    /// One past the last step held
    pub fn window_end(&self) -> u64 {
        self.window_start + self.values.len() as u64
    }

    fn slot(&self, step: u64) -> Result<usize> {
        if step < self.window_start || step >= self.window_end() {
            return Err(NeuronError::EventOutOfWindow {
                step,
                window_start: self.window_start,
                window_end: self.window_end(),
            });
        }
        Ok((step % self.values.len() as u64) as usize)
    }

    /// Add `value` to the accumulator of `step`
    pub fn add_value(&mut self, step: u64, value: f64) -> Result<()> {
        let slot = self.slot(step)?;
        self.values[slot] += value;
        Ok(())
    }

    /// Read the accumulator of `step` without clearing it
    pub fn peek_value(&self, step: u64) -> Result<f64> {
        Ok(self.values[self.slot(step)?])
    }

    /// Read and clear the accumulator of `step`
    pub fn take_value(&mut self, step: u64) -> Result<f64> {
        let slot = self.slot(step)?;
        Ok(std::mem::take(&mut self.values[slot]))
    }

    /// Move the window to start at `step`, discarding anything before it
    pub fn advance_to(&mut self, step: u64) {
        let len = self.values.len() as u64;
        let stale = step.saturating_sub(self.window_start).min(len);
        for s in self.window_start..self.window_start + stale {
            self.values[(s % len) as usize] = 0.0;
        }
        self.window_start = self.window_start.max(step);
    }

    /// Zero every accumulator, keeping the window position
    pub fn clear(&mut self) {
        self.values.iter_mut().for_each(|v| *v = 0.0);
    }
}

/// Inputs due at one lag
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LagInputs {
    /// Summed excitatory weight
    pub spike_exc: f64,
    /// Summed inhibitory weight magnitude
    pub spike_inh: f64,
    /// Summed injected current (pA)
    pub current: f64,
}

/// Spike and current ring buffers of one neuron
#[derive(Debug, Clone)]
pub struct EventBuffers {
    spike_exc: RingBuffer,
    spike_inh: RingBuffer,
    currents: RingBuffer,
}

impl EventBuffers {
    /// Buffers spanning `len` steps
    pub fn new(len: usize) -> Self {
        Self {
            spike_exc: RingBuffer::new(len),
            spike_inh: RingBuffer::new(len),
            currents: RingBuffer::new(len),
        }
    }

    /// Queue a spike, routed by the sign of its weight
    pub fn add_spike(&mut self, spike: &SpikeInput) -> Result<()> {
        let weight = spike.total_weight();
        if weight > 0.0 {
            self.spike_exc.add_value(spike.step, weight)
        } else {
            self.spike_inh.add_value(spike.step, -weight)
        }
    }

    /// Queue an injected current
    pub fn add_current(&mut self, current: &CurrentInput) -> Result<()> {
        self.currents.add_value(current.step, current.amplitude)
    }

    /// Consume the inputs due at `step`
    pub fn take(&mut self, step: u64) -> Result<LagInputs> {
        Ok(LagInputs {
            spike_exc: self.spike_exc.take_value(step)?,
            spike_inh: self.spike_inh.take_value(step)?,
            current: self.currents.take_value(step)?,
        })
    }

    /// Inspect the inputs due at `step`, leaving them queued
    pub fn peek(&self, step: u64) -> Result<LagInputs> {
        Ok(LagInputs {
            spike_exc: self.spike_exc.peek_value(step)?,
            spike_inh: self.spike_inh.peek_value(step)?,
            current: self.currents.peek_value(step)?,
        })
    }

    /// Slide every buffer to start at `step`
    pub fn advance_to(&mut self, step: u64) {
        self.spike_exc.advance_to(step);
        self.spike_inh.advance_to(step);
        self.currents.advance_to(step);
    }

    /// Drop all queued inputs
    pub fn clear(&mut self) {
        self.spike_exc.clear();
        self.spike_inh.clear();
        self.currents.clear();
    }

    /// First step that can still receive input
    pub fn window_start(&self) -> u64 {
        self.spike_exc.window_start()
    }
}

/// Accumulated gap-junction input for the coming pass
#[derive(Debug, Clone)]
pub struct GapInput {
    /// Sum of coupling conductances (nS)
    sum_g: f64,
    /// Conductance-weighted sum of neighbour coefficients
    coefficients: Vec<f64>,
    per_lag: usize,
    connections: usize,
}

impl GapInput {
    /// Accumulator for `min_delay` lags of `per_lag` coefficients each
    pub fn new(min_delay: usize, per_lag: usize) -> Self {
        Self {
            sum_g: 0.0,
            coefficients: vec![0.0; min_delay * per_lag],
            per_lag,
            connections: 0,
        }
    }

    /// Add one neighbour's contribution
    pub fn accumulate(&mut self, input: &GapJunctionInput) -> Result<()> {
        if input.coefficients.len() != self.coefficients.len() {
            return Err(NeuronError::CoefficientMismatch {
                expected: self.coefficients.len(),
                actual: input.coefficients.len(),
            });
        }
        self.sum_g += input.weight;
        for (acc, c) in self.coefficients.iter_mut().zip(&input.coefficients) {
            *acc += input.weight * c;
        }
        self.connections += 1;
        Ok(())
    }

    /// Drive for one lag of the coming pass
    pub fn drive(&self, lag: usize, step_ms: f64) -> GapDrive<'_> {
        let start = lag * self.per_lag;
        GapDrive {
            sum_g: self.sum_g,
            coefficients: &self.coefficients[start..start + self.per_lag],
            step_ms,
        }
    }

    /// Summed coupling conductance (nS)
    pub fn sum_g(&self) -> f64 {
        self.sum_g
    }

    /// Contributions received since the last reset
    pub fn connections(&self) -> usize {
        self.connections
    }

    /// Clear after a pass; neighbours resend every round
    pub fn reset(&mut self) {
        self.sum_g = 0.0;
        self.connections = 0;
        self.coefficients.iter_mut().for_each(|c| *c = 0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ring_buffer_window() {
        let mut buf = RingBuffer::new(4);
        buf.add_value(1, 2.0).unwrap();
        buf.add_value(1, 0.5).unwrap();
        assert_eq!(buf.peek_value(1).unwrap(), 2.5);
        assert_eq!(buf.take_value(1).unwrap(), 2.5);
        assert_eq!(buf.take_value(1).unwrap(), 0.0);
        assert!(buf.add_value(4, 1.0).is_err());

        buf.add_value(3, 1.0).unwrap();
        buf.advance_to(2);
        assert_eq!(buf.window_end(), 6);
        buf.add_value(5, 7.0).unwrap();
        assert_eq!(buf.take_value(3).unwrap(), 1.0);
        assert_eq!(buf.take_value(5).unwrap(), 7.0);
        assert!(buf.add_value(1, 1.0).is_err());
    }

    #[test]
    fn test_advance_discards_stale_steps() {
        let mut buf = RingBuffer::new(3);
        buf.add_value(0, 1.0).unwrap();
        buf.advance_to(1);
        // slot of step 0 is reused by step 3
        assert_eq!(buf.peek_value(3).unwrap(), 0.0);
    }

    #[test]
    fn test_spikes_routed_by_sign() {
        let mut buffers = EventBuffers::new(10);
        buffers.add_spike(&SpikeInput::new(2, 1.5)).unwrap();
        buffers.add_spike(&SpikeInput::new(2, -0.5)).unwrap();
        buffers.add_current(&CurrentInput::new(2, 100.0)).unwrap();

        let peeked = buffers.peek(2).unwrap();
        let taken = buffers.take(2).unwrap();
        assert_eq!(peeked, taken);
        assert_eq!(taken.spike_exc, 1.5);
        assert_eq!(taken.spike_inh, 0.5);
        assert_eq!(taken.current, 100.0);
        assert_eq!(buffers.take(2).unwrap(), LagInputs::default());
    }

    #[test]
    fn test_gap_input_accumulates() {
        let mut gap = GapInput::new(2, 2);
        gap.accumulate(&GapJunctionInput::new(0.5, vec![-60.0, 1.0, -59.0, 2.0]))
            .unwrap();
        gap.accumulate(&GapJunctionInput::new(0.5, vec![-62.0, 1.0, -61.0, 0.0]))
            .unwrap();
        assert_eq!(gap.sum_g(), 1.0);
        assert_eq!(gap.connections(), 2);

        let drive = gap.drive(1, 0.1);
        assert_eq!(drive.coefficients, &[-60.0, 1.0]);

        assert!(gap.accumulate(&GapJunctionInput::new(1.0, vec![0.0])).is_err());
        gap.reset();
        assert_eq!(gap.sum_g(), 0.0);
        assert_eq!(gap.drive(0, 0.1).coefficients, &[0.0, 0.0]);
    }
}
