//! Turns a [`StimulusConfig`] into per-slice input events

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::StimulusConfig;
use hhgap_core::{CurrentInput, Result, SliceConfig, SpikeInput, TraubNeuron};

/// Stateful event source, queried one slice ahead of integration
pub struct StimulusSource {
    explicit: Vec<(u64, f64)>,
    next_explicit: usize,
    poisson_probability: f64,
    poisson_weight: f64,
    current_pa: f64,
    current_start: u64,
    current_stop: Option<u64>,
    rng: StdRng,
}

impl StimulusSource {
    /// Discretise the stimulus onto the time grid
    pub fn new(config: &StimulusConfig, slice: &SliceConfig, seed: u64) -> Self {
        let mut explicit: Vec<(u64, f64)> = config
            .spike_times_ms
            .iter()
            .filter(|t| **t >= 0.0)
            .map(|t| (slice.steps(*t) as u64, config.spike_weight))
            .collect();
        explicit.sort_by_key(|(step, _)| *step);

        Self {
            explicit,
            next_explicit: 0,
            poisson_probability: (config.poisson_rate_hz * slice.resolution_ms / 1000.0).min(1.0),
            poisson_weight: config.poisson_weight,
            current_pa: config.current_pa,
            current_start: slice.steps(config.current_start_ms) as u64,
            current_stop: config.current_stop_ms.map(|t| slice.steps(t) as u64),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Queue every input due in `[from, to)`
    pub fn deliver(&mut self, neuron: &mut TraubNeuron, from: u64, to: u64) -> Result<usize> {
        let mut delivered = 0;

        while let Some(&(step, weight)) = self.explicit.get(self.next_explicit) {
            if step >= to {
                break;
            }
            self.next_explicit += 1;
            if step >= from {
                neuron.handle_spike(&SpikeInput::new(step, weight))?;
                delivered += 1;
            }
        }

        for step in from..to {
            if self.poisson_probability > 0.0 && self.rng.gen::<f64>() < self.poisson_probability {
                neuron.handle_spike(&SpikeInput::new(step, self.poisson_weight))?;
                delivered += 1;
            }
            if self.current_pa != 0.0 && self.current_active(step) {
                neuron.handle_current(&CurrentInput::new(step, self.current_pa))?;
            }
        }
        Ok(delivered)
    }

    fn current_active(&self, step: u64) -> bool {
        step >= self.current_start && self.current_stop.map_or(true, |stop| step < stop)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hhgap_core::Recordable;
    use hhgap_core::Observable;

    #[test]
    fn test_explicit_spikes_land_on_grid() {
        let config = StimulusConfig {
            spike_times_ms: vec![0.55, 0.2, 3.0],
            spike_weight: 4.0,
            ..StimulusConfig::default()
        };
        let slice = SliceConfig::default();
        let mut source = StimulusSource::new(&config, &slice, 1);
        assert_eq!(source.explicit, vec![(2, 4.0), (6, 4.0), (30, 4.0)]);

        let mut neuron = TraubNeuron::with_defaults().unwrap();
        assert_eq!(source.deliver(&mut neuron, 0, 10).unwrap(), 2);
        neuron.update(0, 0, 10).unwrap();
        assert!(neuron.read(Recordable::GEx) > 0.0);
        assert_eq!(source.deliver(&mut neuron, 10, 20).unwrap(), 0);
    }

    #[test]
    fn test_poisson_is_seeded() {
        let config = StimulusConfig {
            poisson_rate_hz: 2000.0,
            ..StimulusConfig::default()
        };
        let slice = SliceConfig::default();
        let count = |seed| {
            let mut source = StimulusSource::new(&config, &slice, seed);
            let mut neuron = TraubNeuron::with_defaults().unwrap();
            source.deliver(&mut neuron, 0, 10).unwrap()
        };
        assert_eq!(count(11), count(11));
    }

    #[test]
    fn test_current_window() {
        let config = StimulusConfig {
            current_pa: 50.0,
            current_start_ms: 0.3,
            current_stop_ms: Some(0.5),
            ..StimulusConfig::default()
        };
        let source = StimulusSource::new(&config, &SliceConfig::default(), 0);
        let active: Vec<u64> = (0..10).filter(|s| source.current_active(*s)).collect();
        assert_eq!(active, vec![3, 4]);
    }
}
