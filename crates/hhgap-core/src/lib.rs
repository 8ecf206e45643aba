//! Gap-junction-coupled Traub-Miles neuron
//!
//! A single-compartment Hodgkin-Huxley neuron with beta-function
//! conductance synapses, integrated by an embedded Runge-Kutta-Fehlberg
//! stepper with persisted step size. Electrical coupling between neurons is
//! resolved by waveform relaxation: tentative rounds publish interpolated
//! voltage traces until neighbours agree, then an authoritative pass commits
//! the slice.

#![deny(missing_docs)]
#![warn(clippy::all)]

pub mod buffers;
pub mod channels;
pub mod config;
pub mod dynamics;
pub mod error;
pub mod events;
pub mod kernel;
pub mod neuron;
pub mod params;
pub mod recordables;
pub mod spike;
pub mod state;
pub mod stepper;
pub mod wfr;

pub use config::{NeuronConfig, SliceConfig, SolverConfig};
pub use error::{NeuronError, Result};
pub use events::{CurrentInput, EventKind, GapJunctionInput, SpikeInput};
pub use kernel::BetaKernel;
pub use neuron::{SliceOutcome, StatusUpdate, TraubNeuron};
pub use params::{ParamUpdate, TraubParams};
pub use recordables::{Observable, Recordable};
pub use spike::SpikeEmission;
pub use state::{State, StateIndex, StateUpdate};
pub use wfr::{InterpolationOrder, NonConvergencePolicy, WfrConfig, WfrPhase, WfrRound};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_integration() {
        let params = TraubParams::default();
        assert!(params.validate().is_ok());

        let config = NeuronConfig::default();
        assert_eq!(config.slice.buffer_len(), 20);

        let mut neuron = TraubNeuron::new(config).unwrap();
        let outcome = neuron.update(0, 0, 10).unwrap();
        assert!(outcome.spikes.is_empty());
        assert!(outcome.v_m.is_finite());
    }

    #[test]
    fn test_neuron_can_move_between_threads() {
        fn assert_send<T: Send + Clone>() {}
        assert_send::<TraubNeuron>();
    }
}
