//! hhgap CLI crate
//!
//! Drives the neuron engine from TOML experiment files:
//! - `init`: write a template experiment.
//! - `run`: a single neuron under explicit, Poisson and current-step stimuli,
//!   with per-step recording of any registered recordable.
//! - `pair`: a leader/follower pair joined by a gap junction, each slice
//!   relaxed to convergence before it is committed.
//!
//! Reports are JSON. The library surface exists so the simulations can be
//! exercised from tests without spawning the binary.

pub mod commands;
pub mod config;
pub mod error;
pub mod stimulus;

pub use commands::pair::{simulate_pair, PairReport};
pub use commands::run::{simulate_single, RunReport};
pub use commands::HhgapCli;
