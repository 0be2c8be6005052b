//! This module contains the simulation algorithms of the library.

pub mod annotation;
pub mod multinomial;
pub mod mutation;
pub mod proportions;
pub mod simulator;

pub use annotation::Annotation;
pub use mutation::{MutationEngine, Substitution};
pub use simulator::{SimulationModel, simulate_read_counts};
