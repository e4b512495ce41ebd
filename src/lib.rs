pub mod config;
pub mod error;
pub mod loader;
pub mod mos_model;
pub mod output;
pub mod plot;
pub mod simulation;

pub use config::{RunOverrides, SimulationConfig};
pub use error::{GpwError, Result};
pub use simulation::{Simulation, SimulationResult};
