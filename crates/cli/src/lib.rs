// cli/src/lib.rs
pub mod config;
pub mod quote;
pub mod simulate;

pub use config::SaleConfig;
pub use quote::{quote, Quote};
pub use simulate::{run, SimulationReport};
