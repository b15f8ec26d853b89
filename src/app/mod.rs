//! Application layer: configuration, supervision and orchestration.

pub mod config;
pub mod orchestrator;
pub mod supervisor;

pub use config::{Config, ExchangeConfig};
pub use orchestrator::App;
