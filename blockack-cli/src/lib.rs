//! Block Ack CLI Library
//!
//! Shared functionality for the Block Ack trace tools.

pub mod config;
pub mod link;

pub use config::{load_scenario, ConfigError, ScenarioConfig};
pub use link::LossyLink;
