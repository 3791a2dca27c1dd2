//! Scenario file support for the Block Ack trace tools

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Scenario loading errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read scenario file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse scenario file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Trace scenario configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioConfig {
    /// Number of MPDUs to deliver
    #[serde(default = "default_mpdu_count")]
    pub mpdu_count: usize,
    /// Negotiated reordering buffer size
    #[serde(default = "default_buffer_size")]
    pub buffer_size: u16,
    /// Initial sequence number
    #[serde(default)]
    pub starting_seq: u16,
    /// Block Ack bitmap length in octets (1, 2, 4, 8, 16 or 32)
    #[serde(default = "default_bitmap_octets")]
    pub bitmap_octets: usize,
    /// MPDUs transmitted per burst before the Block Ack exchange
    #[serde(default = "default_burst_size")]
    pub burst_size: usize,
    /// Probability in [0, 1] that a frame is lost on the link
    #[serde(default = "default_loss_rate")]
    pub loss_rate: f64,
    /// Transmission attempts before an MPDU is discarded
    #[serde(default = "default_retry_limit")]
    pub retry_limit: u32,
    /// Payload size per MPDU in bytes
    #[serde(default = "default_payload_len")]
    pub payload_len: usize,
    /// Seed for the lossy link
    #[serde(default = "default_seed")]
    pub seed: u64,
}

fn default_mpdu_count() -> usize {
    256
}

fn default_buffer_size() -> u16 {
    64
}

fn default_bitmap_octets() -> usize {
    8
}

fn default_burst_size() -> usize {
    16
}

fn default_loss_rate() -> f64 {
    0.2
}

fn default_retry_limit() -> u32 {
    7
}

fn default_payload_len() -> usize {
    64
}

fn default_seed() -> u64 {
    0xBAD5_EED
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        ScenarioConfig {
            mpdu_count: default_mpdu_count(),
            buffer_size: default_buffer_size(),
            starting_seq: 0,
            bitmap_octets: default_bitmap_octets(),
            burst_size: default_burst_size(),
            loss_rate: default_loss_rate(),
            retry_limit: default_retry_limit(),
            payload_len: default_payload_len(),
            seed: default_seed(),
        }
    }
}

/// Load a scenario from a TOML file
pub fn load_scenario(path: &Path) -> Result<ScenarioConfig, ConfigError> {
    let contents = fs::read_to_string(path)?;
    Ok(toml::from_str(&contents)?)
}
