//! Configuration types for PACTUM

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::PactumError;
use crate::traits::PactumResult;

/// Main node configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Node name for logging
    pub name: String,

    /// Logging level
    pub log_level: String,

    /// Flow engine configuration
    pub flow: FlowConfig,

    /// Notary configuration
    pub notary: NotaryConfig,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            name: "pactum-node".to_string(),
            log_level: "info".to_string(),
            flow: FlowConfig::default(),
            notary: NotaryConfig::default(),
        }
    }
}

impl NodeConfig {
    /// Load configuration from a JSON file
    pub fn load(path: impl AsRef<Path>) -> PactumResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config = serde_json::from_str(&contents)?;
        Ok(config)
    }

    /// Save configuration to a JSON file
    pub fn save(&self, path: impl AsRef<Path>) -> PactumResult<()> {
        let contents = serde_json::to_string_pretty(self)
            .map_err(|e| PactumError::ConfigError(e.to_string()))?;
        std::fs::write(path, contents)?;
        Ok(())
    }
}

/// Flow engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowConfig {
    /// Buffered messages per session channel
    pub session_buffer: usize,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self { session_buffer: 32 }
    }
}

/// Notary configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotaryConfig {
    /// Clock slack allowed when attesting time windows, in milliseconds
    pub clock_tolerance_ms: u64,
}

impl Default for NotaryConfig {
    fn default() -> Self {
        Self {
            clock_tolerance_ms: 500,
        }
    }
}
