// src/utils/config.rs
//! Configuration for the interception subsystem

use crate::utils::errors::{GateError, Result};
use serde::{Deserialize, Serialize};

/// Configuration shared by the interception layer and its components.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateConfig {
    /// Number of override-table puts between automatic dead-entry sweeps.
    ///
    /// Bounds the table to live entries plus at most this many dead slots,
    /// independent of how many packets pass through.
    pub sweep_interval: usize,

    /// Log accepted cancel/replace decisions at debug level.
    pub log_decisions: bool,

    /// Warn once when an outbound queue grows past this depth.
    pub queue_warn_depth: usize,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            sweep_interval: 256,
            log_decisions: true,
            queue_warn_depth: 1024,
        }
    }
}

impl GateConfig {
    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        if self.sweep_interval == 0 {
            return Err(GateError::Config(
                "sweep_interval must be at least 1".to_string(),
            ));
        }
        if self.queue_warn_depth == 0 {
            return Err(GateError::Config(
                "queue_warn_depth must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
