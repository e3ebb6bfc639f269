//! Machine configuration.
//!
//! Every field has a default, so a config file only needs the keys it
//! changes:
//! ```json
//! { "delay_ms": 250 }
//! ```

use serde::{Serialize, Deserialize};
use std::path::Path;
use thiserror::Error;

/// Default interval between driver ticks.
pub const DEFAULT_DELAY_MS: u64 = 100;
/// Default number of registers, ACC included.
pub const DEFAULT_REGISTER_COUNT: usize = 256;
/// Default number of registers zeroed by a reset.
pub const DEFAULT_RESET_SPAN: usize = 100;

/// Machine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MachineConfig {
    /// Interval between ticks while running, in milliseconds.
    pub delay_ms: u64,

    /// Size of the register file.
    pub register_count: usize,

    /// Registers `0..reset_span` are zeroed by a reset. Registers above the
    /// span keep their values.
    pub reset_span: usize,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            delay_ms: DEFAULT_DELAY_MS,
            register_count: DEFAULT_REGISTER_COUNT,
            reset_span: DEFAULT_RESET_SPAN,
        }
    }
}

impl MachineConfig {
    /// Parse and validate a JSON config.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse, and validate a JSON config file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::Io(e.to_string()))?;
        Self::from_json_str(&text)
    }

    /// Check that the register layout makes sense.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.register_count == 0 {
            return Err(ConfigError::NoRegisters);
        }
        if self.reset_span > self.register_count {
            return Err(ConfigError::ResetSpanTooLarge {
                span: self.reset_span,
                count: self.register_count,
            });
        }
        Ok(())
    }
}

/// Errors that can occur while loading a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(String),

    #[error("invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("register_count must be at least 1 (the accumulator)")]
    NoRegisters,

    #[error("reset_span {span} exceeds register_count {count}")]
    ResetSpanTooLarge { span: usize, count: usize },
}
