//! Configuration
//!
//! Check configuration, resource limits, and the harness error type.

pub mod types;

use crate::config::types::{CheckConfig, HarnessError, Result};
use std::path::Path;

impl CheckConfig {
    /// Load configuration from a JSON file. Missing fields take their defaults.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            HarnessError::Config(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;

        let config: CheckConfig = serde_json::from_str(&content)
            .map_err(|e| HarnessError::Config(format!("Failed to parse config JSON: {}", e)))?;

        config.validate()?;
        Ok(config)
    }
}
