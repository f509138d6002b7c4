/// Core types and structures for the pycheck harness
use crate::kernel::capabilities::CapabilityTable;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Default wall-clock deadline for one check.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3);

/// Smallest result channel that still fits a failure report with a
/// shortened detail.
pub const MIN_RESULT_LIMIT: usize = 1024;

/// Optional resource caps applied to the worker before the interpreter starts
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceLimits {
    /// Address-space cap in bytes. Also bounds the data segment and,
    /// where the platform allows lowering it, the stack.
    pub max_address_space_bytes: Option<u64>,
}

impl ResourceLimits {
    pub fn with_max_memory(bytes: u64) -> Self {
        Self {
            max_address_space_bytes: Some(bytes),
        }
    }
}

/// Configuration for a correctness check
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckConfig {
    /// Wall-clock deadline enforced by the watchdog
    #[serde(with = "duration_secs")]
    pub timeout: Duration,
    /// Resource caps for the worker process
    pub resource_limits: ResourceLimits,
    /// Interpreter used to run program text
    pub interpreter: PathBuf,
    /// Arguments passed to the interpreter ahead of the bootstrap
    pub interpreter_args: Vec<String>,
    /// Parent directory for per-run workspaces
    pub workspace_root: PathBuf,
    /// Bytes of worker stdout/stderr retained before discarding (bytes)
    pub output_limit: usize,
    /// Upper bound on bytes read from the result channel
    pub result_limit: usize,
    /// Interpreter operations disabled before the program runs
    pub capabilities: CapabilityTable,
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            resource_limits: ResourceLimits::default(),
            interpreter: PathBuf::from("python3"),
            // -I: ignore PYTHON* env and user site-packages, -B: no .pyc writes
            interpreter_args: vec!["-I".to_string(), "-B".to_string()],
            workspace_root: std::env::temp_dir(),
            output_limit: 1024 * 1024,
            result_limit: 256 * 1024,
            capabilities: CapabilityTable::default(),
        }
    }
}

impl CheckConfig {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_memory(mut self, bytes: u64) -> Self {
        self.resource_limits = ResourceLimits::with_max_memory(bytes);
        self
    }

    /// Reject configurations the supervisor cannot honour.
    pub fn validate(&self) -> Result<()> {
        if self.timeout.is_zero() {
            return Err(HarnessError::Config("timeout must be positive".to_string()));
        }
        if self.interpreter.as_os_str().is_empty() {
            return Err(HarnessError::Config("interpreter path is empty".to_string()));
        }
        if self.resource_limits.max_address_space_bytes == Some(0) {
            return Err(HarnessError::Config(
                "max_address_space_bytes must be positive when set".to_string(),
            ));
        }
        if self.result_limit < MIN_RESULT_LIMIT {
            return Err(HarnessError::Config(format!(
                "result_limit must be at least {} bytes",
                MIN_RESULT_LIMIT
            )));
        }
        Ok(())
    }
}

/// Timeouts are written as fractional seconds in config files.
mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}

/// Setup failures. Program outcomes (failed, timed out) are values, not errors.
#[derive(Error, Debug)]
pub enum HarnessError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Workspace error: {0}")]
    Workspace(String),

    #[error("Failed to start interpreter {interpreter}: {source}")]
    Spawn {
        interpreter: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Process error: {0}")]
    Process(String),

    #[error("Protocol error: {0}")]
    Protocol(String),
}

pub type Result<T> = std::result::Result<T, HarnessError>;

impl From<nix::errno::Errno> for HarnessError {
    fn from(err: nix::errno::Errno) -> Self {
        HarnessError::Process(err.to_string())
    }
}

impl From<serde_json::Error> for HarnessError {
    fn from(err: serde_json::Error) -> Self {
        HarnessError::Protocol(err.to_string())
    }
}
