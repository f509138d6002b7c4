use crate::config::types::{CheckConfig, Result};
use crate::core::supervisor::supervise;
use crate::core::types::CheckReport;
/// Correctness checks for untrusted programs
use std::time::Duration;

/// Runs programs against a fixed configuration. Each check gets a fresh
/// worker and workspace, so one checker can be reused and shared freely.
#[derive(Clone, Debug, Default)]
pub struct Checker {
    config: CheckConfig,
}

impl Checker {
    /// Create a checker, rejecting configurations that could never run.
    pub fn new(config: CheckConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &CheckConfig {
        &self.config
    }

    /// Execute `program` and report how it ended.
    pub fn check(&self, program: &str) -> Result<CheckReport> {
        let report = supervise(program, &self.config)?;
        log::info!(
            "Check finished in {:?}: {}",
            report.wall_time,
            report.result.first_diagnostic()
        );
        Ok(report)
    }

    /// True only when the program ran to completion without raising.
    pub fn is_correct(&self, program: &str) -> Result<bool> {
        Ok(self.check(program)?.passed())
    }
}

/// Run `program` once with default restrictions and the given deadline.
pub fn check_correctness(program: &str, timeout: Duration) -> Result<bool> {
    Checker::new(CheckConfig::default().with_timeout(timeout))?.is_correct(program)
}
