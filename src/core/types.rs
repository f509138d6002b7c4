use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Classified outcome of running one program.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ExecutionResult {
    /// Ran to completion without raising.
    Passed,
    /// Syntax error or raised exception.
    Failed {
        error_kind: String,
        /// 1-based line within the program text
        line_number: u32,
        detail: String,
        /// Source text of `line_number`, absent when it is out of range
        #[serde(default, skip_serializing_if = "Option::is_none")]
        offending_line: Option<String>,
    },
    /// No result before the deadline (or the worker died without reporting).
    TimedOut,
}

impl ExecutionResult {
    pub fn passed(&self) -> bool {
        matches!(self, ExecutionResult::Passed)
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, ExecutionResult::TimedOut)
    }

    /// First diagnostic line, e.g. `failed: ZeroDivisionError at line 1: division by zero`.
    pub fn first_diagnostic(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ExecutionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionResult::Passed => write!(f, "passed"),
            ExecutionResult::Failed {
                error_kind,
                line_number,
                detail,
                ..
            } => write!(f, "failed: {} at line {}: {}", error_kind, line_number, detail),
            ExecutionResult::TimedOut => write!(f, "timed out"),
        }
    }
}

/// Supervisor -> worker launch contract, written as JSON to the request pipe.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LaunchRequest {
    /// Per-run token; reports without it are ignored
    pub token: String,
    pub program: String,
    /// Directory the worker runs in; `.` keeps the inherited one
    pub workdir: PathBuf,
    pub disabled_operations: Vec<String>,
    pub blocked_modules: Vec<String>,
    /// Cap on the interpreter-side swallow buffer (bytes)
    pub output_limit: usize,
    /// Encoded report line, newline included, must fit in this many bytes
    pub result_limit: usize,
}

/// Raw outcome as reported by the worker bootstrap.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ReportedOutcome {
    Passed,
    Failed {
        error_kind: String,
        /// May be missing or non-positive for errors without position info
        #[serde(default)]
        line_number: Option<i64>,
        detail: String,
    },
}

/// Worker -> supervisor report: one JSON line on the result pipe.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerReport {
    pub token: String,
    #[serde(flatten)]
    pub outcome: ReportedOutcome,
}

/// Forced-termination record for a timed-out worker.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct KillReport {
    pub kill_sent: bool,
    pub group_kill: bool,
    pub notes: Vec<String>,
}

/// Everything a caller may log about one check. The program's own output is
/// never included.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CheckReport {
    pub result: ExecutionResult,
    pub wall_time: Duration,
    pub kill_report: Option<KillReport>,
    /// Bytes the program wrote to stdout/stderr
    pub output_bytes: usize,
    pub output_truncated: bool,
}

impl CheckReport {
    pub fn passed(&self) -> bool {
        self.result.passed()
    }
}
