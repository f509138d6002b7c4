/// Verdict classification
///
/// Turns the raw bytes of the result channel into exactly one
/// `ExecutionResult`. Pure: same program and channel bytes, same verdict.
use crate::core::types::{ExecutionResult, ReportedOutcome, WorkerReport};

/// Verdict classifier - pure function over the result channel
pub struct VerdictClassifier;

impl VerdictClassifier {
    /// Classify the result channel contents for `program`.
    ///
    /// The first line that decodes as a report carrying `token` wins; later
    /// lines are ignored. No such line means the worker never reported, which
    /// is indistinguishable from (and reported as) a timeout.
    pub fn classify(program: &str, channel: &[u8], token: &str) -> ExecutionResult {
        match Self::first_report(channel, token) {
            Some(report) => Self::from_outcome(program, report.outcome),
            None => ExecutionResult::TimedOut,
        }
    }

    fn first_report(channel: &[u8], token: &str) -> Option<WorkerReport> {
        for raw in channel.split(|b| *b == b'\n') {
            if raw.iter().all(u8::is_ascii_whitespace) {
                continue;
            }
            match serde_json::from_slice::<WorkerReport>(raw) {
                Ok(report) if report.token == token => return Some(report),
                Ok(_) => log::warn!("Ignoring worker report with foreign token"),
                Err(e) => log::warn!("Ignoring undecodable worker report line: {}", e),
            }
        }
        None
    }

    /// Map a reported outcome onto the program text.
    pub fn from_outcome(program: &str, outcome: ReportedOutcome) -> ExecutionResult {
        match outcome {
            ReportedOutcome::Passed => ExecutionResult::Passed,
            ReportedOutcome::Failed {
                error_kind,
                line_number,
                detail,
            } => {
                // 0 marks an error without position information.
                let line_number = line_number
                    .filter(|n| *n > 0)
                    .and_then(|n| u32::try_from(n).ok())
                    .unwrap_or(0);
                ExecutionResult::Failed {
                    offending_line: Self::offending_line(program, line_number),
                    error_kind,
                    line_number,
                    detail,
                }
            }
        }
    }

    /// Source text of 1-based `line_number`, if the program has that line.
    pub fn offending_line(program: &str, line_number: u32) -> Option<String> {
        let index = (line_number as usize).checked_sub(1)?;
        program.split('\n').nth(index).map(str::to_string)
    }
}
