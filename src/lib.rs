//! pycheck: run untrusted Python programs and report whether they succeed
//!
//! Each check spawns a fresh interpreter process with OS-level restrictions,
//! gives it a private throwaway working directory, silences its I/O, and
//! waits for a single report under a wall-clock deadline.
//!
//! # Architecture
//!
//! ## Kernel Primitives ([`kernel`])
//! - [`kernel::capabilities`]: Interpreter capability table and `no_new_privs`
//! - [`kernel::rlimits`]: Memory caps and core-dump suppression
//! - [`kernel::signal`]: Sessions, group kills and non-reaping waits
//!
//! ## Execution Core ([`core`])
//! - [`core::worker`]: Interpreter worker with embedded bootstrap
//! - [`core::supervisor`]: Deadline watchdog and result collection
//! - [`core::types`]: Launch request, worker report and outcome types
//!
//! ## Execution Control ([`exec`])
//! - [`exec::executor`]: `Checker` and `check_correctness`
//!
//! ## Verdict ([`verdict`])
//! - [`verdict::verdict`]: Result channel classification
//!
//! ## Safety & Cleanup ([`safety`])
//! - [`safety::workspace`]: Run-scoped temporary working directory
//!
//! ## Configuration ([`config`])
//! - [`config::types`]: `CheckConfig`, resource limits and `HarnessError`
//!
//! ## Utilities ([`utils`])
//! - [`utils::output`]: Unreadable stdin and bounded output draining
//!
//! # Outcomes
//!
//! A check either passes, fails with an error kind, line number and detail,
//! or times out. Harness setup problems are returned as `Err` and are never
//! reported as a failing program.

// Kernel Primitives
pub mod kernel;

// Execution Core
pub mod core;

// Execution Control
pub mod exec;

// Verdict
pub mod verdict;

// Safety & Cleanup
pub mod safety;

// Configuration
pub mod config;

// Utilities
pub mod utils;

// CLI entrypoint wiring for the pycheck binary.
pub mod cli;

pub use crate::config::types::{CheckConfig, HarnessError, ResourceLimits, Result};
pub use crate::core::types::{CheckReport, ExecutionResult, KillReport};
pub use crate::exec::executor::{check_correctness, Checker};
pub use crate::kernel::capabilities::{Capability, CapabilityTable};
