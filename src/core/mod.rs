//! Execution core.
//!
//! Core owns the worker process model: spawning the restricted interpreter,
//! the deadline watchdog, and the single-slot result channel between them.

pub mod supervisor;
pub mod types;
pub mod worker;
