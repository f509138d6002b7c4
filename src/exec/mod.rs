//! Execution control
//!
//! Public entry points for checking a program.

pub mod executor;
