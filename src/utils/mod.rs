//! Utility modules
//!
//! Bounded output draining and the unreadable worker stdin.

pub mod output;
