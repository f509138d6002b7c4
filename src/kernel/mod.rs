//! Thin wrappers around kernel primitives used to confine the worker.
//!
//! Syscall wrappers live here; `core::worker` adds the fd plumbing and the
//! `pre_exec` hook that calls them. Helpers called between fork and exec
//! return `std::io::Result` and never allocate or log.
//! Dependency direction: signal -> rlimits -> capabilities

pub mod capabilities;
pub mod rlimits;
pub mod signal;
