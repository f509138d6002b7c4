//! Safety and cleanup
//!
//! Run-scoped workspaces that never outlive their check.

pub mod workspace;
