// Resource limits for the worker process
//
// Applied between fork and exec, so these helpers only make raw syscalls:
// no allocation, no logging, no locks.

use crate::config::types::ResourceLimits;
use std::io;

#[cfg(all(target_os = "linux", target_env = "gnu"))]
type Resource = libc::__rlimit_resource_t;
#[cfg(not(all(target_os = "linux", target_env = "gnu")))]
type Resource = libc::c_int;

/// Lower both soft and hard limits to `value`, clamped to the current hard
/// limit so an unprivileged worker never asks to raise it.
fn lower_limit(resource: Resource, value: u64) -> io::Result<()> {
    let mut current = libc::rlimit {
        rlim_cur: 0,
        rlim_max: 0,
    };
    if unsafe { libc::getrlimit(resource, &mut current) } != 0 {
        return Err(io::Error::last_os_error());
    }

    let requested = value as libc::rlim_t;
    let capped = if current.rlim_max == libc::RLIM_INFINITY {
        requested
    } else {
        requested.min(current.rlim_max)
    };

    let limit = libc::rlimit {
        rlim_cur: capped,
        rlim_max: capped,
    };
    if unsafe { libc::setrlimit(resource, &limit) } != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

/// Apply the configured memory caps: address space, data segment and,
/// except on macOS where the stack cannot be lowered this way, the stack.
pub fn apply_resource_limits(limits: &ResourceLimits) -> io::Result<()> {
    let Some(max_bytes) = limits.max_address_space_bytes else {
        return Ok(());
    };

    lower_limit(libc::RLIMIT_AS as Resource, max_bytes)?;
    lower_limit(libc::RLIMIT_DATA as Resource, max_bytes)?;
    #[cfg(not(target_os = "macos"))]
    lower_limit(libc::RLIMIT_STACK as Resource, max_bytes)?;
    Ok(())
}

/// No core files: a crashing worker must not leave dumps behind.
pub fn disable_core_dumps() -> io::Result<()> {
    lower_limit(libc::RLIMIT_CORE as Resource, 0)
}

/// Read back a soft limit of the calling process.
#[cfg(test)]
fn current_soft_limit(resource: Resource) -> io::Result<Option<u64>> {
    let mut current = libc::rlimit {
        rlim_cur: 0,
        rlim_max: 0,
    };
    if unsafe { libc::getrlimit(resource, &mut current) } != 0 {
        return Err(io::Error::last_os_error());
    }
    if current.rlim_cur == libc::RLIM_INFINITY {
        Ok(None)
    } else {
        Ok(Some(current.rlim_cur as u64))
    }
}
