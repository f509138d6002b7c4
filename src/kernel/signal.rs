use nix::errno::Errno;
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
/// Process-group signalling for worker termination
///
/// The worker leads its own session, so a single group signal reaches the
/// interpreter and anything it managed to start.
use std::io;

/// Make the calling process a session and process-group leader.
/// Runs between fork and exec.
pub fn start_new_session() -> io::Result<()> {
    if unsafe { libc::setsid() } < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

/// How a group signal was delivered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Whole process group signalled
    Group,
    /// Group signal failed; only the leader was signalled
    LeaderOnly,
    /// Nothing left to signal
    Gone,
}

/// Send `sig` to the process group led by `leader`, falling back to the
/// leader alone when the group cannot be addressed.
pub fn signal_group(leader: Pid, sig: Signal) -> Result<Delivery, Errno> {
    match signal::killpg(leader, sig) {
        Ok(()) => Ok(Delivery::Group),
        Err(Errno::ESRCH) => match signal::kill(leader, sig) {
            Ok(()) => Ok(Delivery::LeaderOnly),
            Err(Errno::ESRCH) => Ok(Delivery::Gone),
            Err(e) => Err(e),
        },
        Err(_) => match signal::kill(leader, sig) {
            Ok(()) => Ok(Delivery::LeaderOnly),
            Err(Errno::ESRCH) => Ok(Delivery::Gone),
            Err(e) => Err(e),
        },
    }
}

/// Block until `pid` has exited without reaping it. The zombie keeps the pid
/// (and its process group id) reserved until the caller reaps.
pub fn wait_exited_no_reap(pid: Pid) -> Result<(), Errno> {
    loop {
        let mut info: libc::siginfo_t = unsafe { std::mem::zeroed() };
        let rc = unsafe {
            libc::waitid(
                libc::P_PID,
                pid.as_raw() as libc::id_t,
                &mut info,
                libc::WEXITED | libc::WNOWAIT,
            )
        };
        if rc == 0 {
            return Ok(());
        }
        match Errno::last() {
            Errno::EINTR => continue,
            e => return Err(e),
        }
    }
}
