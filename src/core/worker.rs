//! Execution worker: the interpreter process that runs one program.
//!
//! Between fork and exec the child becomes a session leader, gets
//! `no_new_privs`, a parent-death signal, no core dumps and the configured
//! memory caps. After exec the embedded bootstrap reads the launch request,
//! applies the capability table, enters the workspace, silences I/O, runs the
//! program and writes one report line.

use crate::config::types::{CheckConfig, HarnessError, Result};
use crate::core::types::LaunchRequest;
use crate::kernel::capabilities::{set_no_new_privs, set_parent_death_signal, NUMERIC_THREAD_VARS};
use crate::kernel::rlimits::{apply_resource_limits, disable_core_dumps};
use crate::kernel::signal::start_new_session;
use crate::safety::workspace::Workspace;
use crate::utils::output::unreadable_stdin;
use nix::fcntl::OFlag;
use nix::unistd::{pipe2, Pid};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::io::{self, Write};
use std::os::fd::{AsRawFd, FromRawFd};
use std::os::unix::fs::PermissionsExt;
use std::os::unix::io::RawFd;
use std::os::unix::process::CommandExt;
use std::process::{Child, Command, ExitStatus, Stdio};

/// Interpreter-side half of the worker.
pub const BOOTSTRAP: &str = include_str!("bootstrap.py");

const WORKER_PATH: &str = "/usr/local/bin:/usr/bin:/bin";

fn to_process_error(prefix: &str, err: impl std::fmt::Display) -> HarnessError {
    HarnessError::Process(format!("{prefix}: {err}"))
}

/// Close-on-exec pipe as (read, write) files.
fn cloexec_pipe(name: &str) -> Result<(File, File)> {
    let (read_fd, write_fd) =
        pipe2(OFlag::O_CLOEXEC).map_err(|e| to_process_error(&format!("pipe({name})"), e))?;
    // SAFETY: both fds were just created and are owned by nothing else.
    Ok(unsafe { (File::from_raw_fd(read_fd), File::from_raw_fd(write_fd)) })
}

/// Let `fd` survive exec. Pre-exec safe.
fn clear_cloexec(fd: RawFd) -> io::Result<()> {
    if unsafe { libc::fcntl(fd, libc::F_SETFD, 0) } < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

/// Resolve a bare interpreter name against the supervisor's PATH; the worker
/// itself only sees a minimal PATH.
pub fn resolve_interpreter(interpreter: &Path) -> Result<PathBuf> {
    if interpreter.components().count() > 1 || interpreter.is_absolute() {
        return Ok(interpreter.to_path_buf());
    }

    let search = std::env::var_os("PATH").unwrap_or_default();
    std::env::split_paths(&search)
        .map(|dir| dir.join(interpreter))
        .find(|candidate| {
            candidate
                .metadata()
                .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
                .unwrap_or(false)
        })
        .ok_or_else(|| HarnessError::Spawn {
            interpreter: interpreter.display().to_string(),
            source: io::Error::new(io::ErrorKind::NotFound, "not found on PATH"),
        })
}

/// A spawned, not yet reaped worker process
pub struct Worker {
    child: Child,
    request: Option<File>,
    result: Option<File>,
    output: Option<File>,
}

impl Worker {
    /// Spawn the interpreter with the OS-level restrictions in place.
    pub fn spawn(config: &CheckConfig, workspace: &Workspace) -> Result<Self> {
        let (request_read, request_write) = cloexec_pipe("request")?;
        let (result_read, result_write) = cloexec_pipe("result")?;
        let (output_read, output_write) = cloexec_pipe("output")?;

        let request_fd = request_read.as_raw_fd();
        let result_fd = result_write.as_raw_fd();
        let limits = config.resource_limits.clone();

        let interpreter = resolve_interpreter(&config.interpreter)?;
        let mut cmd = Command::new(&interpreter);
        cmd.args(&config.interpreter_args)
            .arg("-c")
            .arg(BOOTSTRAP)
            .arg(request_fd.to_string())
            .arg(result_fd.to_string())
            .current_dir(workspace.path())
            .env_clear()
            .env("PATH", WORKER_PATH)
            .env("HOME", workspace.path())
            .env("TMPDIR", workspace.path())
            .env("LANG", "C.UTF-8")
            .env("PYTHONIOENCODING", "utf-8")
            .stdin(Stdio::from(unreadable_stdin()?))
            .stdout(Stdio::from(output_write.try_clone()?))
            .stderr(Stdio::from(output_write));
        for var in NUMERIC_THREAD_VARS {
            cmd.env(var, "1");
        }

        // SAFETY: the hook only issues raw syscalls (setsid, prctl,
        // setrlimit, fcntl) and does not allocate.
        unsafe {
            cmd.pre_exec(move || {
                start_new_session()?;
                set_parent_death_signal()?;
                set_no_new_privs()?;
                disable_core_dumps()?;
                apply_resource_limits(&limits)?;
                clear_cloexec(request_fd)?;
                clear_cloexec(result_fd)?;
                Ok(())
            });
        }

        let child = cmd.spawn().map_err(|source| HarnessError::Spawn {
            interpreter: interpreter.display().to_string(),
            source,
        })?;
        // The child's ends (and the Stdio copies held by `cmd`) close here.
        drop(cmd);
        drop(request_read);
        drop(result_write);

        log::debug!("Spawned worker pid {}", child.id());
        Ok(Self {
            child,
            request: Some(request_write),
            result: Some(result_read),
            output: Some(output_read),
        })
    }

    pub fn pid(&self) -> Pid {
        Pid::from_raw(self.child.id() as i32)
    }

    /// Write the launch request and close the request pipe.
    ///
    /// A worker that dies before reading surfaces as a broken pipe; the
    /// caller decides whether that matters (it normally does not: the empty
    /// result channel already says everything).
    pub fn send_request(&mut self, request: &LaunchRequest) -> Result<()> {
        let mut pipe = self
            .request
            .take()
            .ok_or_else(|| HarnessError::Protocol("launch request already sent".to_string()))?;
        let payload = serde_json::to_vec(request)?;
        pipe.write_all(&payload)?;
        pipe.flush()?;
        Ok(())
    }

    /// Supervisor ends of the result and output pipes.
    pub fn take_channels(&mut self) -> Result<(File, File)> {
        match (self.result.take(), self.output.take()) {
            (Some(result), Some(output)) => Ok((result, output)),
            _ => Err(HarnessError::Protocol(
                "worker channels already taken".to_string(),
            )),
        }
    }

    /// Reap the worker. Call only after it has exited or been killed.
    pub fn reap(&mut self) -> Result<ExitStatus> {
        self.child
            .wait()
            .map_err(|e| to_process_error("wait(worker)", e))
    }
}
