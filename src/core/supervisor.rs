use crate::config::types::{CheckConfig, Result};
use crate::core::types::{CheckReport, KillReport, LaunchRequest};
use crate::core::worker::Worker;
use crate::kernel::signal::{signal_group, wait_exited_no_reap, Delivery};
use crate::safety::workspace::Workspace;
use crate::utils::output::DrainHandle;
use crate::verdict::VerdictClassifier;
use crossbeam_channel::{RecvTimeoutError, Sender};
use nix::sys::signal::Signal;
use nix::unistd::Pid;
use std::thread;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// How long to wait for pipe drains once the worker's group is gone.
const DRAIN_GRACE: Duration = Duration::from_secs(1);

fn terminate_worker_group(pid: Pid) -> KillReport {
    let mut report = KillReport::default();

    match signal_group(pid, Signal::SIGKILL) {
        Ok(Delivery::Group) => {
            report.kill_sent = true;
            report.group_kill = true;
        }
        Ok(Delivery::LeaderOnly) => {
            report.kill_sent = true;
            report
                .notes
                .push("group SIGKILL failed; leader-only fallback used".to_string());
        }
        Ok(Delivery::Gone) => report.notes.push("worker already gone".to_string()),
        Err(e) => report.notes.push(format!("SIGKILL failed: {}", e)),
    }

    report
}

/// Deadline timer for one worker. Fires at most once; cancelled after the
/// worker has stopped.
struct Watchdog {
    cancel: Sender<()>,
    handle: thread::JoinHandle<Option<KillReport>>,
}

impl Watchdog {
    fn arm(pid: Pid, timeout: Duration) -> std::io::Result<Self> {
        let (cancel, cancelled) = crossbeam_channel::bounded::<()>(1);
        let handle = thread::Builder::new()
            .name("pycheck-watchdog".to_string())
            .spawn(move || match cancelled.recv_timeout(timeout) {
                Err(RecvTimeoutError::Timeout) => {
                    log::debug!("Deadline of {:?} reached; killing worker {}", timeout, pid);
                    Some(terminate_worker_group(pid))
                }
                Ok(()) | Err(RecvTimeoutError::Disconnected) => None,
            })?;
        Ok(Self { cancel, handle })
    }

    /// Cancel the timer and report whether it fired.
    fn cancel(self) -> Option<KillReport> {
        let _ = self.cancel.send(());
        self.handle.join().unwrap_or_else(|_| {
            log::warn!("Watchdog thread panicked");
            None
        })
    }
}

/// Run `program` in a fresh worker under a wall-clock deadline.
///
/// Ordering: spawn worker -> arm timer -> send request -> wait for exit
/// (without reaping, so the pid stays reserved) -> cancel timer -> sweep the
/// process group -> reap -> read the result channel. The workspace outlives
/// the worker and is removed before returning.
pub fn supervise(program: &str, config: &CheckConfig) -> Result<CheckReport> {
    config.validate()?;

    let workspace = Workspace::create(&config.workspace_root)?;
    let token = Uuid::new_v4().to_string();
    let request = LaunchRequest {
        token: token.clone(),
        program: program.to_string(),
        workdir: workspace.path().to_path_buf(),
        disabled_operations: config.capabilities.disabled_operations(),
        blocked_modules: config.capabilities.blocked_modules().to_vec(),
        output_limit: config.output_limit,
        result_limit: config.result_limit,
    };

    let started = Instant::now();
    let mut worker = Worker::spawn(config, &workspace)?;
    let pid = worker.pid();

    let helpers = worker.take_channels().and_then(|(result, output)| {
        let result = DrainHandle::spawn("result", result, config.result_limit)?;
        let output = DrainHandle::spawn("output", output, config.output_limit)?;
        let watchdog = Watchdog::arm(pid, config.timeout)?;
        Ok((result, output, watchdog))
    });
    let (result_drain, output_drain, watchdog) = match helpers {
        Ok(helpers) => helpers,
        Err(e) => {
            let _ = signal_group(pid, Signal::SIGKILL);
            let _ = worker.reap();
            return Err(e);
        }
    };

    if let Err(e) = worker.send_request(&request) {
        log::debug!("Worker {} did not take the launch request: {}", pid, e);
    }

    let waited = wait_exited_no_reap(pid);
    let kill_report = watchdog.cancel();

    // Anything the program left behind in its group goes with it.
    let _ = signal_group(pid, Signal::SIGKILL);
    let status = worker.reap()?;
    if let Err(e) = waited {
        log::warn!("waitid on worker {} failed: {}", pid, e);
    }
    let wall_time = started.elapsed();
    log::debug!("Worker {} finished with {} after {:?}", pid, status, wall_time);

    let channel = result_drain.finish(DRAIN_GRACE).unwrap_or_default();
    let output = output_drain.finish(DRAIN_GRACE).unwrap_or_default();
    if output.total_bytes > 0 {
        log::trace!(
            "Discarded {} bytes of program output: {}",
            output.total_bytes,
            String::from_utf8_lossy(&output.retained)
        );
    }
    for (name, captured) in [("result", &channel), ("output", &output)] {
        if let Some(e) = &captured.read_error {
            log::warn!("Reading worker {} pipe failed: {}", name, e);
        }
    }
    if channel.truncated {
        log::warn!(
            "Result channel exceeded {} bytes; excess ignored",
            config.result_limit
        );
    }

    let result = VerdictClassifier::classify(program, &channel.retained, &token);
    drop(workspace);

    Ok(CheckReport {
        result,
        wall_time,
        kill_report,
        output_bytes: output.total_bytes,
        output_truncated: output.truncated,
    })
}
