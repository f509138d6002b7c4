/// Worker I/O suppression
///
/// The worker gets a stdin that cannot be read and a single stdout/stderr pipe
/// that the supervisor drains into a bounded buffer. Draining never stops
/// early, so a chatty program cannot block on a full pipe, and retained bytes
/// never exceed the configured limit.
use crossbeam_channel::Receiver;
use std::fs::{File, OpenOptions};
use std::io::{self, Read};
use std::thread;
use std::time::Duration;

/// Bytes drained from a worker stream
#[derive(Debug, Clone, Default)]
pub struct CapturedOutput {
    /// First `limit` bytes
    pub retained: Vec<u8>,
    /// Total bytes seen, retained or not
    pub total_bytes: usize,
    /// True when bytes past the limit were discarded
    pub truncated: bool,
    /// Set if the stream ended with a read error
    pub read_error: Option<String>,
}

/// `/dev/null` opened write-only: any read fails with `EBADF`, so the
/// program can never block on or observe real input.
pub fn unreadable_stdin() -> io::Result<File> {
    OpenOptions::new().write(true).open("/dev/null")
}

/// Read `reader` to EOF, keeping at most `limit` bytes.
pub fn drain_capped<R: Read>(mut reader: R, limit: usize) -> CapturedOutput {
    let mut captured = CapturedOutput::default();
    let mut buf = [0u8; 8192];

    loop {
        match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => {
                captured.total_bytes += n;
                let room = limit.saturating_sub(captured.retained.len());
                if room >= n {
                    captured.retained.extend_from_slice(&buf[..n]);
                } else {
                    captured.retained.extend_from_slice(&buf[..room]);
                    captured.truncated = true;
                }
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                captured.read_error = Some(e.to_string());
                break;
            }
        }
    }

    captured
}

/// Drain running on a helper thread
pub struct DrainHandle {
    rx: Receiver<CapturedOutput>,
}

impl DrainHandle {
    /// Start draining `reader` on a named thread.
    pub fn spawn(name: &str, reader: File, limit: usize) -> io::Result<Self> {
        let (tx, rx) = crossbeam_channel::bounded(1);
        thread::Builder::new()
            .name(format!("pycheck-{}", name))
            .spawn(move || {
                let _ = tx.send(drain_capped(reader, limit));
            })?;
        Ok(Self { rx })
    }

    /// Collect the drained bytes once every writer is gone. A process that
    /// escaped the worker's group can keep the pipe open; after `grace` the
    /// drain is abandoned and `None` returned.
    pub fn finish(self, grace: Duration) -> Option<CapturedOutput> {
        match self.rx.recv_timeout(grace) {
            Ok(captured) => Some(captured),
            Err(e) => {
                log::warn!("Abandoning output drain: {}", e);
                None
            }
        }
    }
}
