// Capability surface for untrusted program text
//
// Two layers: an interpreter-level table of disabled operations shipped to
// the worker bootstrap, and process-level hardening applied between fork and
// exec.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// State of one interpreter operation
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Capability {
    Enabled,
    Disabled,
}

/// Process and host control.
const PROCESS_CONTROL: &[&str] = &[
    "builtins.exit",
    "builtins.quit",
    "os._exit",
    "os.abort",
    "os.kill",
    "os.killpg",
    "os.fork",
    "os.forkpty",
    "os.system",
    "os.popen",
    "os.execl",
    "os.execle",
    "os.execlp",
    "os.execlpe",
    "os.execv",
    "os.execve",
    "os.execvp",
    "os.execvpe",
    "os.spawnl",
    "os.spawnle",
    "os.spawnlp",
    "os.spawnlpe",
    "os.spawnv",
    "os.spawnve",
    "os.spawnvp",
    "os.spawnvpe",
    "os.posix_spawn",
    "os.posix_spawnp",
    "subprocess.Popen",
    "subprocess.run",
    "subprocess.call",
    "subprocess.check_call",
    "subprocess.check_output",
];

/// Filesystem mutation.
const FILESYSTEM_MUTATION: &[&str] = &[
    "os.remove",
    "os.unlink",
    "os.removedirs",
    "os.rmdir",
    "os.rename",
    "os.renames",
    "os.replace",
    "os.truncate",
    "os.chmod",
    "os.fchmod",
    "os.lchmod",
    "os.chown",
    "os.fchown",
    "os.lchown",
    "os.lchflags",
    "os.chroot",
    "shutil.rmtree",
    "shutil.move",
    "shutil.chown",
];

/// Environment and identity. The working directory is locked after the
/// worker has entered its workspace.
const ENVIRONMENT_IDENTITY: &[&str] = &[
    "os.putenv",
    "os.unsetenv",
    "os.setuid",
    "os.getcwd",
    "os.chdir",
    "os.fchdir",
];

/// Crash reporting, debuggers and interactive help.
const DIAGNOSTICS: &[&str] = &["faulthandler.enable", "builtins.help"];

/// Modules that cannot be imported by the program.
const BLOCKED_MODULES: &[&str] = &["ipdb", "joblib", "resource", "psutil", "tkinter"];

/// Environment variables that pin numeric-library thread pools.
pub const NUMERIC_THREAD_VARS: &[&str] = &[
    "OMP_NUM_THREADS",
    "OPENBLAS_NUM_THREADS",
    "MKL_NUM_THREADS",
];

/// Table of interpreter operations consulted by the worker bootstrap.
///
/// Every `Disabled` entry is replaced, once and before any untrusted code
/// runs, with a stub raising `PermissionError`. Entries naming operations the
/// interpreter does not provide are skipped.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityTable {
    operations: BTreeMap<String, Capability>,
    blocked_modules: Vec<String>,
}

impl Default for CapabilityTable {
    fn default() -> Self {
        let operations = PROCESS_CONTROL
            .iter()
            .chain(FILESYSTEM_MUTATION)
            .chain(ENVIRONMENT_IDENTITY)
            .chain(DIAGNOSTICS)
            .map(|name| (name.to_string(), Capability::Disabled))
            .collect();

        Self {
            operations,
            blocked_modules: BLOCKED_MODULES.iter().map(|m| m.to_string()).collect(),
        }
    }
}

impl CapabilityTable {
    /// Table with nothing disabled and no blocked modules.
    pub fn permissive() -> Self {
        Self {
            operations: BTreeMap::new(),
            blocked_modules: Vec::new(),
        }
    }

    pub fn disable(&mut self, operation: impl Into<String>) -> &mut Self {
        self.operations.insert(operation.into(), Capability::Disabled);
        self
    }

    pub fn enable(&mut self, operation: impl Into<String>) -> &mut Self {
        self.operations.insert(operation.into(), Capability::Enabled);
        self
    }

    pub fn block_module(&mut self, module: impl Into<String>) -> &mut Self {
        let module = module.into();
        if !self.blocked_modules.contains(&module) {
            self.blocked_modules.push(module);
        }
        self
    }

    pub fn is_disabled(&self, operation: &str) -> bool {
        matches!(self.operations.get(operation), Some(Capability::Disabled))
    }

    /// Operations to stub out, in stable order.
    pub fn disabled_operations(&self) -> Vec<String> {
        self.operations
            .iter()
            .filter(|(_, state)| **state == Capability::Disabled)
            .map(|(name, _)| name.clone())
            .collect()
    }

    pub fn blocked_modules(&self) -> &[String] {
        &self.blocked_modules
    }
}

/// Set PR_SET_NO_NEW_PRIVS so exec cannot regain privileges (setuid binaries,
/// file capabilities). Runs between fork and exec: no allocation, no logging.
#[cfg(target_os = "linux")]
pub fn set_no_new_privs() -> std::io::Result<()> {
    let rc = unsafe { libc::prctl(libc::PR_SET_NO_NEW_PRIVS, 1, 0, 0, 0) };
    if rc != 0 {
        return Err(std::io::Error::last_os_error());
    }
    Ok(())
}

#[cfg(not(target_os = "linux"))]
pub fn set_no_new_privs() -> std::io::Result<()> {
    Ok(())
}

/// Kill the worker when its supervisor dies. Pre-exec safe.
#[cfg(target_os = "linux")]
pub fn set_parent_death_signal() -> std::io::Result<()> {
    let rc = unsafe { libc::prctl(libc::PR_SET_PDEATHSIG, libc::SIGKILL, 0, 0, 0) };
    if rc != 0 {
        return Err(std::io::Error::last_os_error());
    }
    Ok(())
}

#[cfg(not(target_os = "linux"))]
pub fn set_parent_death_signal() -> std::io::Result<()> {
    Ok(())
}
