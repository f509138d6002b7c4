/// Run-scoped working directories
///
/// Each check gets a fresh directory that becomes the worker's current
/// directory. The supervisor owns it, so it is removed recursively when the
/// check ends even if the worker was killed.
use crate::config::types::{HarnessError, Result};
use std::fs;
use std::os::unix::fs::DirBuilderExt;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Temporary directory owned by the supervisor for one worker run
#[derive(Debug)]
pub struct Workspace {
    /// Unique run ID
    run_id: String,
    /// Run-specific directory
    run_dir: PathBuf,
}

impl Workspace {
    /// Create `<root>/pycheck-<uuid>` with owner-only permissions.
    pub fn create(root: &Path) -> Result<Self> {
        let run_id = Uuid::new_v4().to_string();
        let run_dir = root.join(format!("pycheck-{}", run_id));

        fs::DirBuilder::new()
            .mode(0o700)
            .create(&run_dir)
            .map_err(|e| {
                HarnessError::Workspace(format!(
                    "Failed to create workspace directory {}: {}",
                    run_dir.display(),
                    e
                ))
            })?;

        log::debug!("Created workspace {}", run_dir.display());
        Ok(Self { run_id, run_dir })
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn path(&self) -> &Path {
        &self.run_dir
    }

    /// Remove the directory tree (idempotent)
    pub fn cleanup(&self) {
        if !self.run_dir.exists() {
            return;
        }
        if let Err(e) = fs::remove_dir_all(&self.run_dir) {
            log::warn!(
                "Failed to remove workspace {}: {}",
                self.run_dir.display(),
                e
            );
        }
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        self.cleanup();
    }
}
