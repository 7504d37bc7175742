//! On-disk machine state
//!
//! Layout under the root directory:
//!
//! ```text
//! <root>/
//!   <name>/
//!     kind-config.yaml   rendered cluster configuration
//!     Vagrantfile        (vagrant machines only)
//!     kubeconfig         exported credentials
//! ```
//!
//! A machine exists exactly when its directory exists.

use std::io::ErrorKind as IoErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::error::{MachineError, MachineResult};
use super::spec::validate_name;

/// Rendered cluster configuration consumed by `kind`
pub const KIND_CONFIG_FILE: &str = "kind-config.yaml";

/// Machine definition consumed by `vagrant`
pub const VAGRANT_FILE: &str = "Vagrantfile";

/// Default location of exported credentials
pub const KUBECONFIG_FILE: &str = "kubeconfig";

/// The root directory holding one sub-directory per machine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateDir {
    root: PathBuf,
}

impl StateDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn machine_dir(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    pub fn kind_config_path(&self, name: &str) -> PathBuf {
        self.machine_dir(name).join(KIND_CONFIG_FILE)
    }

    pub fn vagrantfile_path(&self, name: &str) -> PathBuf {
        self.machine_dir(name).join(VAGRANT_FILE)
    }

    pub fn exists(&self, name: &str) -> bool {
        self.machine_dir(name).is_dir()
    }

    /// Create the machine directory (and the root) if needed
    pub fn ensure(&self, name: &str) -> MachineResult<PathBuf> {
        let dir = self.machine_dir(name);
        std::fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    /// Remove the machine directory; an already missing directory is fine
    pub fn remove(&self, name: &str) -> MachineResult<()> {
        match std::fs::remove_dir_all(self.machine_dir(name)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == IoErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Names of all machines, sorted.
    ///
    /// Only immediate sub-directories count. Entries whose names are not valid
    /// machine names are skipped. A missing root means no machines.
    pub fn list(&self) -> MachineResult<Vec<String>> {
        let entries = match std::fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == IoErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().to_string();
            if validate_name(&name).is_err() {
                warn!("Skipping {}: not a machine directory", entry.path().display());
                continue;
            }
            names.push(name);
        }
        names.sort();
        Ok(names)
    }
}

// ============================================================================
// I/O boundary functions
// ============================================================================

/// Write `contents` to `path`, refusing to replace an existing file unless
/// `overwrite` is set. Parent directories are created.
pub fn write_guarded(path: &Path, contents: &str, overwrite: bool) -> MachineResult<()> {
    if path.exists() && !overwrite {
        return Err(MachineError::StateConflict(format!(
            "{} already exists (use force to overwrite)",
            path.display()
        )));
    }
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    debug!("Writing {}", path.display());
    std::fs::write(path, contents)?;
    Ok(())
}

/// Delete a file that no longer describes the machine; a missing file is fine
pub fn remove_stale(path: &Path) -> MachineResult<()> {
    match std::fs::remove_file(path) {
        Ok(()) => {
            debug!("Removed stale {}", path.display());
            Ok(())
        }
        Err(e) if e.kind() == IoErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}
