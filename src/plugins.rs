//! Post-provisioning plugins
//!
//! Plugins run after a successful `up`, in the order they were requested. The
//! first failure stops the rest; the machine itself is left running.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::info;

use crate::machine::error::{MachineError, MachineResult};
use crate::machine::MachineCurd;

/// Something installed onto a running machine
#[async_trait]
pub trait Plugin: Send + Sync {
    fn name(&self) -> String;

    async fn apply(&self, machine: &dyn MachineCurd) -> MachineResult<()>;
}

/// Apply plugins in order, stopping at the first failure
pub async fn apply_plugins(
    machine: &dyn MachineCurd,
    plugins: &[Box<dyn Plugin>],
) -> MachineResult<()> {
    for plugin in plugins {
        info!("Applying plugin {} to {}", plugin.name(), machine.name());
        plugin
            .apply(machine)
            .await
            .map_err(|e| MachineError::Plugin {
                plugin: plugin.name(),
                source: Box::new(e),
            })
            .map_err(|e| e.context("install", machine.name()))?;
    }
    Ok(())
}

/// Applies a manifest file (`kubectl apply -f`) or a kustomization
/// directory (`kubectl apply -k`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestPlugin {
    path: PathBuf,
    stream: bool,
}

impl ManifestPlugin {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            stream: false,
        }
    }

    /// Show kubectl's output as it applies
    pub fn streaming(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn kubectl_args(&self) -> Vec<String> {
        let flag = if self.path.is_dir() { "-k" } else { "-f" };
        vec![
            "apply".to_string(),
            flag.to_string(),
            self.path.to_string_lossy().to_string(),
        ]
    }
}

#[async_trait]
impl Plugin for ManifestPlugin {
    fn name(&self) -> String {
        format!("manifest({})", self.path.display())
    }

    async fn apply(&self, machine: &dyn MachineCurd) -> MachineResult<()> {
        if !self.path.exists() {
            return Err(MachineError::Config(format!(
                "manifest {} does not exist",
                self.path.display()
            )));
        }
        machine.kubectl(self.kubectl_args(), self.stream).await?;
        Ok(())
    }
}
