//! Guest machines: disposable Kubernetes clusters behind one lifecycle contract
//!
//! Two backends implement [`MachineCurd`]:
//! - [`docker`]: kind clusters running as docker containers
//! - [`vagrant`]: a VirtualBox VM running kind inside it
//!
//! A handle is always re-derived from a name and the state directory; nothing
//! about a machine is remembered between invocations except what is on disk.

pub mod docker;
pub mod error;
pub mod kubectl;
pub mod resources;
pub mod spec;
pub mod state;
pub mod vagrant;

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize, Serializer};

use crate::process::ProcessRunner;
use error::{MachineError, MachineResult};
use resources::{GpuInfo, ResourceSnapshot};
use spec::{validate_name, MachineSpec};
use state::{StateDir, KUBECONFIG_FILE};

pub use docker::KindMachines;
pub use vagrant::VagrantMachines;

/// Which backend realises a machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provisioner {
    /// kind clusters in docker containers
    #[default]
    Docker,
    /// kind inside a Vagrant-managed VM
    Vagrant,
}

impl Provisioner {
    pub const ALL: [Provisioner; 2] = [Provisioner::Docker, Provisioner::Vagrant];

    pub fn as_str(&self) -> &'static str {
        match self {
            Provisioner::Docker => "docker",
            Provisioner::Vagrant => "vagrant",
        }
    }
}

impl fmt::Display for Provisioner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provisioner {
    type Err = MachineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "docker" => Ok(Provisioner::Docker),
            "vagrant" => Ok(Provisioner::Vagrant),
            other => Err(MachineError::UnknownProvisioner(other.to_string())),
        }
    }
}

/// Live state of a machine, as reported by its backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MachineStatus {
    /// No state directory, or the backend does not know the instance
    Absent,
    Running,
    /// Known to the backend but not running; carries the backend's own word
    Stopped(String),
}

impl MachineStatus {
    pub fn is_running(&self) -> bool {
        matches!(self, MachineStatus::Running)
    }
}

impl fmt::Display for MachineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MachineStatus::Absent => f.write_str("not found"),
            MachineStatus::Running => f.write_str("running"),
            MachineStatus::Stopped(state) => f.write_str(state),
        }
    }
}

impl Serialize for MachineStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

/// Result of [`MachineCurd::up`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpOutcome {
    /// The backend was asked to create (or recreate) the cluster
    Created,
    /// The machine was already running and nothing was touched
    AlreadyRunning,
}

/// Everything `Info` reports about a machine
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MachineInfo {
    pub name: String,
    pub provisioner: Provisioner,
    pub host_dir: PathBuf,
    pub status: MachineStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resources: Option<ResourceSnapshot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gpu: Option<GpuInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kube_api: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kubeconfig: Option<PathBuf>,
}

impl MachineInfo {
    /// Info carrying only identity and status
    pub fn new<M: MachineCurd + ?Sized>(machine: &M, status: MachineStatus) -> Self {
        let kubeconfig = machine.kubeconfig_path();
        Self {
            name: machine.name().to_string(),
            provisioner: machine.provisioner(),
            host_dir: machine.host_dir(),
            status,
            resources: None,
            gpu: None,
            kube_api: None,
            kubeconfig: kubeconfig.is_file().then_some(kubeconfig),
        }
    }
}

/// Lifecycle of one guest machine
#[async_trait]
pub trait MachineCurd: Send + Sync {
    fn name(&self) -> &str;

    fn provisioner(&self) -> Provisioner;

    /// The machine's state directory
    fn host_dir(&self) -> PathBuf;

    /// Default location of exported credentials
    fn kubeconfig_path(&self) -> PathBuf {
        self.host_dir().join(KUBECONFIG_FILE)
    }

    async fn status(&self) -> MachineResult<MachineStatus>;

    /// Create and start the machine.
    ///
    /// A running machine is left alone unless `force` is set, in which case it
    /// is re-rendered and recreated.
    async fn up(&self, force: bool) -> MachineResult<UpOutcome>;

    /// Tear the machine down and remove its state directory
    async fn destroy(&self, force: bool) -> MachineResult<()>;

    async fn export_kubeconfig(&self, path: &Path, overwrite: bool) -> MachineResult<()>;

    async fn info(&self) -> MachineResult<MachineInfo>;

    /// Run kubectl against the machine's cluster, returning its stdout
    async fn kubectl(&self, args: Vec<String>, stream: bool) -> MachineResult<String>;

    /// List pods; an empty namespace means all namespaces
    async fn get_pods(&self, namespace: &str) -> MachineResult<String> {
        self.kubectl(kubectl::get_pods_args(namespace), false)
            .await
            .map_err(|e| e.context("get pods", self.name()))
    }

    /// Forward `local_port` on this host to `port` of a service until kubectl exits
    async fn portforward(
        &self,
        service: &str,
        namespace: &str,
        port: u16,
        local_port: u16,
    ) -> MachineResult<()> {
        self.kubectl(
            kubectl::port_forward_args(service, namespace, local_port, port),
            true,
        )
        .await
        .map(|_| ())
        .map_err(|e| e.context("portforward", self.name()))
    }
}

/// Creates handles for one backend
pub trait MachineCurdFactory: Send + Sync {
    fn provisioner(&self) -> Provisioner;

    /// Open a handle. Without a spec the handle is read-only: it can be
    /// inspected, exported and destroyed but not brought up.
    fn new_machine(
        &self,
        name: &str,
        spec: Option<MachineSpec>,
    ) -> MachineResult<Box<dyn MachineCurd>>;

    /// Read-only handles for every machine in the root directory, sorted by name
    fn list_machines(&self) -> MachineResult<Vec<Box<dyn MachineCurd>>>;
}

/// Build the factory for a provisioner token such as `docker` or `vagrant`
pub fn new_machine_factory(
    kind: &str,
    root_dir: impl Into<PathBuf>,
    verbose: bool,
    runner: Arc<dyn ProcessRunner>,
) -> MachineResult<Box<dyn MachineCurdFactory>> {
    let provisioner = kind.parse::<Provisioner>()?;
    Ok(factory_for(provisioner, root_dir, verbose, runner))
}

/// Build the factory for an already parsed provisioner
pub fn factory_for(
    provisioner: Provisioner,
    root_dir: impl Into<PathBuf>,
    verbose: bool,
    runner: Arc<dyn ProcessRunner>,
) -> Box<dyn MachineCurdFactory> {
    let state = StateDir::new(root_dir);
    match provisioner {
        Provisioner::Docker => Box::new(KindMachines::new(state, verbose, runner)),
        Provisioner::Vagrant => Box::new(VagrantMachines::new(state, verbose, runner)),
    }
}

// ============================================================================
// Shared by both backends
// ============================================================================

/// Validate a handle's name and, if given, that the spec describes the same machine
pub(crate) fn check_handle(name: &str, spec: Option<&MachineSpec>) -> MachineResult<()> {
    validate_name(name)?;
    if let Some(spec) = spec {
        if spec.name() != name {
            return Err(MachineError::Config(format!(
                "specification is for '{}' but the machine is '{}'",
                spec.name(),
                name
            )));
        }
    }
    Ok(())
}

pub(crate) fn require_spec<'a>(
    name: &str,
    spec: Option<&'a MachineSpec>,
) -> MachineResult<&'a MachineSpec> {
    spec.ok_or_else(|| {
        MachineError::Config(format!(
            "machine '{}' was opened without a specification and cannot be brought up",
            name
        ))
    })
}

pub(crate) async fn require_running<M: MachineCurd + ?Sized>(machine: &M) -> MachineResult<()> {
    if machine.status().await?.is_running() {
        Ok(())
    } else {
        Err(MachineError::NotFound(machine.name().to_string()))
    }
}

/// Refuse to clobber an export target before asking the backend for anything
pub(crate) fn check_export_target(path: &Path, overwrite: bool) -> MachineResult<()> {
    if path.exists() && !overwrite {
        return Err(MachineError::StateConflict(format!(
            "{} already exists (use force to overwrite)",
            path.display()
        )));
    }
    Ok(())
}
