//! Container-backed machines, driven by `kind` and `docker`
//!
//! Each machine is one kind cluster named after the machine. The control-plane
//! container is `<name>-control-plane`; guest resources are read by exec'ing
//! into it.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use super::error::{MachineError, MachineResult};
use super::resources::{host_gpus, CpuInfo, MemInfo, ResourceSnapshot};
use super::spec::{MachineSpec, DEFAULT_API_SERVER_PORT};
use super::state::{remove_stale, write_guarded, StateDir};
use super::{
    check_export_target, check_handle, kubectl, require_running, require_spec, MachineCurd,
    MachineCurdFactory, MachineInfo, MachineStatus, Provisioner, UpOutcome,
};
use crate::process::{Invocation, ProcessRunner};
use crate::template;

/// Factory for kind machines under one root directory
pub struct KindMachines {
    state: StateDir,
    verbose: bool,
    runner: Arc<dyn ProcessRunner>,
}

impl KindMachines {
    pub fn new(state: StateDir, verbose: bool, runner: Arc<dyn ProcessRunner>) -> Self {
        Self {
            state,
            verbose,
            runner,
        }
    }

    fn open(&self, name: &str, spec: Option<MachineSpec>) -> KindMachine {
        KindMachine {
            name: name.to_string(),
            spec,
            state: self.state.clone(),
            verbose: self.verbose,
            runner: self.runner.clone(),
        }
    }
}

impl MachineCurdFactory for KindMachines {
    fn provisioner(&self) -> Provisioner {
        Provisioner::Docker
    }

    fn new_machine(
        &self,
        name: &str,
        spec: Option<MachineSpec>,
    ) -> MachineResult<Box<dyn MachineCurd>> {
        check_handle(name, spec.as_ref())?;
        Ok(Box::new(self.open(name, spec)))
    }

    fn list_machines(&self) -> MachineResult<Vec<Box<dyn MachineCurd>>> {
        Ok(self
            .state
            .list()?
            .into_iter()
            .map(|name| Box::new(self.open(&name, None)) as Box<dyn MachineCurd>)
            .collect())
    }
}

/// One kind cluster
pub struct KindMachine {
    name: String,
    spec: Option<MachineSpec>,
    state: StateDir,
    verbose: bool,
    runner: Arc<dyn ProcessRunner>,
}

impl KindMachine {
    fn control_plane(&self) -> String {
        format!("{}-control-plane", self.name)
    }

    fn kind(&self) -> Invocation {
        Invocation::new("kind")
    }

    async fn cluster_exists(&self) -> MachineResult<bool> {
        let output = self
            .runner
            .run_checked(&self.kind().args(["get", "clusters"]))
            .await?;
        Ok(output.stdout.lines().any(|line| line.trim() == self.name))
    }

    async fn container_state(&self) -> MachineResult<String> {
        let invocation = Invocation::new("docker")
            .args(["inspect", "--format", "{{.State.Status}}"])
            .arg(self.control_plane());
        let output = self.runner.run_checked(&invocation).await?;
        Ok(output.stdout.trim().to_string())
    }

    async fn exec(&self, command: &[&str]) -> MachineResult<String> {
        let invocation = Invocation::new("docker")
            .arg("exec")
            .arg(self.control_plane())
            .args(command.iter().copied());
        Ok(self.runner.run_checked(&invocation).await?.stdout)
    }

    async fn resources(&self) -> MachineResult<ResourceSnapshot> {
        let cpu = CpuInfo::parse_nproc(&self.exec(&["nproc"]).await?)?;
        let mem = MemInfo::parse(&self.exec(&["cat", "/proc/meminfo"]).await?)?;
        Ok(ResourceSnapshot { cpu, mem })
    }

    /// `https://<host>:<port>` the API server is published on
    async fn kube_api(&self) -> MachineResult<Option<String>> {
        let invocation = Invocation::new("docker")
            .arg("port")
            .arg(self.control_plane())
            .arg(format!("{}/tcp", DEFAULT_API_SERVER_PORT));
        let output = self.runner.run_checked(&invocation).await?;
        Ok(output
            .stdout
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .map(|addr| format!("https://{}", addr)))
    }

    async fn delete_cluster(&self) -> MachineResult<()> {
        let invocation = self
            .kind()
            .args(["delete", "cluster", "--name"])
            .arg(&self.name)
            .streaming(self.verbose);
        self.runner.run_checked(&invocation).await?;
        Ok(())
    }

    async fn try_up(&self, force: bool) -> MachineResult<UpOutcome> {
        let spec = require_spec(&self.name, self.spec.as_ref())?;
        let status = self.status().await?;
        if status.is_running() && !force {
            info!("Machine {} is already running", self.name);
            return Ok(UpOutcome::AlreadyRunning);
        }

        self.state.ensure(&self.name)?;
        let config_path = self.state.kind_config_path(&self.name);
        write_guarded(
            &config_path,
            &template::render(spec)?,
            spec.force_overwrite() || force,
        )?;

        if force && status != MachineStatus::Absent {
            info!("Recreating cluster {}", self.name);
            self.delete_cluster().await?;
        }
        // credentials of any earlier cluster do not match the new one
        remove_stale(&self.kubeconfig_path())?;

        let create = self
            .kind()
            .args(["create", "cluster", "--name"])
            .arg(&self.name)
            .arg("--config")
            .arg(config_path.to_string_lossy())
            .streaming(self.verbose);
        self.runner.run_checked(&create).await?;

        info!("Machine {} is up", self.name);
        Ok(UpOutcome::Created)
    }

    async fn try_destroy(&self) -> MachineResult<()> {
        if !self.state.exists(&self.name) {
            debug!("Machine {} has no state directory, nothing to destroy", self.name);
            return Ok(());
        }
        self.delete_cluster().await?;
        self.state.remove(&self.name)?;
        info!("Machine {} destroyed", self.name);
        Ok(())
    }

    async fn try_export(&self, path: &Path, overwrite: bool) -> MachineResult<()> {
        require_running(self).await?;
        check_export_target(path, overwrite)?;

        let invocation = self
            .kind()
            .args(["get", "kubeconfig", "--name"])
            .arg(&self.name);
        let output = self.runner.run_checked(&invocation).await?;
        write_guarded(path, &output.stdout, overwrite)?;
        info!("Kubeconfig for {} written to {}", self.name, path.display());
        Ok(())
    }

    async fn try_info(&self) -> MachineResult<MachineInfo> {
        let status = self.status().await?;
        let mut info = MachineInfo::new(self, status);
        if info.status.is_running() {
            info.resources = Some(self.resources().await?);
            info.gpu = Some(host_gpus());
            info.kube_api = self.kube_api().await?;
        }
        Ok(info)
    }
}

#[async_trait]
impl MachineCurd for KindMachine {
    fn name(&self) -> &str {
        &self.name
    }

    fn provisioner(&self) -> Provisioner {
        Provisioner::Docker
    }

    fn host_dir(&self) -> PathBuf {
        self.state.machine_dir(&self.name)
    }

    async fn status(&self) -> MachineResult<MachineStatus> {
        if !self.state.exists(&self.name) || !self.cluster_exists().await? {
            return Ok(MachineStatus::Absent);
        }
        match self.container_state().await?.as_str() {
            "running" => Ok(MachineStatus::Running),
            "" => Err(MachineError::MalformedOutput {
                origin: "docker inspect".to_string(),
                reason: format!("no state reported for {}", self.control_plane()),
            }),
            other => Ok(MachineStatus::Stopped(other.to_string())),
        }
    }

    async fn up(&self, force: bool) -> MachineResult<UpOutcome> {
        self.try_up(force)
            .await
            .map_err(|e| e.context("up", &self.name))
    }

    async fn destroy(&self, _force: bool) -> MachineResult<()> {
        self.try_destroy()
            .await
            .map_err(|e| e.context("destroy", &self.name))
    }

    async fn export_kubeconfig(&self, path: &Path, overwrite: bool) -> MachineResult<()> {
        self.try_export(path, overwrite)
            .await
            .map_err(|e| e.context("export", &self.name))
    }

    async fn info(&self) -> MachineResult<MachineInfo> {
        self.try_info()
            .await
            .map_err(|e| e.context("info", &self.name))
    }

    async fn kubectl(&self, args: Vec<String>, stream: bool) -> MachineResult<String> {
        kubectl::run(self, self.runner.as_ref(), args, stream).await
    }
}
