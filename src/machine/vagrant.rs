//! VM-backed machines, driven by `vagrant`
//!
//! The machine directory doubles as the Vagrant project directory: every
//! `vagrant` call runs with it as the working directory. kind runs inside the
//! VM and is reached over `vagrant ssh`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use super::error::{MachineError, MachineResult};
use super::resources::{CpuInfo, MemInfo, ResourceSnapshot};
use super::spec::MachineSpec;
use super::state::{remove_stale, write_guarded, StateDir};
use super::{
    check_export_target, check_handle, kubectl, require_running, require_spec, MachineCurd,
    MachineCurdFactory, MachineInfo, MachineStatus, Provisioner, UpOutcome,
};
use crate::process::{Invocation, ProcessRunner};
use crate::template::{self, render_vagrantfile};

/// Extract the `state` field from `vagrant status --machine-readable`.
///
/// Records look like `1690000000,default,state,running`.
pub fn parse_machine_state(output: &str) -> Option<String> {
    output.lines().find_map(|line| {
        let mut fields = line.trim().split(',');
        let _timestamp = fields.next()?;
        let _target = fields.next()?;
        if fields.next()? != "state" {
            return None;
        }
        fields
            .next()
            .map(str::trim)
            .filter(|state| !state.is_empty())
            .map(str::to_string)
    })
}

/// Factory for Vagrant machines under one root directory
pub struct VagrantMachines {
    state: StateDir,
    verbose: bool,
    runner: Arc<dyn ProcessRunner>,
}

impl VagrantMachines {
    pub fn new(state: StateDir, verbose: bool, runner: Arc<dyn ProcessRunner>) -> Self {
        Self {
            state,
            verbose,
            runner,
        }
    }

    fn open(&self, name: &str, spec: Option<MachineSpec>) -> VagrantMachine {
        VagrantMachine {
            name: name.to_string(),
            spec,
            state: self.state.clone(),
            verbose: self.verbose,
            runner: self.runner.clone(),
        }
    }
}

impl MachineCurdFactory for VagrantMachines {
    fn provisioner(&self) -> Provisioner {
        Provisioner::Vagrant
    }

    fn new_machine(
        &self,
        name: &str,
        spec: Option<MachineSpec>,
    ) -> MachineResult<Box<dyn MachineCurd>> {
        check_handle(name, spec.as_ref())?;
        if let Some(spec) = &spec {
            if spec.gpus() > 0 {
                return Err(MachineError::Config(format!(
                    "the vagrant provisioner does not support GPUs (requested {})",
                    spec.gpus()
                )));
            }
        }
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

/// One Vagrant VM running a kind cluster
pub struct VagrantMachine {
    name: String,
    spec: Option<MachineSpec>,
    state: StateDir,
    verbose: bool,
    runner: Arc<dyn ProcessRunner>,
}

impl VagrantMachine {
    fn vagrant(&self) -> Invocation {
        Invocation::new("vagrant").current_dir(self.state.machine_dir(&self.name))
    }

    async fn ssh(&self, command: &str) -> MachineResult<String> {
        let invocation = self.vagrant().args(["ssh", "-c", command]);
        Ok(self.runner.run_checked(&invocation).await?.stdout)
    }

    async fn resources(&self) -> MachineResult<ResourceSnapshot> {
        let cpu = CpuInfo::parse_nproc(&self.ssh("nproc").await?)?;
        let mem = MemInfo::parse(&self.ssh("cat /proc/meminfo").await?)?;
        Ok(ResourceSnapshot { cpu, mem })
    }

    async fn try_up(&self, force: bool) -> MachineResult<UpOutcome> {
        let spec = require_spec(&self.name, self.spec.as_ref())?;
        let status = self.status().await?;
        if status.is_running() && !force {
            info!("Machine {} is already running", self.name);
            return Ok(UpOutcome::AlreadyRunning);
        }

        self.state.ensure(&self.name)?;
        let overwrite = spec.force_overwrite() || force;
        write_guarded(
            &self.state.kind_config_path(&self.name),
            &template::render(spec)?,
            overwrite,
        )?;
        write_guarded(
            &self.state.vagrantfile_path(&self.name),
            &render_vagrantfile(spec),
            overwrite,
        )?;

        remove_stale(&self.kubeconfig_path())?;

        let mut up = self.vagrant().arg("up").streaming(self.verbose);
        if force && status != MachineStatus::Absent {
            info!("Reprovisioning VM {}", self.name);
            up = up.arg("--provision");
        }
        self.runner.run_checked(&up).await?;

        info!("Machine {} is up", self.name);
        Ok(UpOutcome::Created)
    }

    async fn try_destroy(&self, force: bool) -> MachineResult<()> {
        if !self.state.exists(&self.name) {
            debug!("Machine {} has no state directory, nothing to destroy", self.name);
            return Ok(());
        }

        // without -f vagrant asks for confirmation on the terminal
        let mut destroy = self
            .vagrant()
            .arg("destroy")
            .streaming(self.verbose || !force);
        if force {
            destroy = destroy.arg("-f");
        }
        self.runner.run_checked(&destroy).await?;

        self.state.remove(&self.name)?;
        info!("Machine {} destroyed", self.name);
        Ok(())
    }

    async fn try_export(&self, path: &Path, overwrite: bool) -> MachineResult<()> {
        require_running(self).await?;
        check_export_target(path, overwrite)?;

        let kubeconfig = self
            .ssh(&format!("sudo kind get kubeconfig --name {}", self.name))
            .await?;
        write_guarded(path, &kubeconfig, overwrite)?;
        info!("Kubeconfig for {} written to {}", self.name, path.display());
        Ok(())
    }

    async fn try_info(&self) -> MachineResult<MachineInfo> {
        let status = self.status().await?;
        let mut info = MachineInfo::new(self, status);
        if info.status.is_running() {
            info.resources = Some(self.resources().await?);
        }
        Ok(info)
    }
}

#[async_trait]
impl MachineCurd for VagrantMachine {
    fn name(&self) -> &str {
        &self.name
    }

    fn provisioner(&self) -> Provisioner {
        Provisioner::Vagrant
    }

    fn host_dir(&self) -> PathBuf {
        self.state.machine_dir(&self.name)
    }

    async fn status(&self) -> MachineResult<MachineStatus> {
        // vagrant refuses to run outside a project directory
        if !self.state.vagrantfile_path(&self.name).is_file() {
            return Ok(MachineStatus::Absent);
        }
        let invocation = self.vagrant().args(["status", "--machine-readable"]);
        let output = self.runner.run_checked(&invocation).await?;
        match parse_machine_state(&output.stdout).as_deref() {
            Some("running") => Ok(MachineStatus::Running),
            Some("not_created") => Ok(MachineStatus::Absent),
            Some(other) => Ok(MachineStatus::Stopped(other.to_string())),
            None => Err(MachineError::MalformedOutput {
                origin: "vagrant status".to_string(),
                reason: "no state record".to_string(),
            }),
        }
    }

    async fn up(&self, force: bool) -> MachineResult<UpOutcome> {
        self.try_up(force)
            .await
            .map_err(|e| e.context("up", &self.name))
    }

    async fn destroy(&self, force: bool) -> MachineResult<()> {
        self.try_destroy(force)
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
