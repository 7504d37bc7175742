//! Command implementations for the CLI
//!
//! SBIO pattern: Commands return Results, printing is handled by the caller

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{info, warn};

use super::{AddArgs, Cli};
use crate::config::{self, ConfigError, Overrides, RuntimeConfig};
use crate::k8s::NodeVersion;
use crate::machine::error::MachineError;
use crate::machine::kubectl::{self, KUBEFLOW_NAMESPACE, KUBEFLOW_PORT, KUBEFLOW_SERVICE};
use crate::machine::resources::{capacity_warnings, host_snapshot};
use crate::machine::spec::{parse_export_ports, parse_node_labels, MachineSpec};
use crate::machine::{MachineCurdFactory, MachineInfo, UpOutcome};
use crate::plugins::{apply_plugins, ManifestPlugin, Plugin};

/// Errors that can occur during command execution
#[derive(Error, Debug)]
pub enum CommandError {
    #[error(transparent)]
    Machine(#[from] MachineError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for commands
pub type CommandResult<T> = Result<T, CommandError>;

// ============================================================================
// Configuration
// ============================================================================

/// Command line values that override the config file
pub fn overrides(cli: &Cli) -> Overrides {
    Overrides {
        provisioner: cli.provisioner.clone(),
        root_dir: cli.dir.clone(),
        verbose: cli.quiet.then_some(false),
    }
}

/// Load the config file and apply command line overrides
pub fn runtime_config(cli: &Cli) -> CommandResult<RuntimeConfig> {
    let path = cli
        .config
        .clone()
        .unwrap_or_else(config::default_config_path);
    let file = config::load_config_from(&path)?;
    Ok(RuntimeConfig::resolve(&file, &overrides(cli))?)
}

// ============================================================================
// Add
// ============================================================================

/// Turn `add` arguments into a validated spec
pub fn build_spec(args: &AddArgs) -> CommandResult<MachineSpec> {
    let node_version = match &args.k8s_sha256 {
        Some(sha256) => NodeVersion::new(&args.k8s_version, sha256)?,
        None => NodeVersion::known(&args.k8s_version)?,
    };

    let mut builder = MachineSpec::builder(&args.name)
        .cpus(args.cpus)
        .memory_gb(args.memory_gb)
        .gpus(args.gpus)
        .api_server_ip(&args.ip)
        .workers(args.workers)
        .node_version(node_version)
        .force_overwrite(args.force_overwrite);

    if let Some(ports) = &args.export_ports {
        builder = builder.export_ports(parse_export_ports(ports)?);
    }
    if let Some(labels) = &args.labels {
        builder = builder.node_labels(parse_node_labels(labels)?);
    }
    if let Some(local_path) = &args.local_path {
        builder = builder.local_path(absolute(local_path)?.to_string_lossy());
    }
    if let Some(policy) = &args.audit_policy {
        builder = builder.audit_policy(absolute(policy)?.to_string_lossy());
    }

    Ok(builder.build()?)
}

fn absolute(path: &Path) -> CommandResult<PathBuf> {
    Ok(std::path::absolute(path).map_err(MachineError::from)?)
}

/// Plugins requested for `add`, in command line order
pub fn build_plugins(args: &AddArgs, verbose: bool) -> Vec<Box<dyn Plugin>> {
    args.manifests
        .iter()
        .map(|path| Box::new(ManifestPlugin::new(path).streaming(verbose)) as Box<dyn Plugin>)
        .collect()
}

/// Provision a machine, then apply plugins if it was newly created
pub async fn add(
    factory: &dyn MachineCurdFactory,
    args: &AddArgs,
    verbose: bool,
) -> CommandResult<UpOutcome> {
    let spec = build_spec(args)?;

    for warning in capacity_warnings(&host_snapshot(), spec.cpus(), spec.memory_gb()) {
        warn!("{}", warning);
    }

    let plugins = build_plugins(args, verbose);
    let machine = factory.new_machine(&args.name, Some(spec))?;
    let outcome = machine.up(args.force).await?;

    match outcome {
        UpOutcome::Created => apply_plugins(machine.as_ref(), &plugins).await?,
        UpOutcome::AlreadyRunning if !plugins.is_empty() => {
            info!("{} was already running, skipping plugins", args.name);
        }
        UpOutcome::AlreadyRunning => {}
    }
    Ok(outcome)
}

// ============================================================================
// Other lifecycle commands
// ============================================================================

pub async fn delete(factory: &dyn MachineCurdFactory, name: &str, force: bool) -> CommandResult<()> {
    let machine = factory.new_machine(name, None)?;
    machine.destroy(force).await?;
    Ok(())
}

/// Info for every machine, sorted by name
pub async fn list(factory: &dyn MachineCurdFactory) -> CommandResult<Vec<MachineInfo>> {
    let mut infos = Vec::new();
    for machine in factory.list_machines()? {
        infos.push(machine.info().await?);
    }
    infos.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(infos)
}

/// Export a kubeconfig, returning where it was written
pub async fn export(
    factory: &dyn MachineCurdFactory,
    name: &str,
    path: Option<PathBuf>,
    force: bool,
) -> CommandResult<PathBuf> {
    let machine = factory.new_machine(name, None)?;
    let path = path.unwrap_or_else(|| machine.kubeconfig_path());
    machine.export_kubeconfig(&path, force).await?;
    Ok(path)
}

/// The local port `connect kubeflow` will use
pub fn kubeflow_local_port(requested: Option<u16>) -> CommandResult<u16> {
    match requested {
        Some(port) => Ok(port),
        None => Ok(kubectl::free_local_port()?),
    }
}

/// Forward the Kubeflow dashboard until interrupted
pub async fn connect_kubeflow(
    factory: &dyn MachineCurdFactory,
    name: &str,
    local_port: u16,
) -> CommandResult<()> {
    let machine = factory.new_machine(name, None)?;
    machine
        .portforward(KUBEFLOW_SERVICE, KUBEFLOW_NAMESPACE, KUBEFLOW_PORT, local_port)
        .await?;
    Ok(())
}

pub async fn get_pods(
    factory: &dyn MachineCurdFactory,
    name: &str,
    namespace: &str,
) -> CommandResult<String> {
    let machine = factory.new_machine(name, None)?;
    Ok(machine.get_pods(namespace).await?)
}
