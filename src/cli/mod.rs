//! CLI module for multikf
//!
//! Subcommands:
//! - `multikf add` - Provision a machine (and optionally install manifests)
//! - `multikf delete` - Tear a machine down
//! - `multikf list` - List machines with live status and resources
//! - `multikf export` - Write a machine's kubeconfig
//! - `multikf connect kubeflow` - Port-forward the Kubeflow dashboard
//! - `multikf get pods` - List pods on a machine
//! - `multikf version` - Show version and supported Kubernetes versions

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::k8s::DEFAULT_VERSION;
use crate::machine::spec::DEFAULT_API_SERVER_IP;

mod commands;
mod display;

pub use commands::*;
pub use display::*;

#[derive(Parser, Debug)]
#[command(name = "multikf")]
#[command(about = "Provision disposable Kubernetes clusters on this workstation")]
#[command(version)]
pub struct Cli {
    /// Enable verbose logging output (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to config file (default: ~/.multikf/config)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory holding one sub-directory per machine
    #[arg(long, global = true, env = "MULTIKF_DIR")]
    pub dir: Option<String>,

    /// Backend to use: docker or vagrant
    #[arg(long, global = true, env = "MULTIKF_PROVISIONER")]
    pub provisioner: Option<String>,

    /// Capture native tool output instead of streaming it to the terminal
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Provision a new machine
    Add(AddArgs),

    /// Destroy a machine and remove its state
    #[command(visible_alias = "rm")]
    Delete(DeleteArgs),

    /// List machines
    #[command(visible_alias = "ls")]
    List(ListArgs),

    /// Export a machine's kubeconfig
    Export(ExportArgs),

    /// Connect to a service running on a machine
    Connect(ConnectArgs),

    /// Get resources from a machine's cluster
    Get(GetArgs),

    /// Show version information
    Version,
}

/// Arguments for the add command
#[derive(Parser, Debug, Clone)]
pub struct AddArgs {
    /// Machine name (lowercase letters, digits and '-')
    pub name: String,

    /// CPUs to assign
    #[arg(long, default_value = "1")]
    pub cpus: u32,

    /// Memory to assign, in gigabytes
    #[arg(long = "memoryg", default_value = "1")]
    pub memory_gb: u32,

    /// GPUs to expose (docker only)
    #[arg(long = "use-gpus", default_value = "0")]
    pub gpus: u32,

    /// Address the API server is published on
    #[arg(long = "with-ip", default_value = DEFAULT_API_SERVER_IP)]
    pub ip: String,

    /// Ports to publish, host:container, comma separated (e.g. "8443:443,80:8080")
    #[arg(long)]
    pub export_ports: Option<String>,

    /// Number of worker nodes
    #[arg(long = "with-workers", default_value = "0")]
    pub workers: u32,

    /// Node labels, key=value, comma separated
    #[arg(long = "with-labels")]
    pub labels: Option<String>,

    /// Host directory used for local-path volumes
    #[arg(long = "use-localpath")]
    pub local_path: Option<PathBuf>,

    /// Enable API server auditing with this policy file
    #[arg(long = "with-audit", value_name = "POLICY")]
    pub audit_policy: Option<PathBuf>,

    /// Kubernetes version of the node image
    #[arg(long = "with-k8s-version", default_value = DEFAULT_VERSION)]
    pub k8s_version: String,

    /// Image digest for a version not in the built-in table
    #[arg(long = "with-k8s-sha256")]
    pub k8s_sha256: Option<String>,

    /// Manifest file or kustomization directory to apply once up (repeatable)
    #[arg(long = "with-manifest", value_name = "PATH")]
    pub manifests: Vec<PathBuf>,

    /// Overwrite existing rendered configuration files
    #[arg(long)]
    pub force_overwrite: bool,

    /// Recreate the machine even if it is already running
    #[arg(short, long)]
    pub force: bool,
}

/// Arguments for the delete command
#[derive(Parser, Debug)]
pub struct DeleteArgs {
    /// Machine name
    pub name: String,

    /// Do not ask for confirmation
    #[arg(short, long)]
    pub force: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

/// Arguments for the list command
#[derive(Parser, Debug)]
pub struct ListArgs {
    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
    pub output: OutputFormat,
}

/// Arguments for the export command
#[derive(Parser, Debug)]
pub struct ExportArgs {
    /// Machine name
    pub name: String,

    /// Where to write the kubeconfig (default: <dir>/<name>/kubeconfig)
    #[arg(long)]
    pub kubeconfig_path: Option<PathBuf>,

    /// Overwrite an existing file
    #[arg(short, long)]
    pub force: bool,
}

/// Arguments for the connect command
#[derive(Parser, Debug)]
pub struct ConnectArgs {
    #[command(subcommand)]
    pub target: ConnectTarget,
}

#[derive(Subcommand, Debug)]
pub enum ConnectTarget {
    /// Port-forward the Kubeflow dashboard to this host
    Kubeflow {
        /// Machine name
        name: String,

        /// Local port (default: any free port)
        #[arg(short, long)]
        port: Option<u16>,
    },
}

/// Arguments for the get command
#[derive(Parser, Debug)]
pub struct GetArgs {
    #[command(subcommand)]
    pub resource: GetResource,
}

#[derive(Subcommand, Debug)]
pub enum GetResource {
    /// List pods
    #[command(name = "pods", visible_alias = "pod", visible_alias = "po")]
    Pods {
        /// Machine name
        name: String,

        /// Namespace (omit for all namespaces)
        #[arg(short, long, default_value = "")]
        namespace: String,
    },
}
