//! Declarative description of a machine to provision

use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::error::{MachineError, MachineResult};
use crate::k8s::NodeVersion;

/// Address the API server binds to when none is requested
pub const DEFAULT_API_SERVER_IP: &str = "0.0.0.0";

/// Port the API server is published on
pub const DEFAULT_API_SERVER_PORT: u16 = 6443;

/// Longest accepted machine name; kind derives container names from it
pub const MAX_NAME_LEN: usize = 50;

fn name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?$").expect("static regex"))
}

/// Check that a name is usable both as a directory and as a cluster name
pub fn validate_name(name: &str) -> MachineResult<()> {
    if name.len() > MAX_NAME_LEN || !name_pattern().is_match(name) {
        return Err(MachineError::InvalidName(name.to_string()));
    }
    Ok(())
}

/// A host port published to a port on the control-plane node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExportPortPair {
    pub host_port: u16,
    pub container_port: u16,
}

impl ExportPortPair {
    pub fn new(host_port: u16, container_port: u16) -> Self {
        Self {
            host_port,
            container_port,
        }
    }
}

impl FromStr for ExportPortPair {
    type Err = MachineError;

    /// Parse `host:container`, e.g. `8443:443`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || MachineError::Config(format!("invalid port mapping '{}', want host:container", s));
        let (host, container) = s.trim().split_once(':').ok_or_else(invalid)?;
        let host_port = host.trim().parse::<u16>().map_err(|_| invalid())?;
        let container_port = container.trim().parse::<u16>().map_err(|_| invalid())?;
        Ok(Self::new(host_port, container_port))
    }
}

/// A kubelet node label, `key=value`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeLabel {
    pub key: String,
    pub value: String,
}

impl NodeLabel {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

impl fmt::Display for NodeLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.key, self.value)
    }
}

impl FromStr for NodeLabel {
    type Err = MachineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().split_once('=') {
            Some((key, value)) if !key.trim().is_empty() => {
                Ok(Self::new(key.trim(), value.trim()))
            }
            _ => Err(MachineError::Config(format!(
                "invalid node label '{}', want key=value",
                s
            ))),
        }
    }
}

/// Parse a comma-delimited list such as `8443:443,80:8080`, keeping order
pub fn parse_export_ports(input: &str) -> MachineResult<Vec<ExportPortPair>> {
    parse_list(input)
}

/// Parse a comma-delimited list such as `k1=v1,k2=v2`, keeping order and duplicates
pub fn parse_node_labels(input: &str) -> MachineResult<Vec<NodeLabel>> {
    parse_list(input)
}

fn parse_list<T: FromStr<Err = MachineError>>(input: &str) -> MachineResult<Vec<T>> {
    input
        .split(',')
        .filter(|item| !item.trim().is_empty())
        .map(str::parse)
        .collect()
}

/// Everything needed to render and provision one machine.
///
/// Built once per command through [`MachineSpecBuilder`] and never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MachineSpec {
    name: String,
    cpus: u32,
    memory_gb: u32,
    gpus: u32,
    api_server_ip: String,
    api_server_port: u16,
    export_ports: Vec<ExportPortPair>,
    workers: u32,
    node_labels: Vec<NodeLabel>,
    audit_enabled: bool,
    audit_policy_path: String,
    local_path: String,
    node_version: NodeVersion,
    force_overwrite: bool,
}

impl MachineSpec {
    pub fn builder(name: impl Into<String>) -> MachineSpecBuilder {
        MachineSpecBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn cpus(&self) -> u32 {
        self.cpus
    }

    pub fn memory_gb(&self) -> u32 {
        self.memory_gb
    }

    pub fn gpus(&self) -> u32 {
        self.gpus
    }

    pub fn api_server_ip(&self) -> &str {
        &self.api_server_ip
    }

    pub fn api_server_port(&self) -> u16 {
        self.api_server_port
    }

    pub fn export_ports(&self) -> &[ExportPortPair] {
        &self.export_ports
    }

    pub fn workers(&self) -> u32 {
        self.workers
    }

    pub fn node_labels(&self) -> &[NodeLabel] {
        &self.node_labels
    }

    pub fn audit_enabled(&self) -> bool {
        self.audit_enabled
    }

    pub fn audit_policy_path(&self) -> &str {
        &self.audit_policy_path
    }

    pub fn local_path(&self) -> &str {
        &self.local_path
    }

    pub fn node_version(&self) -> &NodeVersion {
        &self.node_version
    }

    pub fn force_overwrite(&self) -> bool {
        self.force_overwrite
    }
}

/// Builder for [`MachineSpec`]; validation happens in [`build`](Self::build)
#[derive(Debug, Clone)]
pub struct MachineSpecBuilder {
    spec: MachineSpec,
}

impl MachineSpecBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            spec: MachineSpec {
                name: name.into(),
                cpus: 1,
                memory_gb: 1,
                gpus: 0,
                api_server_ip: DEFAULT_API_SERVER_IP.to_string(),
                api_server_port: DEFAULT_API_SERVER_PORT,
                export_ports: Vec::new(),
                workers: 0,
                node_labels: Vec::new(),
                audit_enabled: false,
                audit_policy_path: String::new(),
                local_path: String::new(),
                node_version: NodeVersion::default(),
                force_overwrite: false,
            },
        }
    }

    pub fn cpus(mut self, cpus: u32) -> Self {
        self.spec.cpus = cpus;
        self
    }

    pub fn memory_gb(mut self, memory_gb: u32) -> Self {
        self.spec.memory_gb = memory_gb;
        self
    }

    pub fn gpus(mut self, gpus: u32) -> Self {
        self.spec.gpus = gpus;
        self
    }

    pub fn api_server_ip(mut self, ip: impl Into<String>) -> Self {
        self.spec.api_server_ip = ip.into();
        self
    }

    pub fn api_server_port(mut self, port: u16) -> Self {
        self.spec.api_server_port = port;
        self
    }

    pub fn export_ports(mut self, ports: Vec<ExportPortPair>) -> Self {
        self.spec.export_ports = ports;
        self
    }

    pub fn workers(mut self, workers: u32) -> Self {
        self.spec.workers = workers;
        self
    }

    pub fn node_labels(mut self, labels: Vec<NodeLabel>) -> Self {
        self.spec.node_labels = labels;
        self
    }

    /// Enable API server auditing with the given policy file
    pub fn audit_policy(mut self, path: impl Into<String>) -> Self {
        self.spec.audit_enabled = true;
        self.spec.audit_policy_path = path.into();
        self
    }

    pub fn local_path(mut self, path: impl Into<String>) -> Self {
        self.spec.local_path = path.into();
        self
    }

    pub fn node_version(mut self, version: NodeVersion) -> Self {
        self.spec.node_version = version;
        self
    }

    pub fn force_overwrite(mut self, force: bool) -> Self {
        self.spec.force_overwrite = force;
        self
    }

    pub fn build(self) -> MachineResult<MachineSpec> {
        let spec = self.spec;
        validate_name(&spec.name)?;

        if spec.cpus == 0 {
            return Err(MachineError::Config("cpus must be greater than 0".to_string()));
        }
        if spec.memory_gb == 0 {
            return Err(MachineError::Config(
                "memory must be at least 1 gigabyte".to_string(),
            ));
        }
        if spec.api_server_port == 0 {
            return Err(MachineError::Config(
                "api server port must not be 0".to_string(),
            ));
        }
        if spec.api_server_ip.trim().is_empty() {
            return Err(MachineError::Config(
                "api server ip must not be empty".to_string(),
            ));
        }

        if spec.audit_enabled {
            let policy = Path::new(&spec.audit_policy_path);
            if spec.audit_policy_path.is_empty() {
                return Err(MachineError::Config(
                    "auditing requires an audit policy file".to_string(),
                ));
            }
            if !policy.is_absolute() {
                return Err(MachineError::Config(format!(
                    "audit policy path '{}' must be absolute",
                    spec.audit_policy_path
                )));
            }
            if !policy.is_file() {
                return Err(MachineError::Config(format!(
                    "audit policy file '{}' does not exist",
                    spec.audit_policy_path
                )));
            }
        }

        Ok(spec)
    }
}
