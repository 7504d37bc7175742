//! Cluster configuration rendering
//!
//! A [`MachineSpec`] is first lowered into a typed [`ClusterConfig`] (one
//! control-plane node plus N workers), which is then printed as the document
//! `kind create cluster --config` consumes. Both steps are pure: the same spec
//! always yields byte-identical output.
//!
//! The document is printed by hand rather than through a YAML serializer
//! because kind expects repeated `node-labels` keys inside the kubeadm patch.

pub mod vagrantfile;

use crate::machine::error::{MachineError, MachineResult};
use crate::machine::spec::{ExportPortPair, MachineSpec, NodeLabel};

pub use vagrantfile::render_vagrantfile;

/// `apiVersion` of the kind cluster document
pub const KIND_API_VERSION: &str = "kind.x-k8s.io/v1alpha4";

/// Where the local-path provisioner keeps volumes inside a node
pub const LOCAL_PATH_PROVISIONER_DIR: &str = "/var/local-path-provisioner";

/// Where the API server reads its audit policy inside the control-plane node
pub const AUDIT_POLICY_CONTAINER_PATH: &str = "/etc/kubernetes/policies/audit-policy.yaml";

/// Label every control-plane node carries so ingress controllers can schedule there
pub fn builtin_node_label() -> NodeLabel {
    NodeLabel::new("ingress-ready", "true")
}

const AUDIT_PATCH: &str = r#"  - |
    kind: ClusterConfiguration
    apiServer:
      # enable auditing flags on the API server
      extraArgs:
        audit-log-path: /var/log/kubernetes/kube-apiserver-audit.log
        audit-policy-file: /etc/kubernetes/policies/audit-policy.yaml
        audit-log-maxage: "30"
        audit-log-maxbackup: "10"
        audit-log-maxsize: "100"
      # mount new files / directories on the control plane
      extraVolumes:
        - name: audit-policies
          hostPath: /etc/kubernetes/policies
          mountPath: /etc/kubernetes/policies
          readOnly: true
          pathType: "DirectoryOrCreate"
        - name: "audit-logs"
          hostPath: "/var/log/kubernetes"
          mountPath: "/var/log/kubernetes"
          readOnly: false
          pathType: DirectoryOrCreate
"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeRole {
    ControlPlane,
    Worker,
}

impl NodeRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeRole::ControlPlane => "control-plane",
            NodeRole::Worker => "worker",
        }
    }
}

/// A host path bind-mounted into a node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mount {
    pub host_path: String,
    pub container_path: String,
    pub read_only: bool,
}

/// One node of the cluster
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeConfig {
    pub role: NodeRole,
    pub image: String,
    pub gpus: bool,
    pub mounts: Vec<Mount>,
    /// Control plane only
    pub port_mappings: Vec<ExportPortPair>,
    /// Control plane only; starts with the built-in label
    pub node_labels: Vec<NodeLabel>,
    /// Control plane only
    pub audit: bool,
}

/// The full cluster document, before printing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterConfig {
    pub name: String,
    pub api_server_address: String,
    pub api_server_port: u16,
    pub nodes: Vec<NodeConfig>,
}

// ============================================================================
// SBIO: Pure business logic (no I/O)
// ============================================================================

impl ClusterConfig {
    /// Lower a spec into nodes.
    ///
    /// Fails only when auditing is enabled without a policy path.
    pub fn from_spec(spec: &MachineSpec) -> MachineResult<Self> {
        if spec.audit_enabled() && spec.audit_policy_path().is_empty() {
            return Err(MachineError::Config(
                "auditing is enabled but no audit policy path was given".to_string(),
            ));
        }

        let image = spec.node_version().image();
        let gpus = spec.gpus() > 0;
        let local_path_mount = (!spec.local_path().is_empty()).then(|| Mount {
            host_path: spec.local_path().to_string(),
            container_path: LOCAL_PATH_PROVISIONER_DIR.to_string(),
            read_only: false,
        });

        let mut control_plane_mounts: Vec<Mount> = local_path_mount.iter().cloned().collect();
        if spec.audit_enabled() {
            control_plane_mounts.push(Mount {
                host_path: spec.audit_policy_path().to_string(),
                container_path: AUDIT_POLICY_CONTAINER_PATH.to_string(),
                read_only: true,
            });
        }

        let mut node_labels = vec![builtin_node_label()];
        node_labels.extend(spec.node_labels().iter().cloned());

        let mut nodes = vec![NodeConfig {
            role: NodeRole::ControlPlane,
            image: image.clone(),
            gpus,
            mounts: control_plane_mounts,
            port_mappings: spec.export_ports().to_vec(),
            node_labels,
            audit: spec.audit_enabled(),
        }];

        nodes.extend((0..spec.workers()).map(|_| NodeConfig {
            role: NodeRole::Worker,
            image: image.clone(),
            gpus,
            mounts: local_path_mount.iter().cloned().collect(),
            port_mappings: Vec::new(),
            node_labels: Vec::new(),
            audit: false,
        }));

        Ok(Self {
            name: spec.name().to_string(),
            api_server_address: spec.api_server_ip().to_string(),
            api_server_port: spec.api_server_port(),
            nodes,
        })
    }

    pub fn control_plane(&self) -> Option<&NodeConfig> {
        self.nodes.iter().find(|n| n.role == NodeRole::ControlPlane)
    }

    pub fn workers(&self) -> impl Iterator<Item = &NodeConfig> {
        self.nodes.iter().filter(|n| n.role == NodeRole::Worker)
    }

    /// Print the kind cluster document
    pub fn render(&self) -> String {
        let mut output = String::new();

        output.push('\n');
        output.push_str("kind: Cluster\n");
        output.push_str(&format!("apiVersion: {}\n", KIND_API_VERSION));
        output.push_str(&format!("name: {}\n", self.name));
        output.push_str("nodes:\n");

        for node in &self.nodes {
            render_node(&mut output, node);
        }

        output.push_str("networking:\n");
        output.push_str(&format!("  apiServerAddress: {}\n", self.api_server_address));
        output.push_str(&format!("  apiServerPort: {}\n", self.api_server_port));

        output
    }
}

fn render_node(output: &mut String, node: &NodeConfig) {
    output.push_str(&format!("- role: {}\n", node.role.as_str()));

    if node.role == NodeRole::ControlPlane {
        output.push_str("  kubeadmConfigPatches:\n");
        if node.audit {
            output.push_str(AUDIT_PATCH);
        }
        output.push_str("  - |\n");
        output.push_str("    kind: InitConfiguration\n");
        output.push_str("    nodeRegistration:\n");
        output.push_str("      kubeletExtraArgs:\n");
        for label in &node.node_labels {
            output.push_str(&format!("        node-labels: \"{}\"\n", label));
        }
    }

    output.push_str(&format!("  image: {}\n", node.image));
    output.push_str(&format!("  gpus: {}\n", node.gpus));

    if !node.port_mappings.is_empty() {
        output.push_str("  extraPortMappings:\n");
        for port in &node.port_mappings {
            output.push_str(&format!("  - containerPort: {}\n", port.container_port));
            output.push_str(&format!("    hostPort: {}\n", port.host_port));
            output.push_str("    protocol: TCP\n");
        }
    }

    if !node.mounts.is_empty() {
        output.push_str("  extraMounts:\n");
        for mount in &node.mounts {
            output.push_str(&format!("  - hostPath: {}\n", mount.host_path));
            output.push_str(&format!("    containerPath: {}\n", mount.container_path));
            if mount.read_only {
                output.push_str("    readOnly: true\n");
            }
        }
    }
}

/// Render the kind cluster document for a spec
pub fn render(spec: &MachineSpec) -> MachineResult<String> {
    Ok(ClusterConfig::from_spec(spec)?.render())
}
