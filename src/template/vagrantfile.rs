//! Vagrantfile rendering for VM-backed machines
//!
//! The VM runs docker and kind itself; the kind document rendered next to the
//! Vagrantfile is picked up from the default `/vagrant` share. Host directories
//! referenced by that document are synced to the same path inside the VM so
//! its `hostPath` entries resolve unchanged.

use std::path::Path;

use crate::machine::spec::MachineSpec;
use crate::machine::state::KIND_CONFIG_FILE;

/// Base box for every VM
pub const VAGRANT_BOX: &str = "ubuntu/jammy64";

/// kind release installed inside the VM
pub const KIND_RELEASE: &str = "v0.20.0";

/// Render the Vagrantfile for a spec
pub fn render_vagrantfile(spec: &MachineSpec) -> String {
    let mut output = String::new();

    output.push_str("# -*- mode: ruby -*-\n");
    output.push_str("# vi: set ft=ruby :\n\n");
    output.push_str("Vagrant.configure(\"2\") do |config|\n");
    output.push_str(&format!("  config.vm.box = \"{}\"\n", VAGRANT_BOX));
    output.push_str(&format!("  config.vm.hostname = \"{}\"\n", spec.name()));

    output.push_str(&format!(
        "  config.vm.network \"forwarded_port\", guest: {port}, host: {port}, host_ip: \"{ip}\"\n",
        port = spec.api_server_port(),
        ip = spec.api_server_ip(),
    ));
    for pair in spec.export_ports() {
        output.push_str(&format!(
            "  config.vm.network \"forwarded_port\", guest: {port}, host: {port}\n",
            port = pair.host_port,
        ));
    }

    for folder in synced_folders(spec) {
        output.push_str(&format!(
            "  config.vm.synced_folder \"{dir}\", \"{dir}\"\n",
            dir = folder
        ));
    }

    output.push_str("  config.vm.provider \"virtualbox\" do |vb|\n");
    output.push_str(&format!("    vb.name = \"{}\"\n", spec.name()));
    output.push_str(&format!("    vb.cpus = {}\n", spec.cpus()));
    output.push_str(&format!("    vb.memory = {}\n", spec.memory_gb() * 1024));
    output.push_str("  end\n");

    output.push_str("  config.vm.provision \"shell\", inline: <<-SHELL\n");
    output.push_str("    set -e\n");
    output.push_str("    if ! command -v docker >/dev/null; then\n");
    output.push_str("      curl -fsSL https://get.docker.com | sh\n");
    output.push_str("    fi\n");
    output.push_str("    if ! command -v kind >/dev/null; then\n");
    output.push_str(&format!(
        "      curl -fsSLo /usr/local/bin/kind https://kind.sigs.k8s.io/dl/{}/kind-linux-amd64\n",
        KIND_RELEASE
    ));
    output.push_str("      chmod +x /usr/local/bin/kind\n");
    output.push_str("    fi\n");
    output.push_str(&format!(
        "    kind delete cluster --name {} || true\n",
        spec.name()
    ));
    output.push_str(&format!(
        "    kind create cluster --name {} --config /vagrant/{}\n",
        spec.name(),
        KIND_CONFIG_FILE
    ));
    output.push_str("  SHELL\n");
    output.push_str("end\n");

    output
}

fn synced_folders(spec: &MachineSpec) -> Vec<String> {
    let mut folders = Vec::new();
    if !spec.local_path().is_empty() {
        folders.push(spec.local_path().to_string());
    }
    if spec.audit_enabled() {
        if let Some(parent) = Path::new(spec.audit_policy_path()).parent() {
            let parent = parent.to_string_lossy().to_string();
            if !parent.is_empty() && !folders.contains(&parent) {
                folders.push(parent);
            }
        }
    }
    folders
}
