//! kubectl against a machine's cluster
//!
//! Both backends reach their cluster the same way: through the kubeconfig in
//! the machine directory, exported on first use.

use std::net::TcpListener;

use tracing::info;

use super::error::MachineResult;
use super::{require_running, MachineCurd};
use crate::process::{Invocation, ProcessRunner};

/// Service fronting the Kubeflow dashboard
pub const KUBEFLOW_SERVICE: &str = "svc/istio-ingressgateway";
pub const KUBEFLOW_NAMESPACE: &str = "istio-system";
pub const KUBEFLOW_PORT: u16 = 80;

/// Arguments for `kubectl get pods`; an empty namespace means all of them
pub fn get_pods_args(namespace: &str) -> Vec<String> {
    let mut args = vec!["get".to_string(), "pods".to_string()];
    if namespace.is_empty() {
        args.push("-A".to_string());
    } else {
        args.push("-n".to_string());
        args.push(namespace.to_string());
    }
    args
}

/// Arguments for `kubectl port-forward`
pub fn port_forward_args(
    service: &str,
    namespace: &str,
    local_port: u16,
    remote_port: u16,
) -> Vec<String> {
    vec![
        "port-forward".to_string(),
        service.to_string(),
        "-n".to_string(),
        namespace.to_string(),
        format!("{}:{}", local_port, remote_port),
    ]
}

/// Ask the OS for a port nothing is listening on
pub fn free_local_port() -> MachineResult<u16> {
    let listener = TcpListener::bind("127.0.0.1:0")?;
    Ok(listener.local_addr()?.port())
}

/// Run kubectl with the machine's kubeconfig, exporting it first if needed
pub async fn run<M: MachineCurd + ?Sized>(
    machine: &M,
    runner: &dyn ProcessRunner,
    args: Vec<String>,
    stream: bool,
) -> MachineResult<String> {
    require_running(machine).await?;

    let kubeconfig = machine.kubeconfig_path();
    if !kubeconfig.is_file() {
        info!(
            "Exporting kubeconfig for {} to {}",
            machine.name(),
            kubeconfig.display()
        );
        machine.export_kubeconfig(&kubeconfig, false).await?;
    }

    let invocation = Invocation::new("kubectl")
        .arg("--kubeconfig")
        .arg(kubeconfig.to_string_lossy())
        .args(args)
        .streaming(stream);
    Ok(runner.run_checked(&invocation).await?.stdout)
}
