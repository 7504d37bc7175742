//! Integration tests for the machine lifecycle
//!
//! Native tools are replaced by a `ScriptedRunner`; state directories live in
//! temporary roots.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use clap::Parser;
use tempfile::TempDir;

use multikf::cli::{self, Cli, Commands};
use multikf::machine::error::{ErrorKind, MachineError, MachineResult};
use multikf::machine::spec::MachineSpec;
use multikf::machine::state::{KIND_CONFIG_FILE, KUBECONFIG_FILE, VAGRANT_FILE};
use multikf::machine::{
    new_machine_factory, MachineCurd, MachineCurdFactory, MachineStatus, UpOutcome,
};
use multikf::plugins::{apply_plugins, Plugin};
use multikf::process::ProcessOutput;
use multikf::template;
use multikf::testing::ScriptedRunner;

fn factory(kind: &str, root: &Path, runner: &Arc<ScriptedRunner>) -> Box<dyn MachineCurdFactory> {
    new_machine_factory(kind, root, false, runner.clone()).unwrap()
}

fn spec(name: &str) -> MachineSpec {
    MachineSpec::builder(name).cpus(2).memory_gb(2).build().unwrap()
}

fn script_running(runner: &ScriptedRunner, name: &str) {
    runner.on("kind get clusters", ProcessOutput::success(format!("{}\n", name)));
    runner.on("docker inspect", ProcessOutput::success("running\n"));
}

fn vagrant_project(root: &Path, name: &str) {
    std::fs::create_dir(root.join(name)).unwrap();
    std::fs::write(root.join(name).join(VAGRANT_FILE), "").unwrap();
}

fn position(calls: &[String], prefix: &str) -> usize {
    calls
        .iter()
        .position(|c| c.starts_with(prefix))
        .unwrap_or_else(|| panic!("no call starting with '{}' in {:?}", prefix, calls))
}

// ============================================================================
// Up
// ============================================================================

#[tokio::test]
async fn test_up_renders_config_and_creates_cluster() {
    let tmp = TempDir::new().unwrap();
    let runner = ScriptedRunner::shared();
    let spec = spec("demo");
    let expected = template::render(&spec).unwrap();

    let machine = factory("docker", tmp.path(), &runner)
        .new_machine("demo", Some(spec))
        .unwrap();
    assert_eq!(machine.up(false).await.unwrap(), UpOutcome::Created);

    let config_path = tmp.path().join("demo").join(KIND_CONFIG_FILE);
    assert_eq!(std::fs::read_to_string(&config_path).unwrap(), expected);
    assert_eq!(
        runner.calls(),
        vec![format!(
            "kind create cluster --name demo --config {}",
            config_path.display()
        )]
    );
}

#[tokio::test]
async fn test_up_is_noop_when_running() {
    let tmp = TempDir::new().unwrap();
    let config_path = tmp.path().join("demo").join(KIND_CONFIG_FILE);
    std::fs::create_dir(tmp.path().join("demo")).unwrap();
    std::fs::write(&config_path, "sentinel").unwrap();

    let runner = ScriptedRunner::shared();
    script_running(&runner, "demo");

    let machine = factory("docker", tmp.path(), &runner)
        .new_machine("demo", Some(spec("demo")))
        .unwrap();
    assert_eq!(machine.up(false).await.unwrap(), UpOutcome::AlreadyRunning);

    assert_eq!(std::fs::read_to_string(&config_path).unwrap(), "sentinel");
    assert!(!runner.called("kind create"));
    assert!(!runner.called("kind delete"));
}

#[tokio::test]
async fn test_forced_up_rerenders_and_recreates() {
    let tmp = TempDir::new().unwrap();
    let config_path = tmp.path().join("demo").join(KIND_CONFIG_FILE);
    std::fs::create_dir(tmp.path().join("demo")).unwrap();
    std::fs::write(&config_path, "sentinel").unwrap();

    let runner = ScriptedRunner::shared();
    script_running(&runner, "demo");

    let machine = factory("docker", tmp.path(), &runner)
        .new_machine("demo", Some(spec("demo")))
        .unwrap();
    assert_eq!(machine.up(true).await.unwrap(), UpOutcome::Created);

    assert_ne!(std::fs::read_to_string(&config_path).unwrap(), "sentinel");
    let calls = runner.calls();
    assert!(
        position(&calls, "kind delete cluster --name demo")
            < position(&calls, "kind create cluster --name demo")
    );
}

#[tokio::test]
async fn test_forced_up_replaces_stale_kubeconfig() {
    let tmp = TempDir::new().unwrap();
    let kubeconfig = tmp.path().join("demo").join(KUBECONFIG_FILE);
    std::fs::create_dir(tmp.path().join("demo")).unwrap();
    std::fs::write(&kubeconfig, "old-cluster-certs").unwrap();

    let runner = ScriptedRunner::shared();
    script_running(&runner, "demo");
    runner.on("kind get kubeconfig", ProcessOutput::success("new-cluster-certs"));

    let machine = factory("docker", tmp.path(), &runner)
        .new_machine("demo", Some(spec("demo")))
        .unwrap();
    assert_eq!(machine.up(true).await.unwrap(), UpOutcome::Created);
    assert!(!kubeconfig.exists());

    machine.get_pods("").await.unwrap();
    assert_eq!(
        std::fs::read_to_string(&kubeconfig).unwrap(),
        "new-cluster-certs"
    );
    let calls = runner.calls();
    assert!(
        position(&calls, "kind create cluster --name demo")
            < position(&calls, "kind get kubeconfig --name demo")
    );
}

#[tokio::test]
async fn test_up_refuses_to_overwrite_config() {
    let tmp = TempDir::new().unwrap();
    let config_path = tmp.path().join("demo").join(KIND_CONFIG_FILE);
    std::fs::create_dir(tmp.path().join("demo")).unwrap();
    std::fs::write(&config_path, "sentinel").unwrap();

    let runner = ScriptedRunner::shared();
    let machine = factory("docker", tmp.path(), &runner)
        .new_machine("demo", Some(spec("demo")))
        .unwrap();

    let err = machine.up(false).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::StateConflict);
    assert_eq!(std::fs::read_to_string(&config_path).unwrap(), "sentinel");
    assert!(!runner.called("kind create"));
}

#[tokio::test]
async fn test_up_with_force_overwrite_replaces_config() {
    let tmp = TempDir::new().unwrap();
    let config_path = tmp.path().join("demo").join(KIND_CONFIG_FILE);
    std::fs::create_dir(tmp.path().join("demo")).unwrap();
    std::fs::write(&config_path, "sentinel").unwrap();

    let runner = ScriptedRunner::shared();
    let spec = MachineSpec::builder("demo").force_overwrite(true).build().unwrap();
    let machine = factory("docker", tmp.path(), &runner)
        .new_machine("demo", Some(spec))
        .unwrap();

    assert_eq!(machine.up(false).await.unwrap(), UpOutcome::Created);
    assert!(std::fs::read_to_string(&config_path)
        .unwrap()
        .contains("name: demo"));
}

#[tokio::test]
async fn test_backend_failure_leaves_rendered_config() {
    let tmp = TempDir::new().unwrap();
    let runner = ScriptedRunner::shared();
    runner.on(
        "kind create",
        ProcessOutput::failure(1, "ERROR: failed to create cluster: boom\n"),
    );

    let machine = factory("docker", tmp.path(), &runner)
        .new_machine("demo", Some(spec("demo")))
        .unwrap();
    let err = machine.up(false).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Backend);
    let message = err.to_string();
    assert!(message.starts_with("up demo:"), "{}", message);
    assert!(message.contains("boom"));
    assert!(tmp.path().join("demo").join(KIND_CONFIG_FILE).is_file());
}

#[tokio::test]
async fn test_read_only_handle_cannot_up() {
    let tmp = TempDir::new().unwrap();
    let runner = ScriptedRunner::shared();
    let machine = factory("docker", tmp.path(), &runner)
        .new_machine("demo", None)
        .unwrap();

    let err = machine.up(false).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);
    assert!(runner.calls().is_empty());
    assert!(!tmp.path().join("demo").exists());
}

// ============================================================================
// Destroy
// ============================================================================

#[tokio::test]
async fn test_destroy_absent_machine_invokes_nothing() {
    let tmp = TempDir::new().unwrap();
    for kind in ["docker", "vagrant"] {
        let runner = ScriptedRunner::shared();
        let machine = factory(kind, tmp.path(), &runner)
            .new_machine("ghost", None)
            .unwrap();
        machine.destroy(false).await.unwrap();
        machine.destroy(true).await.unwrap();
        assert!(runner.calls().is_empty(), "{} invoked {:?}", kind, runner.calls());
    }
}

#[tokio::test]
async fn test_destroy_removes_state_directory() {
    let tmp = TempDir::new().unwrap();
    std::fs::create_dir(tmp.path().join("demo")).unwrap();
    let runner = ScriptedRunner::shared();

    let machine = factory("docker", tmp.path(), &runner)
        .new_machine("demo", None)
        .unwrap();
    machine.destroy(false).await.unwrap();

    assert!(runner.called("kind delete cluster --name demo"));
    assert!(!tmp.path().join("demo").exists());
}

#[tokio::test]
async fn test_failed_destroy_keeps_state_directory() {
    let tmp = TempDir::new().unwrap();
    std::fs::create_dir(tmp.path().join("demo")).unwrap();
    let runner = ScriptedRunner::shared();
    runner.on("kind delete", ProcessOutput::failure(1, "permission denied"));

    let machine = factory("docker", tmp.path(), &runner)
        .new_machine("demo", None)
        .unwrap();
    let err = machine.destroy(true).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Backend);
    assert!(err.to_string().contains("permission denied"));
    assert!(tmp.path().join("demo").is_dir());
}

// ============================================================================
// Export
// ============================================================================

#[tokio::test]
async fn test_export_guards_existing_target() {
    let tmp = TempDir::new().unwrap();
    std::fs::create_dir(tmp.path().join("demo")).unwrap();
    let runner = ScriptedRunner::shared();
    script_running(&runner, "demo");
    runner.on("kind get kubeconfig", ProcessOutput::success("apiVersion: v1\n"));

    let machine = factory("docker", tmp.path(), &runner)
        .new_machine("demo", None)
        .unwrap();
    let target = tmp.path().join("out").join("kubeconfig");

    machine.export_kubeconfig(&target, false).await.unwrap();
    assert_eq!(std::fs::read_to_string(&target).unwrap(), "apiVersion: v1\n");

    std::fs::write(&target, "local edits").unwrap();
    let exports_before = runner
        .calls()
        .iter()
        .filter(|c| c.starts_with("kind get kubeconfig"))
        .count();
    let err = machine.export_kubeconfig(&target, false).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::StateConflict);
    assert_eq!(std::fs::read_to_string(&target).unwrap(), "local edits");
    let exports_after = runner
        .calls()
        .iter()
        .filter(|c| c.starts_with("kind get kubeconfig"))
        .count();
    assert_eq!(exports_before, exports_after);

    machine.export_kubeconfig(&target, true).await.unwrap();
    assert_eq!(std::fs::read_to_string(&target).unwrap(), "apiVersion: v1\n");
}

#[tokio::test]
async fn test_export_requires_running_machine() {
    let tmp = TempDir::new().unwrap();
    let runner = ScriptedRunner::shared();
    let machine = factory("docker", tmp.path(), &runner)
        .new_machine("demo", None)
        .unwrap();

    let err = machine
        .export_kubeconfig(&tmp.path().join("kubeconfig"), false)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert!(matches!(err.root(), MachineError::NotFound(name) if name == "demo"));
}

// ============================================================================
// kubectl
// ============================================================================

#[tokio::test]
async fn test_get_pods_exports_kubeconfig_on_first_use() {
    let tmp = TempDir::new().unwrap();
    std::fs::create_dir(tmp.path().join("demo")).unwrap();
    let runner = ScriptedRunner::shared();
    script_running(&runner, "demo");
    runner.on("kind get kubeconfig", ProcessOutput::success("apiVersion: v1\n"));
    runner.on("kubectl", ProcessOutput::success("NAMESPACE   NAME\n"));

    let machine = factory("docker", tmp.path(), &runner)
        .new_machine("demo", None)
        .unwrap();
    let pods = machine.get_pods("").await.unwrap();

    assert_eq!(pods, "NAMESPACE   NAME\n");
    let kubeconfig = tmp.path().join("demo").join("kubeconfig");
    assert!(kubeconfig.is_file());
    let calls = runner.calls();
    let get_pods = format!("kubectl --kubeconfig {} get pods -A", kubeconfig.display());
    assert!(position(&calls, "kind get kubeconfig") < position(&calls, &get_pods));
}

#[tokio::test]
async fn test_get_pods_on_absent_machine_is_not_found() {
    let tmp = TempDir::new().unwrap();
    let runner = ScriptedRunner::shared();
    let machine = factory("docker", tmp.path(), &runner)
        .new_machine("demo", None)
        .unwrap();

    let err = machine.get_pods("kube-system").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert!(!runner.called("kubectl"));
}

// ============================================================================
// Factory and listing
// ============================================================================

#[tokio::test]
async fn test_list_scans_state_directory() {
    let tmp = TempDir::new().unwrap();
    for dir in ["beta", "alpha", "Not-A-Machine"] {
        std::fs::create_dir(tmp.path().join(dir)).unwrap();
    }
    std::fs::write(tmp.path().join("notes.txt"), "x").unwrap();
    let runner = ScriptedRunner::shared();

    let factory = factory("docker", tmp.path(), &runner);
    let names: Vec<String> = factory
        .list_machines()
        .unwrap()
        .iter()
        .map(|m| m.name().to_string())
        .collect();
    assert_eq!(names, vec!["alpha", "beta"]);

    let infos = cli::list(factory.as_ref()).await.unwrap();
    assert_eq!(infos.len(), 2);
    assert!(infos.iter().all(|i| i.status == MachineStatus::Absent));
}

#[test]
fn test_unknown_provisioner_fails_construction() {
    let runner = ScriptedRunner::shared();
    for token in ["kvm", "", "DOCKER"] {
        let result = new_machine_factory(token, "/tmp", false, runner.clone());
        assert!(matches!(result, Err(MachineError::UnknownProvisioner(_))));
    }
}

#[test]
fn test_invalid_machine_name_fails_construction() {
    let tmp = TempDir::new().unwrap();
    let runner = ScriptedRunner::shared();
    let result = factory("docker", tmp.path(), &runner).new_machine("../escape", None);
    assert!(matches!(result, Err(MachineError::InvalidName(_))));
}

// ============================================================================
// Vagrant
// ============================================================================

#[test]
fn test_vagrant_rejects_gpus() {
    let tmp = TempDir::new().unwrap();
    let runner = ScriptedRunner::shared();
    let spec = MachineSpec::builder("vm").gpus(1).build().unwrap();
    let result = factory("vagrant", tmp.path(), &runner).new_machine("vm", Some(spec));
    assert!(matches!(result, Err(MachineError::Config(_))));
}

#[tokio::test]
async fn test_vagrant_up_renders_both_files() {
    let tmp = TempDir::new().unwrap();
    let runner = ScriptedRunner::shared();
    let machine = factory("vagrant", tmp.path(), &runner)
        .new_machine("vm", Some(spec("vm")))
        .unwrap();

    assert_eq!(machine.up(false).await.unwrap(), UpOutcome::Created);

    let dir = tmp.path().join("vm");
    assert!(dir.join(KIND_CONFIG_FILE).is_file());
    let vagrantfile = std::fs::read_to_string(dir.join("Vagrantfile")).unwrap();
    assert!(vagrantfile.contains("vb.cpus = 2"));
    assert_eq!(runner.calls(), vec!["vagrant up"]);
    assert_eq!(runner.invocations()[0].cwd.as_deref(), Some(dir.as_path()));
}

#[tokio::test]
async fn test_vagrant_forced_up_reprovisions() {
    let tmp = TempDir::new().unwrap();
    vagrant_project(tmp.path(), "vm");
    let kubeconfig = tmp.path().join("vm").join(KUBECONFIG_FILE);
    std::fs::write(&kubeconfig, "old-cluster-certs").unwrap();
    let runner = ScriptedRunner::shared();
    runner.on("vagrant status", ProcessOutput::success("1,default,state,running\n"));

    let machine = factory("vagrant", tmp.path(), &runner)
        .new_machine("vm", Some(spec("vm")))
        .unwrap();
    assert_eq!(machine.up(false).await.unwrap(), UpOutcome::AlreadyRunning);
    assert!(!runner.called("vagrant up"));

    assert_eq!(machine.up(true).await.unwrap(), UpOutcome::Created);
    assert!(runner.called("vagrant up --provision"));
    assert!(!kubeconfig.exists());
}

#[tokio::test]
async fn test_vagrant_forced_up_of_stopped_vm_reprovisions() {
    let tmp = TempDir::new().unwrap();
    vagrant_project(tmp.path(), "vm");
    let runner = ScriptedRunner::shared();
    runner.on("vagrant status", ProcessOutput::success("1,default,state,poweroff\n"));

    let machine = factory("vagrant", tmp.path(), &runner)
        .new_machine("vm", Some(spec("vm")))
        .unwrap();
    assert_eq!(machine.up(true).await.unwrap(), UpOutcome::Created);
    assert!(runner.called("vagrant up --provision"));
}

#[tokio::test]
async fn test_vagrant_list_skips_directories_without_vagrantfile() {
    let tmp = TempDir::new().unwrap();
    std::fs::create_dir(tmp.path().join("kindbox")).unwrap();
    vagrant_project(tmp.path(), "vm");
    let runner = ScriptedRunner::shared();
    runner.on("vagrant", ProcessOutput::failure(1, "A Vagrant environment is required"));
    runner.on("vagrant status", ProcessOutput::success("1,default,state,poweroff\n"));

    let factory = factory("vagrant", tmp.path(), &runner);
    let infos = cli::list(factory.as_ref()).await.unwrap();

    assert_eq!(infos.len(), 2);
    assert_eq!(infos[0].name, "kindbox");
    assert_eq!(infos[0].status, MachineStatus::Absent);
    assert_eq!(infos[1].status, MachineStatus::Stopped("poweroff".to_string()));
    assert_eq!(runner.calls(), vec!["vagrant status --machine-readable"]);
}

#[tokio::test]
async fn test_vagrant_export_reads_kubeconfig_over_ssh() {
    let tmp = TempDir::new().unwrap();
    vagrant_project(tmp.path(), "vm");
    let runner = ScriptedRunner::shared();
    runner.on("vagrant status", ProcessOutput::success("1,default,state,running\n"));
    runner.on("vagrant ssh", ProcessOutput::success("apiVersion: v1\n"));

    let machine = factory("vagrant", tmp.path(), &runner)
        .new_machine("vm", None)
        .unwrap();
    let target = tmp.path().join("exported").join("config");
    machine.export_kubeconfig(&target, false).await.unwrap();

    assert_eq!(std::fs::read_to_string(&target).unwrap(), "apiVersion: v1\n");
    let ssh = runner
        .invocations()
        .into_iter()
        .find(|i| i.command_line().starts_with("vagrant ssh"))
        .unwrap();
    assert_eq!(ssh.args, vec!["ssh", "-c", "sudo kind get kubeconfig --name vm"]);
    assert_eq!(ssh.cwd.as_deref(), Some(tmp.path().join("vm").as_path()));
}

#[tokio::test]
async fn test_vagrant_destroy_force_flag() {
    let tmp = TempDir::new().unwrap();

    std::fs::create_dir(tmp.path().join("vm")).unwrap();
    let runner = ScriptedRunner::shared();
    let machine = factory("vagrant", tmp.path(), &runner)
        .new_machine("vm", None)
        .unwrap();
    machine.destroy(true).await.unwrap();
    let forced = runner.invocations().pop().unwrap();
    assert_eq!(forced.command_line(), "vagrant destroy -f");
    assert!(!forced.stream);
    assert!(!tmp.path().join("vm").exists());

    std::fs::create_dir(tmp.path().join("vm")).unwrap();
    machine.destroy(false).await.unwrap();
    let prompted = runner.invocations().pop().unwrap();
    assert_eq!(prompted.command_line(), "vagrant destroy");
    assert!(prompted.stream);
}

// ============================================================================
// Plugins
// ============================================================================

struct RecordingPlugin {
    name: &'static str,
    fail: bool,
    applied: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl Plugin for RecordingPlugin {
    fn name(&self) -> String {
        self.name.to_string()
    }

    async fn apply(&self, machine: &dyn MachineCurd) -> MachineResult<()> {
        self.applied
            .lock()
            .unwrap()
            .push(format!("{}@{}", self.name, machine.name()));
        if self.fail {
            return Err(MachineError::Config("manifest rejected".to_string()));
        }
        Ok(())
    }
}

#[tokio::test]
async fn test_plugins_apply_in_order_and_stop_at_first_failure() {
    let tmp = TempDir::new().unwrap();
    let runner = ScriptedRunner::shared();
    let machine = factory("docker", tmp.path(), &runner)
        .new_machine("demo", None)
        .unwrap();

    let applied = Arc::new(Mutex::new(Vec::new()));
    let plugin = |name, fail| {
        Box::new(RecordingPlugin {
            name,
            fail,
            applied: applied.clone(),
        }) as Box<dyn Plugin>
    };
    let plugins = vec![
        plugin("istio", false),
        plugin("kubeflow", true),
        plugin("dashboard", false),
    ];

    let err = apply_plugins(machine.as_ref(), &plugins).await.unwrap_err();

    assert_eq!(
        *applied.lock().unwrap(),
        vec!["istio@demo", "kubeflow@demo"]
    );
    assert_eq!(err.kind(), ErrorKind::Configuration);
    assert!(err.to_string().contains("plugin kubeflow failed"));
}

#[tokio::test]
async fn test_add_applies_manifests_after_up() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().join("machines");
    let first = tmp.path().join("first.yaml");
    let second = tmp.path().join("second.yaml");
    std::fs::write(&first, "kind: List").unwrap();
    std::fs::write(&second, "kind: List").unwrap();

    let runner = ScriptedRunner::shared();
    script_running(&runner, "demo");
    runner.on("kind get kubeconfig", ProcessOutput::success("apiVersion: v1\n"));

    let cli = Cli::try_parse_from([
        "multikf",
        "add",
        "demo",
        "--with-manifest",
        first.to_str().unwrap(),
        "--with-manifest",
        second.to_str().unwrap(),
    ])
    .unwrap();
    let Commands::Add(args) = cli.command else {
        panic!("expected add");
    };

    let factory = factory("docker", &root, &runner);
    let outcome = cli::add(factory.as_ref(), &args, false).await.unwrap();
    assert_eq!(outcome, UpOutcome::Created);

    let calls = runner.calls();
    let create = position(&calls, "kind create cluster --name demo");
    let apply_first = calls
        .iter()
        .position(|c| c.ends_with(&format!("apply -f {}", first.display())))
        .unwrap();
    let apply_second = calls
        .iter()
        .position(|c| c.ends_with(&format!("apply -f {}", second.display())))
        .unwrap();
    assert!(create < apply_first && apply_first < apply_second);
}

#[tokio::test]
async fn test_add_fails_when_manifest_is_rejected() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().join("machines");
    let manifest = tmp.path().join("broken.yaml");
    std::fs::write(&manifest, "kind: List").unwrap();

    let runner = ScriptedRunner::shared();
    script_running(&runner, "demo");
    runner.on("kind get kubeconfig", ProcessOutput::success("apiVersion: v1\n"));
    runner.on("kubectl", ProcessOutput::failure(1, "error validating data"));

    let cli = Cli::try_parse_from([
        "multikf",
        "add",
        "demo",
        "--with-manifest",
        manifest.to_str().unwrap(),
    ])
    .unwrap();
    let Commands::Add(args) = cli.command else {
        panic!("expected add");
    };

    let factory = factory("docker", &root, &runner);
    let err = cli::add(factory.as_ref(), &args, false).await.unwrap_err();

    let message = err.to_string();
    assert!(message.starts_with("install demo: plugin manifest("));
    assert!(message.contains("error validating data"));
    assert!(runner.called("kind create cluster --name demo"));
    assert!(!runner.called("kind delete"));
    assert!(root.join("demo").is_dir());
}
