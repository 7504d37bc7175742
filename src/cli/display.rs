//! Display formatting for CLI output
//!
//! SBIO pattern: Pure functions that format data for display

use crate::k8s::list_versions;
use crate::machine::MachineInfo;

// ============================================================================
// Table formatting helpers
// ============================================================================

/// Format a simple table with headers and rows
pub fn format_table(headers: &[&str], rows: Vec<Vec<String>>) -> String {
    if rows.is_empty() {
        return "No machines found.\n".to_string();
    }

    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in &rows {
        for (i, cell) in row.iter().enumerate() {
            if i < widths.len() {
                widths[i] = widths[i].max(cell.len());
            }
        }
    }

    let mut output = String::new();
    push_row(
        &mut output,
        headers.iter().map(|h| h.to_uppercase()),
        &widths,
    );
    for row in rows {
        push_row(&mut output, row.into_iter(), &widths);
    }
    output
}

fn push_row(output: &mut String, cells: impl Iterator<Item = String>, widths: &[usize]) {
    let mut line = String::new();
    for (i, cell) in cells.enumerate() {
        if i > 0 {
            line.push_str("   ");
        }
        match widths.get(i) {
            Some(width) => line.push_str(&format!("{:width$}", cell, width = width)),
            None => line.push_str(&cell),
        }
    }
    output.push_str(line.trim_end());
    output.push('\n');
}

// ============================================================================
// Machine display
// ============================================================================

/// Format machines as a table, in the order given
pub fn format_machine_list(machines: &[MachineInfo]) -> String {
    let headers = &["NAME", "DIR", "STATUS", "GPUS", "KUBEAPI", "CPUS", "MEMORY"];
    let rows: Vec<Vec<String>> = machines
        .iter()
        .map(|m| {
            let (cpus, memory) = match &m.resources {
                Some(r) => (
                    r.cpu.to_string(),
                    format!("{}/{}", r.mem.free(), r.mem.total()),
                ),
                None => ("-".to_string(), "-".to_string()),
            };
            vec![
                m.name.clone(),
                m.host_dir.display().to_string(),
                m.status.to_string(),
                m.gpu
                    .as_ref()
                    .map(|g| g.info())
                    .unwrap_or_else(|| "-".to_string()),
                m.kube_api.clone().unwrap_or_else(|| "-".to_string()),
                cpus,
                memory,
            ]
        })
        .collect();

    format_table(headers, rows)
}

/// Format machines as pretty-printed JSON
pub fn format_machine_json(machines: &[MachineInfo]) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(machines)
}

/// Format the `version` command output
pub fn format_version() -> String {
    let mut output = String::new();
    output.push_str(&format!("multikf {}\n", env!("CARGO_PKG_VERSION")));
    output.push_str("Kubernetes versions:\n");
    for version in list_versions() {
        output.push_str(&format!("  {}\n", version));
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::machine::resources::{CpuInfo, GpuInfo, MemInfo, ResourceSnapshot};
    use crate::machine::{MachineStatus, Provisioner};
    use std::path::PathBuf;

    fn info(name: &str, status: MachineStatus) -> MachineInfo {
        MachineInfo {
            name: name.to_string(),
            provisioner: Provisioner::Docker,
            host_dir: PathBuf::from(format!(".multikfdir/{}", name)),
            status,
            resources: None,
            gpu: None,
            kube_api: None,
            kubeconfig: None,
        }
    }

    #[test]
    fn test_format_table_empty() {
        assert_eq!(format_table(&["NAME"], vec![]), "No machines found.\n");
    }

    #[test]
    fn test_format_table_aligns_columns() {
        let output = format_table(
            &["name", "status"],
            vec![
                vec!["a".to_string(), "running".to_string()],
                vec!["longer".to_string(), "x".to_string()],
            ],
        );
        let lines: Vec<_> = output.lines().collect();
        assert_eq!(lines[0], "NAME     STATUS");
        assert_eq!(lines[1], "a        running");
        assert_eq!(lines[2], "longer   x");
    }

    #[test]
    fn test_format_machine_list() {
        let mut running = info("demo", MachineStatus::Running);
        running.resources = Some(ResourceSnapshot {
            cpu: CpuInfo::new(4),
            mem: MemInfo::from_bytes(1_000_000, 70_000),
        });
        running.gpu = Some(GpuInfo::default());
        running.kube_api = Some("https://0.0.0.0:6443".to_string());

        let output = format_machine_list(&[running, info("gone", MachineStatus::Absent)]);
        let lines: Vec<_> = output.lines().collect();
        assert!(lines[0].starts_with("NAME"));
        assert!(lines[1].contains("running"));
        assert!(lines[1].contains("0.07 Mib/0.95 Mib"));
        assert!(lines[1].contains("https://0.0.0.0:6443"));
        assert!(lines[2].contains("not found"));
    }

    #[test]
    fn test_format_machine_json() {
        let json = format_machine_json(&[info("demo", MachineStatus::Stopped("exited".into()))])
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value[0]["name"], "demo");
        assert_eq!(value[0]["status"], "exited");
        assert_eq!(value[0]["provisioner"], "docker");
        assert!(value[0].get("resources").is_none());
    }

    #[test]
    fn test_format_version() {
        let output = format_version();
        assert!(output.starts_with("multikf "));
        assert!(output.contains("v1.25.11"));
    }
}
