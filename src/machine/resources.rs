//! Resource facts about hosts and guests
//!
//! Guests report CPU and memory through `nproc` and `/proc/meminfo`, which
//! are parsed here. The host is probed directly with `sysinfo` and, when the
//! `gpu` feature is on, NVML.

use std::fmt;

use serde::Serialize;
use sysinfo::System;

use super::error::{MachineError, MachineResult};

const MIB: f64 = 1024.0 * 1024.0;
const GIB: f64 = MIB * 1024.0;

/// Number of CPUs visible to a host or guest
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CpuInfo {
    num_cpus: u32,
}

impl CpuInfo {
    pub fn new(num_cpus: u32) -> Self {
        Self { num_cpus }
    }

    /// Parse the output of `nproc`
    pub fn parse_nproc(output: &str) -> MachineResult<Self> {
        let text = output.trim();
        text.parse::<u32>()
            .map(Self::new)
            .map_err(|_| MachineError::MalformedOutput {
                origin: "nproc".to_string(),
                reason: format!("expected a cpu count, got '{}'", text),
            })
    }

    pub fn num_cpus(&self) -> u32 {
        self.num_cpus
    }
}

impl fmt::Display for CpuInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.num_cpus)
    }
}

/// Total and free memory, in bytes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MemInfo {
    total_bytes: u64,
    free_bytes: u64,
}

impl MemInfo {
    pub fn from_bytes(total_bytes: u64, free_bytes: u64) -> Self {
        Self {
            total_bytes,
            free_bytes,
        }
    }

    /// Parse a `/proc/meminfo` record.
    ///
    /// Only `MemTotal` and `MemFree` are required; every other line is ignored.
    /// Values are in kB and converted with a factor of 1000.
    pub fn parse(record: &str) -> MachineResult<Self> {
        let mut total = None;
        let mut free = None;

        for line in record.lines() {
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            match key.trim() {
                "MemTotal" => total = Some(parse_kb_as_bytes(value)?),
                "MemFree" => free = Some(parse_kb_as_bytes(value)?),
                _ => {}
            }
        }

        match (total, free) {
            (Some(total), Some(free)) => Ok(Self::from_bytes(total, free)),
            (None, _) => Err(missing_field("MemTotal")),
            (_, None) => Err(missing_field("MemFree")),
        }
    }

    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    pub fn free_bytes(&self) -> u64 {
        self.free_bytes
    }

    /// Total memory, e.g. `0.95 Mib`
    pub fn total(&self) -> String {
        format_memory(self.total_bytes)
    }

    /// Free memory, e.g. `0.07 Mib`
    pub fn free(&self) -> String {
        format_memory(self.free_bytes)
    }
}

/// meminfo's `kB` counts 1000 bytes
fn parse_kb_as_bytes(value: &str) -> MachineResult<u64> {
    let number = value.split_whitespace().next().unwrap_or_default();
    number
        .parse::<u64>()
        .ok()
        .and_then(|kb| kb.checked_mul(1000))
        .ok_or_else(|| MachineError::MalformedOutput {
            origin: "meminfo".to_string(),
            reason: format!("unparsable value '{}'", value.trim()),
        })
}

fn missing_field(field: &str) -> MachineError {
    MachineError::MalformedOutput {
        origin: "meminfo".to_string(),
        reason: format!("missing {}", field),
    }
}

/// Render a byte count with two decimals, in Mib below one Gib and Gib above
pub fn format_memory(bytes: u64) -> String {
    let bytes = bytes as f64;
    if bytes < GIB {
        format!("{:.2} Mib", bytes / MIB)
    } else {
        format!("{:.2} Gib", bytes / GIB)
    }
}

/// GPUs visible to a machine
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GpuInfo {
    devices: Vec<String>,
}

impl GpuInfo {
    pub fn new(devices: Vec<String>) -> Self {
        Self { devices }
    }

    pub fn count(&self) -> usize {
        self.devices.len()
    }

    pub fn devices(&self) -> &[String] {
        &self.devices
    }

    /// Short summary for tables, e.g. `2 x NVIDIA A100` or `none`
    pub fn info(&self) -> String {
        match self.devices.first() {
            None => "none".to_string(),
            Some(first) if self.devices.iter().all(|d| d == first) => {
                format!("{} x {}", self.devices.len(), first)
            }
            Some(_) => self.devices.join(", "),
        }
    }
}

/// A point-in-time view of a machine's resources
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResourceSnapshot {
    pub cpu: CpuInfo,
    pub mem: MemInfo,
}

// ============================================================================
// Host probes
// ============================================================================

/// CPU and memory of the machine this process runs on
pub fn host_snapshot() -> ResourceSnapshot {
    let mut system = System::new();
    system.refresh_cpu_all();
    system.refresh_memory();

    ResourceSnapshot {
        cpu: CpuInfo::new(system.cpus().len() as u32),
        mem: MemInfo::from_bytes(system.total_memory(), system.free_memory()),
    }
}

/// NVIDIA GPUs on the host (requires the `gpu` feature)
#[cfg(feature = "gpu")]
pub fn host_gpus() -> GpuInfo {
    use nvml_wrapper::Nvml;

    let Ok(nvml) = Nvml::init() else {
        return GpuInfo::default();
    };
    let count = nvml.device_count().unwrap_or(0);
    let devices = (0..count)
        .filter_map(|i| nvml.device_by_index(i).ok())
        .filter_map(|device| device.name().ok())
        .collect();
    GpuInfo::new(devices)
}

/// NVIDIA GPUs on the host - always empty when the `gpu` feature is disabled
#[cfg(not(feature = "gpu"))]
pub fn host_gpus() -> GpuInfo {
    GpuInfo::default()
}

/// Warnings for requests that exceed what the host can offer
pub fn capacity_warnings(
    host: &ResourceSnapshot,
    cpus: u32,
    memory_gb: u32,
) -> Vec<String> {
    let mut warnings = Vec::new();

    if host.cpu.num_cpus() > 0 && cpus > host.cpu.num_cpus() {
        warnings.push(format!(
            "requested {} cpus but the host only has {}",
            cpus,
            host.cpu.num_cpus()
        ));
    }

    let requested_bytes = u64::from(memory_gb) * 1024 * 1024 * 1024;
    if host.mem.total_bytes() > 0 && requested_bytes > host.mem.total_bytes() {
        warnings.push(format!(
            "requested {}G of memory but the host only has {}",
            memory_gb,
            host.mem.total()
        ));
    }

    warnings
}
