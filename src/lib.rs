//! multikf: disposable Kubernetes clusters on a developer workstation
//!
//! Machines are kind clusters, either in docker containers or inside a
//! Vagrant VM, managed through one lifecycle contract
//! ([`machine::MachineCurd`]) and recorded on disk under a root directory.

pub mod cli;
pub mod config;
pub mod k8s;
pub mod machine;
pub mod plugins;
pub mod process;
pub mod template;
pub mod testing;
