//! Error taxonomy for machine lifecycle operations

use thiserror::Error;

/// Errors that can occur while specifying, provisioning or inspecting a machine
#[derive(Error, Debug)]
pub enum MachineError {
    #[error("unknown provisioner '{0}' (expected one of: docker, vagrant)")]
    UnknownProvisioner(String),

    #[error("invalid machine name '{0}': use lowercase letters, digits and '-', at most 50 characters")]
    InvalidName(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("{0}")]
    StateConflict(String),

    #[error("machine '{0}' is not running")]
    NotFound(String),

    #[error("failed to execute {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` exited with {}: {}", exit_label(.code), trimmed(.stderr))]
    Backend {
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("malformed output from {origin}: {reason}")]
    MalformedOutput { origin: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("plugin {plugin} failed: {source}")]
    Plugin {
        plugin: String,
        #[source]
        source: Box<MachineError>,
    },

    #[error("{operation} {machine}: {source}")]
    Operation {
        operation: &'static str,
        machine: String,
        #[source]
        source: Box<MachineError>,
    },
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(c) => format!("status {}", c),
        None => "a signal".to_string(),
    }
}

fn trimmed(output: &str) -> &str {
    output.trim()
}

/// Coarse classification of a [`MachineError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Unrecognized provisioner, invalid name, inconsistent specification
    Configuration,
    /// Machine or target file already exists
    StateConflict,
    /// External tool failed to run, exited non-zero, or printed garbage
    Backend,
    /// Operation needs a running machine
    NotFound,
    /// Local filesystem failure
    Io,
}

impl MachineError {
    /// Annotate this error with the lifecycle operation and machine it came from.
    ///
    /// Errors that already carry an annotation are returned unchanged so the
    /// innermost operation name is the one reported.
    pub fn context(self, operation: &'static str, machine: &str) -> Self {
        match self {
            MachineError::Operation { .. } => self,
            other => MachineError::Operation {
                operation,
                machine: machine.to_string(),
                source: Box::new(other),
            },
        }
    }

    /// The underlying error, with any operation annotation stripped
    pub fn root(&self) -> &MachineError {
        match self {
            MachineError::Operation { source, .. } | MachineError::Plugin { source, .. } => {
                source.root()
            }
            other => other,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            MachineError::UnknownProvisioner(_)
            | MachineError::InvalidName(_)
            | MachineError::Config(_) => ErrorKind::Configuration,
            MachineError::StateConflict(_) => ErrorKind::StateConflict,
            MachineError::NotFound(_) => ErrorKind::NotFound,
            MachineError::Spawn { .. }
            | MachineError::Backend { .. }
            | MachineError::MalformedOutput { .. } => ErrorKind::Backend,
            MachineError::Io(_) => ErrorKind::Io,
            MachineError::Operation { source, .. } | MachineError::Plugin { source, .. } => {
                source.kind()
            }
        }
    }
}

/// Result type for machine operations
pub type MachineResult<T> = Result<T, MachineError>;
