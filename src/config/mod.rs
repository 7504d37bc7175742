use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::machine::error::MachineError;
use crate::machine::Provisioner;

/// Root directory for machine state when none is configured
pub const DEFAULT_ROOT_DIR: &str = ".multikfdir";

/// Default config file location: ~/.multikf/config
pub fn default_config_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".multikf")
        .join("config")
}

/// Errors that can occur while loading or resolving configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to parse config: {0}")]
    ParseError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error(transparent)]
    Invalid(#[from] MachineError),
}

/// The configuration file structure
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Config {
    /// Backend token: `docker` or `vagrant`
    #[serde(default = "default_provisioner")]
    pub provisioner: String,

    /// Directory holding one sub-directory per machine; `~` is expanded
    #[serde(default = "default_root_dir")]
    pub root_dir: String,

    /// Stream native tool output to the terminal
    #[serde(default = "default_verbose")]
    pub verbose: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            provisioner: default_provisioner(),
            root_dir: default_root_dir(),
            verbose: default_verbose(),
        }
    }
}

fn default_provisioner() -> String {
    Provisioner::default().to_string()
}

fn default_root_dir() -> String {
    DEFAULT_ROOT_DIR.to_string()
}

fn default_verbose() -> bool {
    true
}

/// Values given on the command line; each one beats the file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overrides {
    pub provisioner: Option<String>,
    pub root_dir: Option<String>,
    pub verbose: Option<bool>,
}

/// Settings for one invocation, resolved once and never mutated
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    pub provisioner: Provisioner,
    pub root_dir: PathBuf,
    pub verbose: bool,
}

// ============================================================================
// SBIO: Pure business logic (no I/O)
// ============================================================================

/// Parse config from YAML string
pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    if content.trim().is_empty() {
        return Ok(Config::default());
    }
    serde_yaml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
}

/// Expand a leading `~` (and `~user`) in a path
pub fn expand_path(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).into_owned())
}

impl RuntimeConfig {
    /// Merge the file with command line overrides.
    ///
    /// An unknown provisioner token is an error, wherever it came from.
    pub fn resolve(config: &Config, overrides: &Overrides) -> Result<Self, ConfigError> {
        let provisioner = overrides
            .provisioner
            .as_deref()
            .unwrap_or(&config.provisioner)
            .parse::<Provisioner>()?;
        let root_dir = expand_path(overrides.root_dir.as_deref().unwrap_or(&config.root_dir));
        let verbose = overrides.verbose.unwrap_or(config.verbose);

        Ok(Self {
            provisioner,
            root_dir,
            verbose,
        })
    }
}

// ============================================================================
// I/O boundary functions
// ============================================================================

/// Load config from a specific path; a missing file yields the defaults
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Ok(Config::default());
    }
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}
