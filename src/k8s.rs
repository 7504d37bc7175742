//! Kubernetes node images
//!
//! A cluster node is pinned to a `kindest/node` image by version *and* digest,
//! so a tag that gets re-pushed upstream never changes what a machine boots.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::machine::error::{MachineError, MachineResult};

/// Image repository for kind node images
pub const NODE_IMAGE_REPOSITORY: &str = "kindest/node";

/// Known node versions and their image digests, newest first
pub const KNOWN_VERSIONS: &[(&str, &str)] = &[
    (
        "v1.27.3",
        "3966ac761ae0136263ffdb6cfd4db23ef8a83cba8a463690e98317add2c9ba72",
    ),
    (
        "v1.26.6",
        "6e2d8b28a5b601defe327b98bd1c2d1930b49e5d8c512e1895099e4504007adb",
    ),
    (
        "v1.25.11",
        "227fa11ce74ea76a0474eeefb84cb75d8dad1b08638371ecf0e86259b35be0c8",
    ),
    (
        "v1.24.15",
        "7db4f8bea3e14b82d12e044e25e34bd53754b7f2b0e9d56df21774e6f66a70ab",
    ),
    (
        "v1.23.17",
        "e5fd1d9cd7a9a50939f9c005684df5a6d145e8d695e78463637b79464292e66c",
    ),
    (
        "v1.23.12",
        "9402cf1330bbd3a0d097d2033fa489b2abe40d479cc5ef47d0b6a6960613148a",
    ),
];

/// Version used when none is requested
pub const DEFAULT_VERSION: &str = "v1.25.11";

fn version_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^v\d+\.\d+\.\d+$").expect("static regex"))
}

fn digest_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[0-9a-f]{64}$").expect("static regex"))
}

/// A verified (version, sha256 digest) pair for a node image
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeVersion {
    version: String,
    sha256: String,
}

impl NodeVersion {
    /// Pair a version with its digest.
    ///
    /// A missing `v` prefix is added and a `sha256:` prefix on the digest is
    /// accepted. Known versions must carry their published digest.
    pub fn new(version: &str, sha256: &str) -> MachineResult<Self> {
        let version = if version.starts_with('v') {
            version.to_string()
        } else {
            format!("v{}", version)
        };
        let sha256 = sha256
            .strip_prefix("sha256:")
            .unwrap_or(sha256)
            .to_ascii_lowercase();

        if !version_pattern().is_match(&version) {
            return Err(MachineError::Config(format!(
                "kubernetes version '{}' is not of the form v<major>.<minor>.<patch>",
                version
            )));
        }
        if !digest_pattern().is_match(&sha256) {
            return Err(MachineError::Config(format!(
                "image digest for {} must be 64 hex characters",
                version
            )));
        }
        if let Some(expected) = known_digest(&version) {
            if expected != sha256 {
                return Err(MachineError::Config(format!(
                    "digest {} does not match the published image for {} (expected {})",
                    sha256, version, expected
                )));
            }
        }

        Ok(Self { version, sha256 })
    }

    /// Look up a known version by name
    pub fn known(version: &str) -> MachineResult<Self> {
        let digest = known_digest(version).ok_or_else(|| {
            MachineError::Config(format!(
                "unknown kubernetes version '{}', supported: {}",
                version,
                list_versions().join(",")
            ))
        })?;
        Self::new(version, digest)
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn sha256(&self) -> &str {
        &self.sha256
    }

    /// Fully pinned image reference
    pub fn image(&self) -> String {
        format!(
            "{}:{}@sha256:{}",
            NODE_IMAGE_REPOSITORY, self.version, self.sha256
        )
    }
}

impl Default for NodeVersion {
    fn default() -> Self {
        let digest = known_digest(DEFAULT_VERSION).unwrap_or_default();
        Self {
            version: DEFAULT_VERSION.to_string(),
            sha256: digest.to_string(),
        }
    }
}

impl fmt::Display for NodeVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.version)
    }
}

fn known_digest(version: &str) -> Option<&'static str> {
    KNOWN_VERSIONS
        .iter()
        .find(|(v, _)| *v == version)
        .map(|(_, digest)| *digest)
}

/// Names of all known versions
pub fn list_versions() -> Vec<&'static str> {
    KNOWN_VERSIONS.iter().map(|(v, _)| *v).collect()
}
