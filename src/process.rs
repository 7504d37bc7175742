//! External tool invocation
//!
//! Every backend talks to its native tool (`kind`, `docker`, `vagrant`,
//! `kubectl`) through the [`ProcessRunner`] capability so lifecycle code can be
//! exercised against a scripted double instead of real binaries.

use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::machine::error::{MachineError, MachineResult};

/// A single command to run: program, arguments, working directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    /// Attach the tool to this terminal instead of capturing its output
    pub stream: bool,
}

impl Invocation {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            stream: false,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    pub fn streaming(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }

    /// Human-readable command line, used in logs and error messages
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// What a finished process left behind
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    /// Exit code, `None` when killed by a signal
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            code: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn failure(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.code == Some(0)
    }

    /// Turn a non-zero exit into a [`MachineError::Backend`] carrying the
    /// tool's own diagnostics.
    pub fn check(self, invocation: &Invocation) -> MachineResult<Self> {
        if self.is_success() {
            return Ok(self);
        }
        let stderr = if self.stderr.trim().is_empty() {
            self.stdout
        } else {
            self.stderr
        };
        Err(MachineError::Backend {
            command: invocation.command_line(),
            code: self.code,
            stderr,
        })
    }
}

/// Capability to run external tools
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    /// Run the invocation to completion.
    ///
    /// A non-zero exit is reported through [`ProcessOutput::code`], not as an
    /// error; only a failure to start the process is an error.
    async fn run(&self, invocation: &Invocation) -> MachineResult<ProcessOutput>;

    /// Run and require a zero exit code
    async fn run_checked(&self, invocation: &Invocation) -> MachineResult<ProcessOutput> {
        self.run(invocation).await?.check(invocation)
    }
}

/// Runs tools as real child processes
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioProcessRunner;

#[async_trait]
impl ProcessRunner for TokioProcessRunner {
    async fn run(&self, invocation: &Invocation) -> MachineResult<ProcessOutput> {
        debug!("Running: {}", invocation.command_line());

        let mut cmd = Command::new(&invocation.program);
        cmd.args(&invocation.args);
        if let Some(dir) = &invocation.cwd {
            cmd.current_dir(dir);
        }

        let spawn_error = |e: std::io::Error| MachineError::Spawn {
            program: invocation.program.clone(),
            source: e,
        };

        if invocation.stream {
            let status = cmd
                .stdin(Stdio::inherit())
                .stdout(Stdio::inherit())
                .stderr(Stdio::inherit())
                .status()
                .await
                .map_err(spawn_error)?;
            return Ok(ProcessOutput {
                code: status.code(),
                ..Default::default()
            });
        }

        let output = cmd
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(spawn_error)?;

        Ok(ProcessOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_line() {
        let inv = Invocation::new("kind")
            .args(["create", "cluster"])
            .arg("--name")
            .arg("demo");
        assert_eq!(inv.command_line(), "kind create cluster --name demo");
        assert!(!inv.stream);
        assert!(inv.cwd.is_none());
    }

    #[test]
    fn test_check_prefers_stderr() {
        let inv = Invocation::new("kind").arg("version");
        let err = ProcessOutput::failure(2, "boom").check(&inv).unwrap_err();
        assert!(err.to_string().contains("boom"));
        assert!(err.to_string().contains("status 2"));
    }

    #[test]
    fn test_check_falls_back_to_stdout() {
        let inv = Invocation::new("vagrant").arg("up");
        let output = ProcessOutput {
            code: Some(1),
            stdout: "box not found".to_string(),
            stderr: String::new(),
        };
        let err = output.check(&inv).unwrap_err();
        assert!(err.to_string().contains("box not found"));
    }

    #[tokio::test]
    async fn test_missing_program_is_spawn_error() {
        let inv = Invocation::new("multikf-definitely-not-installed");
        let result = TokioProcessRunner.run(&inv).await;
        assert!(matches!(result, Err(MachineError::Spawn { .. })));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_captures_stdout_and_exit_code() {
        let output = TokioProcessRunner
            .run(&Invocation::new("sh").args(["-c", "echo hello; exit 3"]))
            .await
            .unwrap();
        assert_eq!(output.code, Some(3));
        assert_eq!(output.stdout.trim(), "hello");
    }
}
