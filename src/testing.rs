//! Test double for [`ProcessRunner`]
//!
//! `ScriptedRunner` answers invocations from a list of rules keyed by command
//! line prefix and records every invocation it sees. Unmatched invocations
//! succeed with empty output.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::machine::error::MachineResult;
use crate::process::{Invocation, ProcessOutput, ProcessRunner};

#[derive(Debug, Default)]
struct Script {
    rules: Vec<(String, ProcessOutput)>,
    invocations: Vec<Invocation>,
}

/// A [`ProcessRunner`] that replays canned outputs
#[derive(Debug, Default)]
pub struct ScriptedRunner {
    script: Mutex<Script>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Answer invocations whose command line starts with `prefix`.
    ///
    /// Later rules take precedence over earlier ones.
    pub fn on(&self, prefix: impl Into<String>, output: ProcessOutput) -> &Self {
        self.lock().rules.push((prefix.into(), output));
        self
    }

    /// Every invocation seen so far, in order
    pub fn invocations(&self) -> Vec<Invocation> {
        self.lock().invocations.clone()
    }

    /// Command lines of every invocation seen so far, in order
    pub fn calls(&self) -> Vec<String> {
        self.lock()
            .invocations
            .iter()
            .map(Invocation::command_line)
            .collect()
    }

    /// Whether any invocation's command line starts with `prefix`
    pub fn called(&self, prefix: &str) -> bool {
        self.calls().iter().any(|call| call.starts_with(prefix))
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl ProcessRunner for ScriptedRunner {
    async fn run(&self, invocation: &Invocation) -> MachineResult<ProcessOutput> {
        let command_line = invocation.command_line();
        let mut script = self.lock();
        script.invocations.push(invocation.clone());
        Ok(script
            .rules
            .iter()
            .rev()
            .find(|(prefix, _)| command_line.starts_with(prefix.as_str()))
            .map(|(_, output)| output.clone())
            .unwrap_or_else(|| ProcessOutput::success("")))
    }
}
