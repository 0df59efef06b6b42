//! Shared fixtures for integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use rig_acp_installer::process::{CommandOutput, CommandRunner, ProcessError, StructuredCommand};
use std::sync::Mutex;
use std::time::Duration;

type Handler = dyn Fn(&StructuredCommand) -> Result<CommandOutput, ProcessError> + Send + Sync;

/// A [`CommandRunner`] that answers from a closure and records every
/// command line it was asked to run.
pub struct ScriptedRunner {
    handler: Box<Handler>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedRunner {
    pub fn new(
        handler: impl Fn(&StructuredCommand) -> Result<CommandOutput, ProcessError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            handler: Box::new(handler),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Every command fails as if npm were not installed.
    pub fn without_npm() -> Self {
        Self::new(|cmd| {
            Err(ProcessError::NotFound {
                program: cmd.program.clone(),
            })
        })
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CommandRunner for ScriptedRunner {
    async fn run(
        &self,
        command: &StructuredCommand,
        _limit: Duration,
    ) -> Result<CommandOutput, ProcessError> {
        self.calls.lock().unwrap().push(command.to_string());
        (self.handler)(command)
    }
}

/// Whether `cmd` is npm invoked with `args` as its leading arguments.
pub fn is_npm(cmd: &StructuredCommand, args: &[&str]) -> bool {
    cmd.program == "npm" && cmd.args.len() >= args.len() && cmd.args[..args.len()] == *args
}
