//! Container Backend
//!
//! This module defines the seam between the scan runner and the
//! container-orchestration CLI that actually executes each scanner.
//!
//! The runner only needs two commands from a backend: one that runs a
//! scanner to completion and one that tears down leftovers from earlier
//! runs. Process wiring (pipes, kill-on-drop) is applied by the runner.

use crate::config::BackendConfig;
use tokio::process::Command;

/// Builds the commands used to drive scanner containers
pub trait ContainerBackend: Send + Sync {
    /// Command that runs `tool` and exits with the tool's status
    fn run_command(&self, tool: &str) -> Command;

    /// Command that removes containers and networks left by earlier runs
    fn cleanup_command(&self) -> Command;

    /// Printable form of the run command (for logs and error messages)
    fn describe(&self, tool: &str) -> String;
}

/// Backend driving `docker-compose` (or any CLI with the same verbs)
///
/// # Example
///
/// ```
/// use xscan::scan::{ComposeBackend, ContainerBackend};
///
/// let backend = ComposeBackend::default();
/// assert_eq!(backend.describe("trivy"), "docker-compose run --rm trivy");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposeBackend {
    program: String,
    run_args: Vec<String>,
    cleanup_args: Vec<String>,
}

impl Default for ComposeBackend {
    fn default() -> Self {
        Self::from_config(&BackendConfig::default())
    }
}

impl ComposeBackend {
    /// Create a backend for `program` with the standard compose verbs
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            ..Default::default()
        }
    }

    pub fn from_config(config: &BackendConfig) -> Self {
        Self {
            program: config.program.clone(),
            run_args: config.run_args.clone(),
            cleanup_args: config.cleanup_args.clone(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

impl ContainerBackend for ComposeBackend {
    fn run_command(&self, tool: &str) -> Command {
        let mut command = Command::new(&self.program);
        command.args(&self.run_args).arg(tool);
        command
    }

    fn cleanup_command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command.args(&self.cleanup_args);
        command
    }

    fn describe(&self, tool: &str) -> String {
        let mut parts = Vec::with_capacity(self.run_args.len() + 2);
        parts.push(self.program.as_str());
        parts.extend(self.run_args.iter().map(String::as_str));
        parts.push(tool);
        parts.join(" ")
    }
}
