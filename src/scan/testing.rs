//! Test backend that runs shell snippets instead of containers

use super::backend::ContainerBackend;
use std::collections::HashMap;
use tokio::process::Command;

/// Exit status compose uses for an unknown service
const UNKNOWN_SERVICE: &str = "echo 'no such service' >&2; exit 127";

#[derive(Debug, Clone)]
pub struct ScriptBackend {
    scripts: HashMap<String, String>,
    cleanup: String,
}

impl ScriptBackend {
    pub fn new() -> Self {
        Self {
            scripts: HashMap::new(),
            cleanup: "true".to_string(),
        }
    }

    /// Run `script` with `sh -c` whenever `tool` is requested
    pub fn tool(mut self, tool: &str, script: &str) -> Self {
        self.scripts.insert(tool.to_string(), script.to_string());
        self
    }

    pub fn cleanup(mut self, script: &str) -> Self {
        self.cleanup = script.to_string();
        self
    }

    fn shell(script: &str) -> Command {
        let mut command = Command::new("sh");
        command.arg("-c").arg(script);
        command
    }
}

impl ContainerBackend for ScriptBackend {
    fn run_command(&self, tool: &str) -> Command {
        let script = self
            .scripts
            .get(tool)
            .map(String::as_str)
            .unwrap_or(UNKNOWN_SERVICE);
        Self::shell(script)
    }

    fn cleanup_command(&self) -> Command {
        Self::shell(&self.cleanup)
    }

    fn describe(&self, tool: &str) -> String {
        format!("sh -c <{} script>", tool)
    }
}
