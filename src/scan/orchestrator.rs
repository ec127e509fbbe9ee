//! Scan Orchestration
//!
//! Runs a list of scanners one after another and summarizes the outcome.
//! Only one scanner container runs at any time.

use super::backend::ContainerBackend;
use super::report::{ScanReport, ToolResult};
use super::runner::ToolRunner;
use std::process::Stdio;
use tracing::{debug, info};

/// Drives a full scan run on top of a [`ToolRunner`]
pub struct ScanOrchestrator<B> {
    runner: ToolRunner<B>,
}

impl<B: ContainerBackend> ScanOrchestrator<B> {
    pub fn new(runner: ToolRunner<B>) -> Self {
        Self { runner }
    }

    pub fn runner(&self) -> &ToolRunner<B> {
        &self.runner
    }

    /// Tear down containers left over from earlier runs
    ///
    /// Output is discarded and failures are ignored: a missing or broken
    /// orchestration CLI shows up again, per tool, when scanners are run.
    pub async fn reset_environment(&self) {
        let mut command = self.runner.backend().cleanup_command();
        command
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        match command.status().await {
            Ok(status) if status.success() => debug!("Cleaned up leftover containers"),
            Ok(status) => debug!(code = ?status.code(), "Container cleanup exited unsuccessfully"),
            Err(e) => debug!(error = %e, "Container cleanup could not be started"),
        }
    }

    /// Run every tool in order and print the summary
    ///
    /// The report holds exactly one entry per requested tool, in request
    /// order, whatever happened to the individual scans.
    pub async fn run_scans<S: AsRef<str>>(&self, tools: &[S], verbose: bool) -> ScanReport {
        let tools: Vec<String> = tools.iter().map(|t| t.as_ref().to_string()).collect();
        let console = self.runner.console();

        console.scan_started(&tools);
        self.reset_environment().await;

        let mut report = ScanReport::new();
        for tool in &tools {
            let success = self.runner.run_tool(tool, verbose).await;
            report.push(ToolResult::new(tool.as_str(), success));
        }

        let failed: Vec<&str> = report.failed().map(|r| r.tool.as_str()).collect();
        info!(
            succeeded = report.success_count(),
            total = report.total(),
            ?failed,
            "Scan run finished"
        );
        console.summary(&report, &self.runner.config().output_dir);
        report
    }
}
