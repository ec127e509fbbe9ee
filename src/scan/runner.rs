//! Tool Runner
//!
//! This module launches one scanner through the container backend and
//! streams its output while it runs.
//!
//! Each invocation owns two reader tasks (stdout and stderr) and waits on
//! both channels and the process exit at the same time, so neither stream
//! can starve the other and nothing spins while the scanner is quiet. The
//! reader tasks and the child process never outlive the call: readers are
//! joined (or aborted on an error path) and the child is killed if it is
//! still running when the call returns.
//!
//! Once the process has exited, the runner keeps forwarding lines only while
//! they keep coming. After a quiet period it stops waiting for the end of
//! the streams, so a background process that inherited the pipes cannot
//! hold the call open.

use super::backend::ContainerBackend;
use super::error::{ScanError, ScanResult};
use super::stream::{LineStreamer, NoiseFilter, StreamEvent, StreamSource};
use crate::config::ScanConfig;
use crate::console::Console;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::process::Child;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio::time;
use tracing::{debug, info, warn};

/// Default number of buffered lines per stream
const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// Default quiet period after exit before unfinished streams are abandoned
const DEFAULT_DRAIN_GRACE: Duration = Duration::from_millis(500);

/// Configuration for running scanners
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerConfig {
    /// Directory created before every run (default: `reports`)
    pub output_dir: PathBuf,

    /// Lines dropped before display
    pub noise_filter: NoiseFilter,

    /// Buffered lines per stream (default: 1024)
    pub channel_capacity: usize,

    /// How long to wait for more output once the process has exited
    /// (default: 500ms, restarted by every line)
    pub drain_grace: Duration,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("reports"),
            noise_filter: NoiseFilter::default(),
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            drain_grace: DEFAULT_DRAIN_GRACE,
        }
    }
}

impl RunnerConfig {
    pub fn from_scan_config(config: &ScanConfig) -> Self {
        Self {
            output_dir: config.output_dir.clone(),
            noise_filter: NoiseFilter::new(config.noise_filter.iter().cloned()),
            channel_capacity: config.channel_capacity,
            ..Default::default()
        }
    }

    /// Create a runner config writing into `dir`
    pub fn with_output_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: dir.into(),
            ..Default::default()
        }
    }
}

/// Child process that is killed when dropped unless it already exited
struct ScannerProcess {
    child: Child,
    exited: bool,
}

impl ScannerProcess {
    fn new(child: Child) -> Self {
        Self {
            child,
            exited: false,
        }
    }

    /// Best-effort kill; errors are only logged
    fn terminate(&mut self) {
        if self.exited {
            return;
        }
        match self.child.start_kill() {
            Ok(()) => debug!("Terminated scanner process"),
            Err(e) => debug!(error = %e, "Failed to terminate scanner process"),
        }
        self.exited = true;
    }
}

impl Drop for ScannerProcess {
    fn drop(&mut self) {
        self.terminate();
    }
}

/// Runs one scanner at a time and reports success or failure
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use xscan::console::Console;
/// use xscan::scan::{ComposeBackend, ToolRunner};
///
/// #[tokio::main]
/// async fn main() {
///     let console = Arc::new(Console::stdout(true));
///     let runner = ToolRunner::new(ComposeBackend::default(), console);
///
///     let passed = runner.run_tool("gitleaks", true).await;
///     println!("gitleaks passed: {}", passed);
/// }
/// ```
pub struct ToolRunner<B> {
    backend: B,
    console: Arc<Console>,
    config: RunnerConfig,
}

impl<B: ContainerBackend> ToolRunner<B> {
    /// Create a runner with default configuration
    pub fn new(backend: B, console: Arc<Console>) -> Self {
        Self::with_config(backend, console, RunnerConfig::default())
    }

    pub fn with_config(backend: B, console: Arc<Console>, config: RunnerConfig) -> Self {
        Self {
            backend,
            console,
            config,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn console(&self) -> &Arc<Console> {
        &self.console
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Run `tool` to completion
    ///
    /// Returns `true` only when the scanner exited with status 0. Spawn
    /// failures, non-zero exits and deaths by signal all yield `false`; no
    /// error escapes this call.
    pub async fn run_tool(&self, tool: &str, verbose: bool) -> bool {
        let start = Instant::now();

        match self.execute(tool, verbose).await {
            Ok(status) if status.success() => {
                info!(tool, elapsed_ms = start.elapsed().as_millis() as u64, "Scanner succeeded");
                if verbose {
                    self.console.tool_completed(tool);
                }
                true
            }
            Ok(status) => {
                info!(
                    tool,
                    code = ?status.code(),
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "Scanner failed"
                );
                if verbose {
                    self.console.tool_failed(tool, status.code());
                }
                false
            }
            Err(e) => {
                warn!(tool, error = %e, "Scanner could not be run");
                self.console.tool_error(tool, &e);
                false
            }
        }
    }

    async fn execute(&self, tool: &str, verbose: bool) -> ScanResult<ExitStatus> {
        let output_dir = &self.config.output_dir;
        tokio::fs::create_dir_all(output_dir)
            .await
            .map_err(|source| ScanError::OutputDir {
                path: output_dir.clone(),
                source,
            })?;

        self.console.tool_started(tool, verbose);

        let command_line = self.backend.describe(tool);
        debug!(tool, command = %command_line, "Spawning scanner");

        let mut command = self.backend.run_command(tool);
        command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let child = command.spawn().map_err(|source| ScanError::Spawn {
            command: command_line,
            source,
        })?;

        let mut process = ScannerProcess::new(child);
        let result = self.supervise(&mut process, verbose).await;
        process.terminate();
        result
    }

    /// Stream both pipes until the process exited and its output went quiet
    ///
    /// Normally this ends when the exit status and both end-of-stream
    /// sentinels are in. If the pipes stay open after exit (held by a
    /// background process) and nothing arrives for `drain_grace`, the
    /// readers are aborted instead.
    async fn supervise(
        &self,
        process: &mut ScannerProcess,
        verbose: bool,
    ) -> ScanResult<ExitStatus> {
        let stdout = process
            .child
            .stdout
            .take()
            .ok_or(ScanError::MissingPipe("stdout"))?;
        let stderr = process
            .child
            .stderr
            .take()
            .ok_or(ScanError::MissingPipe("stderr"))?;

        let capacity = self.config.channel_capacity.max(1);
        let (stdout_tx, mut stdout_rx) = mpsc::channel(capacity);
        let (stderr_tx, mut stderr_rx) = mpsc::channel(capacity);

        // Dropping the set aborts whatever is still running
        let mut readers = JoinSet::new();
        readers.spawn(
            LineStreamer::new(
                StreamSource::Stdout,
                self.config.noise_filter.clone(),
                stdout_tx,
            )
            .stream(stdout),
        );
        readers.spawn(
            LineStreamer::new(
                StreamSource::Stderr,
                self.config.noise_filter.clone(),
                stderr_tx,
            )
            .stream(stderr),
        );

        let mut stdout_done = false;
        let mut stderr_done = false;
        let mut status: Option<ExitStatus> = None;
        // Set once the process exited; pushed back by every line after that
        let mut quiet_deadline: Option<time::Instant> = None;
        let grace = self.config.drain_grace;

        let exit = loop {
            if stdout_done && stderr_done {
                if let Some(exit) = status {
                    break exit;
                }
            }

            let deadline = quiet_deadline.unwrap_or_else(time::Instant::now);
            tokio::select! {
                event = stdout_rx.recv(), if !stdout_done => {
                    stdout_done = self.handle_event(event, verbose);
                    if status.is_some() {
                        quiet_deadline = Some(time::Instant::now() + grace);
                    }
                }
                event = stderr_rx.recv(), if !stderr_done => {
                    stderr_done = self.handle_event(event, verbose);
                    if status.is_some() {
                        quiet_deadline = Some(time::Instant::now() + grace);
                    }
                }
                waited = process.child.wait(), if status.is_none() => {
                    let exit = waited.map_err(ScanError::Wait)?;
                    process.exited = true;
                    debug!(code = ?exit.code(), "Scanner process exited");
                    status = Some(exit);
                    quiet_deadline = Some(time::Instant::now() + grace);
                }
                _ = time::sleep_until(deadline), if quiet_deadline.is_some() => {
                    if let Some(exit) = status {
                        debug!(
                            stdout_done,
                            stderr_done,
                            "Output pipes still open after exit, abandoning readers"
                        );
                        break exit;
                    }
                }
            }
        };

        if stdout_done && stderr_done {
            while let Some(joined) = readers.join_next().await {
                match joined {
                    Ok(lines) => debug!(lines, "Reader task finished"),
                    Err(e) => warn!(error = %e, "Reader task did not finish cleanly"),
                }
            }
        } else {
            readers.shutdown().await;
        }

        Ok(exit)
    }

    /// Show one event; returns true once the stream has ended
    fn handle_event(&self, event: Option<StreamEvent>, verbose: bool) -> bool {
        match event {
            Some(StreamEvent::Line(line)) => {
                if verbose {
                    self.console.output_line(&line);
                }
                false
            }
            Some(StreamEvent::End(source)) => {
                debug!(stream = %source, "End of stream");
                true
            }
            // Reader went away without its sentinel
            None => true,
        }
    }
}
