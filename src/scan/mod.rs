//! Scan Execution Subsystem
//!
//! This module runs containerized security scanners and streams their output
//! live while they run.
//!
//! # Architecture
//!
//! The module is organized into:
//! - `stream.rs`: reads one output pipe, filters noise, forwards lines
//! - `backend.rs`: builds the orchestration CLI commands
//! - `runner.rs`: runs one scanner with both pipes streamed concurrently
//! - `orchestrator.rs`: runs scanners one after another and summarizes
//! - `report.rs`: per-tool results
//!
//! Scanners never run in parallel. Within one scanner run, the stdout and
//! stderr readers run as separate tasks next to the runner's wait loop.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use xscan::console::Console;
//! use xscan::scan::{ComposeBackend, ScanOrchestrator, ToolRunner};
//!
//! #[tokio::main]
//! async fn main() {
//!     let console = Arc::new(Console::stdout(true));
//!     let runner = ToolRunner::new(ComposeBackend::default(), console);
//!     let orchestrator = ScanOrchestrator::new(runner);
//!
//!     let report = orchestrator.run_scans(&["gitleaks", "trivy"], false).await;
//!     println!("{}/{} passed", report.success_count(), report.total());
//! }
//! ```

mod backend;
mod error;
mod orchestrator;
mod report;
mod runner;
pub mod stream;

#[cfg(test)]
pub(crate) mod testing;

pub use backend::{ComposeBackend, ContainerBackend};
pub use error::{ScanError, ScanResult};
pub use orchestrator::ScanOrchestrator;
pub use report::{ScanReport, ToolResult};
pub use runner::{RunnerConfig, ToolRunner};
pub use stream::{
    decode_line, LineStreamer, MalformedLine, NoiseFilter, OutputLine, StreamEvent, StreamSource,
};
