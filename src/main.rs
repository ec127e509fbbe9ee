// XScan - Main Entry Point
//
// Command-line front end that:
// - lists the supported scanners
// - validates the requested tool list
// - runs each scanner container in turn, streaming its output
// - prints a summary and exits non-zero when any scan failed

use anyhow::Result;
use clap::Parser;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{debug, error};
use xscan::config::Config;
use xscan::console::Console;
use xscan::logging;
use xscan::registry::{self, TOOLS};
use xscan::scan::{ComposeBackend, RunnerConfig, ScanOrchestrator, ToolRunner};

/// Exit code when every requested scan succeeded
const EXIT_OK: u8 = 0;
/// Exit code when at least one scan failed
const EXIT_SCAN_FAILED: u8 = 1;
/// Exit code for usage and configuration errors
const EXIT_USAGE: u8 = 2;

/// XScan: run containerized security scanners
#[derive(Parser, Debug)]
#[command(name = "xscan")]
#[command(author = "XScan Contributors")]
#[command(version = "0.1.0")]
#[command(about = "Run containerized security scanners and summarize the results", long_about = None)]
struct Args {
    /// List available scanning tools
    #[arg(long)]
    list: bool,

    /// Comma-separated list of tools to run (e.g. gitleaks,trivy)
    #[arg(long, conflicts_with = "all")]
    tools: Option<String>,

    /// Run all available tools
    #[arg(long)]
    all: bool,

    /// Stream scanner output while it runs
    #[arg(short, long)]
    verbose: bool,

    /// Path to a configuration file
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

/// What the invocation asks for, once the flags are resolved
#[derive(Debug, PartialEq)]
enum Action {
    List,
    Scan(Vec<String>),
    MissingTools,
}

impl Args {
    fn action(&self) -> Result<Action, xscan::scan::ScanError> {
        if self.list {
            return Ok(Action::List);
        }
        if self.all {
            return Ok(Action::Scan(registry::all_names()));
        }
        match self.tools.as_deref().map(str::trim) {
            Some(list) if !list.is_empty() => registry::parse_tool_list(list).map(Action::Scan),
            _ => Ok(Action::MissingTools),
        }
    }
}

fn load_config(path: Option<&PathBuf>) -> Result<Config> {
    match path {
        Some(path) => Config::load_from_path(path),
        None => Config::load(),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let config = match load_config(args.config.as_ref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            return ExitCode::from(EXIT_USAGE);
        }
    };

    if let Err(e) = logging::init_tracing(&config) {
        eprintln!("Error: {:#}", e);
        return ExitCode::from(EXIT_USAGE);
    }
    debug!(?config, "Configuration loaded");

    let color = config.scan.color && std::io::stdout().is_terminal();
    let console = Arc::new(Console::stdout(color));

    let tools = match args.action() {
        Ok(Action::List) => {
            console.tool_list(TOOLS);
            return ExitCode::from(EXIT_OK);
        }
        Ok(Action::Scan(tools)) => tools,
        Ok(Action::MissingTools) => {
            console.info("Please specify tools using --tools or --all");
            console.plain("Use --list to see available tools");
            return ExitCode::from(EXIT_USAGE);
        }
        Err(e) => {
            error!(error = %e, "Rejected tool list");
            console.error(&e);
            return ExitCode::from(EXIT_USAGE);
        }
    };

    let backend = ComposeBackend::from_config(&config.backend);
    let runner = ToolRunner::with_config(
        backend,
        console,
        RunnerConfig::from_scan_config(&config.scan),
    );
    let report = ScanOrchestrator::new(runner)
        .run_scans(&tools, args.verbose)
        .await;

    if report.all_succeeded() {
        ExitCode::from(EXIT_OK)
    } else {
        ExitCode::from(EXIT_SCAN_FAILED)
    }
}
