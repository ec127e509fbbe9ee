//! Console Output
//!
//! All user-facing output of a scan run goes through a [`Console`]: banners,
//! streamed scanner lines, the summary table and the final panel. A console
//! is created once by the binary and handed to every component that prints,
//! which lets tests capture the exact output in memory.
//!
//! Diagnostic logging goes through `tracing` instead and never through here.

use crate::registry::ToolSpec;
use crate::scan::{OutputLine, ScanReport};
use colored::Colorize;
use std::fmt::Display;
use std::io::{self, Write};
use std::path::Path;
use std::sync::Mutex;
use tabled::builder::Builder;
use tabled::settings::object::{Cell, Columns, Object, Rows};
use tabled::settings::{Alignment, Color, Modify, Style};
use tabled::{Table, Tabled};

const RULE: &str = "═══════════";

/// Summary table row
#[derive(Tabled)]
struct SummaryRow {
    #[tabled(rename = "Tool")]
    tool: String,
    #[tabled(rename = "Status")]
    status: String,
}

/// Tool listing row
#[derive(Tabled)]
struct ToolRow {
    #[tabled(rename = "Tool")]
    tool: &'static str,
    #[tabled(rename = "Description")]
    description: &'static str,
    #[tabled(rename = "Supported Files")]
    file_types: String,
}

#[derive(Debug, Clone, Copy)]
enum Tone {
    Info,
    Good,
    Bad,
}

/// Output sink for everything a scan run shows to the user
pub struct Console {
    out: Mutex<Box<dyn Write + Send>>,
    color: bool,
}

impl Console {
    /// Console writing to standard output
    pub fn stdout(color: bool) -> Self {
        Self::with_writer(io::stdout(), color)
    }

    /// Console writing to an arbitrary sink
    pub fn with_writer<W>(writer: W, color: bool) -> Self
    where
        W: Write + Send + 'static,
    {
        Self {
            out: Mutex::new(Box::new(writer)),
            color,
        }
    }

    pub fn color_enabled(&self) -> bool {
        self.color
    }

    fn emit(&self, text: &str) {
        let mut out = self.out.lock().unwrap_or_else(|e| e.into_inner());
        // A closed stdout is not worth aborting a scan over
        let _ = writeln!(out, "{}", text);
        let _ = out.flush();
    }

    fn paint(&self, text: &str, tone: Tone) -> String {
        if !self.color {
            return text.to_string();
        }
        match tone {
            Tone::Info => text.yellow().to_string(),
            Tone::Good => text.green().to_string(),
            Tone::Bad => text.red().to_string(),
        }
    }

    fn panel(&self, title: &str, body: &[(String, Tone)]) -> String {
        let mut builder = Builder::default();
        builder.push_record([title.to_string()]);
        for (line, _) in body {
            builder.push_record([line.clone()]);
        }

        let mut table = builder.build();
        table.with(Style::rounded());
        if self.color {
            for (index, (_, tone)) in body.iter().enumerate() {
                table.with(Modify::new(Rows::single(index + 1)).with(tone_color(*tone)));
            }
        }
        table.to_string()
    }

    /// Print a plain informational message
    pub fn info(&self, text: impl Display) {
        self.emit(&self.paint(&text.to_string(), Tone::Info));
    }

    /// Print an error message
    pub fn error(&self, text: impl Display) {
        self.emit(&self.paint(&text.to_string(), Tone::Bad));
    }

    /// Print a line without styling
    pub fn plain(&self, text: impl Display) {
        self.emit(&text.to_string());
    }

    /// Panel announcing the tools about to run
    pub fn scan_started(&self, tools: &[String]) {
        let body = [(
            format!("Starting scans for: {}", tools.join(", ")),
            Tone::Info,
        )];
        self.emit(&self.panel("Scan Start", &body));
    }

    /// Banner printed before a scanner is launched
    pub fn tool_started(&self, tool: &str, verbose: bool) {
        let banner = if verbose {
            format!("\n{} Running {} {}", RULE, tool, RULE)
        } else {
            format!("Running {}...", tool)
        };
        self.emit(&self.paint(&banner, Tone::Info));
    }

    /// One line of scanner output; stderr lines are marked as errors
    pub fn output_line(&self, line: &OutputLine) {
        if !line.is_error() {
            self.emit(&format!("  {}", line.text));
        } else if self.color {
            self.emit(&format!("  {}", line.text.red()));
        } else {
            self.emit(&format!("  [stderr] {}", line.text));
        }
    }

    /// Scanner exited unsuccessfully; `code` is `None` when killed by a signal
    pub fn tool_failed(&self, tool: &str, code: Option<i32>) {
        let text = match code {
            Some(code) => format!("\nError: {} exited with code {}", tool, code),
            None => format!("\nError: {} was terminated by a signal", tool),
        };
        self.emit(&self.paint(&text, Tone::Bad));
    }

    /// Scanner could not be run at all
    pub fn tool_error(&self, tool: &str, error: &dyn Display) {
        let text = format!("Error running {}: {}", tool, error);
        self.emit(&self.paint(&text, Tone::Bad));
    }

    pub fn tool_completed(&self, tool: &str) {
        let text = format!("\n{} {} completed {}\n", RULE, tool, RULE);
        self.emit(&self.paint(&text, Tone::Good));
    }

    /// Summary table plus the final results panel
    pub fn summary(&self, report: &ScanReport, output_dir: &Path) {
        let rows: Vec<SummaryRow> = report
            .results()
            .iter()
            .map(|result| SummaryRow {
                tool: result.tool.clone(),
                status: result.status_label().to_string(),
            })
            .collect();

        let mut table = Table::new(rows);
        table
            .with(Style::rounded())
            .with(Modify::new(Columns::single(1)).with(Alignment::center()));
        if self.color {
            table.with(Modify::new(Columns::single(0).not(Rows::single(0))).with(Color::FG_CYAN));
            for (index, result) in report.results().iter().enumerate() {
                let color = if result.success {
                    Color::FG_GREEN
                } else {
                    Color::FG_RED
                };
                table.with(Modify::new(Cell::new(index + 1, 1)).with(color));
            }
        }

        self.emit("\n");
        self.emit("Scan Results Summary");
        self.emit(&table.to_string());

        let location = if output_dir.is_absolute() {
            output_dir.display().to_string()
        } else {
            format!("./{}", output_dir.display())
        };
        let count_tone = if report.all_succeeded() {
            Tone::Good
        } else {
            Tone::Info
        };
        let body = [
            (
                format!(
                    "Completed {}/{} scans successfully!",
                    report.success_count(),
                    report.total()
                ),
                count_tone,
            ),
            (
                format!("Reports available in {} directory", location),
                Tone::Info,
            ),
        ];
        self.emit(&self.panel("Final Results", &body));
    }

    /// Table of every scanner the registry knows about
    pub fn tool_list(&self, tools: &[ToolSpec]) {
        let rows: Vec<ToolRow> = tools
            .iter()
            .map(|tool| ToolRow {
                tool: tool.name,
                description: tool.description,
                file_types: tool.file_types.join(", "),
            })
            .collect();

        let mut table = Table::new(rows);
        table.with(Style::rounded());
        if self.color {
            let columns = [Color::FG_CYAN, Color::FG_GREEN, Color::FG_YELLOW];
            for (index, color) in columns.into_iter().enumerate() {
                let cells = Columns::single(index).intersect(Rows::new(1..));
                table.with(Modify::new(cells).with(color));
            }
        }

        self.emit("Available Scanning Tools");
        self.emit(&table.to_string());
    }
}

fn tone_color(tone: Tone) -> Color {
    match tone {
        Tone::Info => Color::FG_YELLOW,
        Tone::Good => Color::FG_GREEN,
        Tone::Bad => Color::FG_RED,
    }
}
