// Configuration File Support
//
// This module provides configuration file parsing for xscan.
// Supports TOML format with environment variable overrides.
// Configuration files are loaded from the XDG config directory: ~/.config/xscan/config.toml

use crate::scan::stream::DEFAULT_NOISE_PATTERNS;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Logging configuration
    pub logging: LoggingConfig,

    /// Orchestration CLI configuration
    pub backend: BackendConfig,

    /// Scan behaviour
    pub scan: ScanConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (json, pretty, compact)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            format: "compact".to_string(),
        }
    }
}

/// Container-orchestration CLI configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BackendConfig {
    /// Program to invoke (e.g., "docker-compose")
    pub program: String,

    /// Arguments placed before the tool name when running a scanner
    pub run_args: Vec<String>,

    /// Arguments for tearing down leftovers before a scan run
    pub cleanup_args: Vec<String>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            program: "docker-compose".to_string(),
            run_args: vec!["run".to_string(), "--rm".to_string()],
            cleanup_args: vec!["down".to_string(), "--remove-orphans".to_string()],
        }
    }
}

/// Scan configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ScanConfig {
    /// Directory the scanners write their reports into
    pub output_dir: PathBuf,

    /// Lines containing any of these substrings are not shown
    pub noise_filter: Vec<String>,

    /// Buffered lines per output stream
    pub channel_capacity: usize,

    /// Whether console output is colored (only when stdout is a terminal)
    pub color: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("reports"),
            noise_filter: DEFAULT_NOISE_PATTERNS.iter().map(|p| p.to_string()).collect(),
            channel_capacity: 1024,
            color: true,
        }
    }
}

impl Config {
    /// Load configuration from the default XDG config directory
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed.
    /// If the config file does not exist, returns default configuration.
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();
        Self::load_from_path(&config_path)
    }

    /// Load configuration from a specific path
    ///
    /// Environment overrides are applied whether or not the file exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed, or if
    /// the resulting configuration is invalid.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let config = if path.exists() {
            let content = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file from {:?}", path))?;

            let config: Config = toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file from {:?}", path))?;

            tracing::info!("Loaded configuration from {:?}", path);
            config
        } else {
            tracing::debug!("Config file not found at {:?}, using defaults", path);
            Self::default()
        };

        let config = config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path
    ///
    /// Returns `~/.config/xscan/config.toml` on Linux
    pub fn config_path() -> PathBuf {
        if let Some(proj_dirs) = directories::ProjectDirs::from("com", "xscan", "xscan") {
            proj_dirs.config_dir().join("config.toml")
        } else {
            // Fallback if XDG dirs cannot be determined
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
            PathBuf::from(home).join(".config").join("xscan").join("config.toml")
        }
    }

    /// Apply environment variable overrides to the configuration
    ///
    /// Environment variables take precedence over config file values:
    /// - XSCAN_LOG_LEVEL
    /// - XSCAN_LOG_FORMAT
    /// - XSCAN_COMPOSE_PROGRAM
    /// - XSCAN_OUTPUT_DIR
    /// - XSCAN_NO_COLOR (any value disables color)
    fn apply_env_overrides(mut self) -> Self {
        if let Ok(level) = std::env::var("XSCAN_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("XSCAN_LOG_FORMAT") {
            self.logging.format = format;
        }

        if let Ok(program) = std::env::var("XSCAN_COMPOSE_PROGRAM") {
            if !program.trim().is_empty() {
                self.backend.program = program;
            }
        }

        if let Ok(dir) = std::env::var("XSCAN_OUTPUT_DIR") {
            if !dir.trim().is_empty() {
                self.scan.output_dir = PathBuf::from(dir);
            }
        }
        if std::env::var_os("XSCAN_NO_COLOR").is_some() {
            self.scan.color = false;
        }

        self
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<()> {
        match self.logging.level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!(
                "Invalid log level: {}. Must be one of: trace, debug, info, warn, error",
                self.logging.level
            ),
        }

        match self.logging.format.to_lowercase().as_str() {
            "json" | "pretty" | "compact" => {}
            _ => anyhow::bail!(
                "Invalid log format: {}. Must be one of: json, pretty, compact",
                self.logging.format
            ),
        }

        if self.backend.program.trim().is_empty() {
            anyhow::bail!("Backend program must not be empty");
        }

        if self.scan.output_dir.as_os_str().is_empty() {
            anyhow::bail!("Scan output directory must not be empty");
        }
        if self.scan.channel_capacity == 0 {
            anyhow::bail!("Scan channel capacity must be > 0");
        }

        Ok(())
    }

    /// Convert log level string to tracing::Level
    pub fn log_level(&self) -> Result<tracing::Level> {
        self.logging
            .level
            .to_lowercase()
            .parse()
            .map_err(|e| anyhow::anyhow!("Failed to parse log level: {}", e))
    }
}
