//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::audit::{AuditFilter, FeedbackFilter, LabelFilter};
use clap::Parser;
use std::path::PathBuf;

/// CXR Monitor - monitoring and fairness analytics for TB predictions
///
/// Computes quality, workflow and demographic-fairness metrics over stored
/// chest X-ray predictions and writes a dashboard report.
///
/// Examples:
///   cxrmonitor --input predictions.json
///   cxrmonitor --remote https://store.example.org --clinician u-42
///   cxrmonitor --input predictions.json --format json --output report.json
///   cxrmonitor --input predictions.json --audit-csv audit.csv --feedback flag
///   cxrmonitor --input predictions.json --fail-on-alert
///   cxrmonitor --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// JSON export of prediction records
    #[arg(short, long, value_name = "FILE", conflicts_with = "remote")]
    pub input: Option<PathBuf>,

    /// Base URL of the remote prediction store
    ///
    /// The API key is read from the variable named by `source.api_key_env`
    /// (default CXRMONITOR_API_KEY).
    #[arg(long, value_name = "URL")]
    pub remote: Option<String>,

    /// Only include predictions made by this clinician
    #[arg(long, value_name = "ID")]
    pub clinician: Option<String>,

    /// Output file path for the report
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output format (markdown, json)
    #[arg(long, default_value = "markdown", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Also write the audit log as CSV to this path
    #[arg(long, value_name = "FILE")]
    pub audit_csv: Option<PathBuf>,

    /// Audit export: only records whose ID or prediction contains this text
    #[arg(long, value_name = "TEXT")]
    pub search: Option<String>,

    /// Audit export: filter by prediction
    #[arg(long, default_value = "all", value_name = "LABEL")]
    pub label: LabelFilter,

    /// Audit export: filter by clinician action
    #[arg(long, default_value = "all", value_name = "ACTION")]
    pub feedback: FeedbackFilter,

    /// Flag rate (percent) above which an alert is raised
    #[arg(long, value_name = "PERCENT")]
    pub max_flag_rate: Option<f64>,

    /// Average latency (ms) above which an alert is raised
    #[arg(long, value_name = "MS")]
    pub max_latency_ms: Option<u64>,

    /// Leave absent sensitivity/specificity/latency out of the means
    ///
    /// By default absent values count as zero.
    #[arg(long)]
    pub exclude_missing: bool,

    /// Remote request timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Exit with code 2 when any alert fires
    ///
    /// Useful for scheduled checks.
    #[arg(long)]
    pub fail_on_alert: bool,

    /// Path to configuration file
    ///
    /// If not specified, looks for .cxrmonitor.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Generate a default .cxrmonitor.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        if self.init_config {
            return Ok(());
        }

        if let Some(ref remote) = self.remote {
            if !remote.starts_with("http://") && !remote.starts_with("https://") {
                return Err("Remote URL must start with 'http://' or 'https://'".to_string());
            }
        }

        if let Some(ref input) = self.input {
            if !input.is_file() {
                return Err(format!("Input file does not exist: {}", input.display()));
            }
        }

        if let Some(rate) = self.max_flag_rate {
            if !(0.0..=100.0).contains(&rate) {
                return Err("Max flag rate must be between 0 and 100".to_string());
            }
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(timeout) = self.timeout {
            if timeout == 0 {
                return Err("Timeout must be at least 1 second".to_string());
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }

    /// Audit filter assembled from `--search`, `--label` and `--feedback`.
    pub fn audit_filter(&self) -> AuditFilter {
        AuditFilter {
            query: self.search.clone(),
            label: self.label,
            feedback: self.feedback,
        }
    }
}
