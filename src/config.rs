//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.cxrmonitor.toml` files.

use crate::analytics::{
    AlertThresholds, AnalyticsConfig, MissingValuePolicy, DEFAULT_TIME_SERIES_WINDOW,
};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default configuration file name.
pub const CONFIG_FILE_NAME: &str = ".cxrmonitor.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Data source settings.
    #[serde(default)]
    pub source: SourceConfig,

    /// Analytics engine settings.
    #[serde(default)]
    pub analytics: AnalyticsSettings,

    /// Export settings.
    #[serde(default)]
    pub export: ExportConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Default output file path.
    #[serde(default = "default_output")]
    pub output: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            output: default_output(),
        }
    }
}

fn default_output() -> String {
    "cxr_monitoring_report.md".to_string()
}

/// Where prediction records come from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// JSON export file.
    #[serde(default)]
    pub input: Option<PathBuf>,

    /// Base URL of the remote prediction store.
    #[serde(default)]
    pub remote_url: Option<String>,

    /// Environment variable holding the remote API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Restrict the report to one clinician's predictions.
    #[serde(default)]
    pub clinician_id: Option<String>,

    /// Remote request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            input: None,
            remote_url: None,
            api_key_env: default_api_key_env(),
            clinician_id: None,
            timeout_seconds: default_timeout(),
        }
    }
}

fn default_api_key_env() -> String {
    "CXRMONITOR_API_KEY".to_string()
}

fn default_timeout() -> u64 {
    30
}

/// Alert thresholds and aggregation policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsSettings {
    /// Flag rate (percent of reviewed predictions) that raises an alert.
    #[serde(default = "default_max_flag_rate")]
    pub max_flag_rate: f64,

    /// Average latency (ms) that raises an alert.
    #[serde(default = "default_max_avg_latency_ms")]
    pub max_avg_latency_ms: u64,

    /// Number of most recent predictions in the trend.
    #[serde(default = "default_time_series_window")]
    pub time_series_window: usize,

    /// `treat-as-zero` or `exclude-missing`.
    #[serde(default)]
    pub missing_values: MissingValuePolicy,
}

impl Default for AnalyticsSettings {
    fn default() -> Self {
        Self {
            max_flag_rate: default_max_flag_rate(),
            max_avg_latency_ms: default_max_avg_latency_ms(),
            time_series_window: default_time_series_window(),
            missing_values: MissingValuePolicy::default(),
        }
    }
}

fn default_max_flag_rate() -> f64 {
    AlertThresholds::DEFAULT_MAX_FLAG_RATE
}

fn default_max_avg_latency_ms() -> u64 {
    AlertThresholds::DEFAULT_MAX_AVG_LATENCY_MS
}

fn default_time_series_window() -> usize {
    DEFAULT_TIME_SERIES_WINDOW
}

impl From<&AnalyticsSettings> for AnalyticsConfig {
    fn from(settings: &AnalyticsSettings) -> Self {
        Self {
            thresholds: AlertThresholds {
                max_flag_rate: settings.max_flag_rate,
                max_avg_latency_ms: settings.max_avg_latency_ms,
            },
            missing_values: settings.missing_values,
            time_series_window: settings.time_series_window,
        }
    }
}

/// Audit export settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Write the audit log CSV here.
    #[serde(default)]
    pub audit_csv: Option<PathBuf>,
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        Self::load_from_dir(Path::new("."))
    }

    /// Try to load configuration from a directory.
    pub fn load_from_dir(dir: &Path) -> Result<Option<Self>> {
        let config_path = dir.join(CONFIG_FILE_NAME);

        if config_path.exists() {
            Ok(Some(Self::load(&config_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings.
    /// Only explicitly provided values override.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref output) = args.output {
            self.general.output = output.display().to_string();
        }

        // An explicit source on the command line replaces the configured one.
        if let Some(ref input) = args.input {
            self.source.input = Some(input.clone());
            self.source.remote_url = None;
        }
        if let Some(ref remote) = args.remote {
            self.source.remote_url = Some(remote.clone());
            self.source.input = None;
        }
        if let Some(ref clinician) = args.clinician {
            self.source.clinician_id = Some(clinician.clone());
        }
        if let Some(timeout) = args.timeout {
            self.source.timeout_seconds = timeout;
        }

        if let Some(rate) = args.max_flag_rate {
            self.analytics.max_flag_rate = rate;
        }
        if let Some(latency) = args.max_latency_ms {
            self.analytics.max_avg_latency_ms = latency;
        }
        if args.exclude_missing {
            self.analytics.missing_values = MissingValuePolicy::ExcludeMissing;
        }

        if let Some(ref csv) = args.audit_csv {
            self.export.audit_csv = Some(csv.clone());
        }
    }

    /// Engine settings derived from the `[analytics]` section.
    pub fn analytics_config(&self) -> AnalyticsConfig {
        AnalyticsConfig::from(&self.analytics)
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
