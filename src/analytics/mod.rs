//! Monitoring and fairness analytics.
//!
//! `compute_report` is a pure function over in-memory records: it never
//! mutates its inputs and returns the same report for the same input.

pub mod aggregate;
pub mod alerts;
pub mod anomalies;
pub mod fairness;
pub mod primitives;
pub mod timeseries;

pub use aggregate::{aggregate_metrics, AggregateMetrics};
pub use alerts::{evaluate_alerts, Alert, AlertThresholds};
pub use anomalies::{find_anomalies, InputAnomaly};
pub use fairness::{fairness_breakdown, AgeBand, BucketCount, FairnessBreakdown};
pub use primitives::MissingValuePolicy;
pub use timeseries::{time_series, TimeSeriesPoint, DEFAULT_TIME_SERIES_WINDOW};

use crate::models::{PatientMetadataRecord, PredictionRecord};
use serde::Serialize;
use tracing::{debug, warn};

/// Caller-owned engine settings. The default reproduces the dashboard.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyticsConfig {
    pub thresholds: AlertThresholds,
    pub missing_values: MissingValuePolicy,
    pub time_series_window: usize,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            thresholds: AlertThresholds::default(),
            missing_values: MissingValuePolicy::default(),
            time_series_window: DEFAULT_TIME_SERIES_WINDOW,
        }
    }
}

/// Everything the monitoring dashboard renders.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsReport {
    #[serde(flatten)]
    pub metrics: AggregateMetrics,
    pub fairness: FairnessBreakdown,
    pub time_series: Vec<TimeSeriesPoint>,
    pub alerts: Vec<Alert>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub anomalies: Vec<InputAnomaly>,
}

/// Share of reviewed records carrying one feedback value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FeedbackShare {
    pub name: &'static str,
    pub value: f64,
}

impl AnalyticsReport {
    /// Accepted/Overridden/Flagged shares, dropping zero entries.
    pub fn feedback_distribution(&self) -> Vec<FeedbackShare> {
        [
            ("Accepted", self.metrics.accept_rate),
            ("Overridden", self.metrics.override_rate),
            ("Flagged", self.metrics.flag_rate),
        ]
        .into_iter()
        .filter(|(_, value)| *value > 0.0)
        .map(|(name, value)| FeedbackShare { name, value })
        .collect()
    }

    pub fn has_alerts(&self) -> bool {
        !self.alerts.is_empty()
    }
}

/// Compute a report with the default configuration.
pub fn compute_report(
    predictions: &[PredictionRecord],
    metadata: &[PatientMetadataRecord],
) -> AnalyticsReport {
    compute_report_with(predictions, metadata, &AnalyticsConfig::default())
}

/// Compute a report. `predictions` must be ordered newest first.
pub fn compute_report_with(
    predictions: &[PredictionRecord],
    metadata: &[PatientMetadataRecord],
    config: &AnalyticsConfig,
) -> AnalyticsReport {
    let metrics = aggregate_metrics(predictions, config.missing_values);
    let fairness = fairness_breakdown(metadata);
    let time_series = time_series(predictions, config.time_series_window).collect();
    let alerts = evaluate_alerts(&metrics, &config.thresholds);
    let anomalies = find_anomalies(predictions, metadata);

    debug!(
        "Computed report over {} predictions and {} metadata rows: {} alerts",
        metrics.total_predictions,
        metadata.len(),
        alerts.len()
    );
    if !anomalies.is_empty() {
        warn!(
            "{} record field(s) carried unrecognized values and were excluded from categorical rules",
            anomalies.len()
        );
    }

    AnalyticsReport {
        metrics,
        fairness,
        time_series,
        alerts,
        anomalies,
    }
}
