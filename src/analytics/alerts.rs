//! Threshold alerts over aggregate metrics.
//!
//! Evaluation is stateless: every call is a fresh check against the
//! metrics passed in, with no history or suppression.

use crate::analytics::aggregate::AggregateMetrics;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Alert thresholds. Both comparisons are strict.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AlertThresholds {
    /// Flag rate (percent of reviewed records) above which an alert fires.
    pub max_flag_rate: f64,
    /// Average latency in milliseconds above which an alert fires.
    pub max_avg_latency_ms: u64,
}

impl AlertThresholds {
    pub const DEFAULT_MAX_FLAG_RATE: f64 = 10.0;
    pub const DEFAULT_MAX_AVG_LATENCY_MS: u64 = 1000;
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            max_flag_rate: Self::DEFAULT_MAX_FLAG_RATE,
            max_avg_latency_ms: Self::DEFAULT_MAX_AVG_LATENCY_MS,
        }
    }
}

/// A triggered alert carrying the metric that tripped it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Alert {
    #[serde(rename_all = "camelCase")]
    HighFlagRate { flag_rate: f64 },
    #[serde(rename_all = "camelCase")]
    HighLatency { avg_latency_ms: u64 },
}

impl Alert {
    pub fn kind(&self) -> &'static str {
        match self {
            Alert::HighFlagRate { .. } => "high-flag-rate",
            Alert::HighLatency { .. } => "high-latency",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Alert::HighFlagRate { .. } => "High Flag Rate",
            Alert::HighLatency { .. } => "High Latency",
        }
    }

    /// Human-readable description for dashboards and logs.
    pub fn message(&self) -> String {
        match self {
            Alert::HighFlagRate { flag_rate } => format!(
                "{:.1}% of predictions have been flagged. Review for potential model issues.",
                flag_rate
            ),
            Alert::HighLatency { avg_latency_ms } => format!(
                "Average inference time is {}ms. Consider optimizing the model.",
                avg_latency_ms
            ),
        }
    }
}

impl fmt::Display for Alert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.title(), self.message())
    }
}

/// Apply the thresholds, in rule order.
pub fn evaluate_alerts(metrics: &AggregateMetrics, thresholds: &AlertThresholds) -> Vec<Alert> {
    let mut alerts = Vec::new();

    if metrics.flag_rate > thresholds.max_flag_rate {
        alerts.push(Alert::HighFlagRate {
            flag_rate: metrics.flag_rate,
        });
    }

    if metrics.avg_latency_ms > thresholds.max_avg_latency_ms {
        alerts.push(Alert::HighLatency {
            avg_latency_ms: metrics.avg_latency_ms,
        });
    }

    alerts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(flag_rate: f64, avg_latency_ms: u64) -> AggregateMetrics {
        AggregateMetrics {
            flag_rate,
            avg_latency_ms,
            ..Default::default()
        }
    }

    #[test]
    fn test_flag_rate_threshold_is_strict() {
        let t = AlertThresholds::default();
        assert!(evaluate_alerts(&metrics(10.0, 0), &t).is_empty());
        assert_eq!(
            evaluate_alerts(&metrics(10.1, 0), &t),
            vec![Alert::HighFlagRate { flag_rate: 10.1 }]
        );
    }

    #[test]
    fn test_latency_threshold_is_strict() {
        let t = AlertThresholds::default();
        assert!(evaluate_alerts(&metrics(0.0, 1000), &t).is_empty());
        assert_eq!(
            evaluate_alerts(&metrics(0.0, 1001), &t),
            vec![Alert::HighLatency {
                avg_latency_ms: 1001
            }]
        );
    }

    #[test]
    fn test_both_rules_fire_independently() {
        let alerts = evaluate_alerts(&metrics(50.0, 2500), &AlertThresholds::default());
        assert_eq!(alerts.len(), 2);
        assert_eq!(alerts[0].kind(), "high-flag-rate");
        assert_eq!(alerts[1].kind(), "high-latency");
    }

    #[test]
    fn test_custom_thresholds() {
        let t = AlertThresholds {
            max_flag_rate: 50.0,
            max_avg_latency_ms: 200,
        };
        let alerts = evaluate_alerts(&metrics(40.0, 250), &t);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].kind(), "high-latency");
    }

    #[test]
    fn test_alert_message_and_json() {
        let alert = Alert::HighFlagRate { flag_rate: 12.345 };
        assert!(alert.message().starts_with("12.3% of predictions"));

        let json = serde_json::to_string(&alert).unwrap();
        assert!(json.contains("\"kind\":\"high-flag-rate\""));
        assert!(json.contains("\"flagRate\":12.345"));

        let json = serde_json::to_string(&Alert::HighLatency { avg_latency_ms: 1500 }).unwrap();
        assert!(json.contains("\"avgLatencyMs\":1500"));
    }
}
