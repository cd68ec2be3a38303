//! Markdown and JSON report generation.
//!
//! This module renders an [`AnalyticsReport`] as a monitoring dashboard
//! document.

use crate::analytics::primitives::{format_fraction_percent, format_percent};
use crate::analytics::{
    AgeBand, Alert, AnalyticsReport, BucketCount, FairnessBreakdown, InputAnomaly, TimeSeriesPoint,
};
use crate::audit::AuditSummary;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::Path;

/// Context printed alongside the analytics.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportMetadata {
    /// Where the records came from (file path or store URL).
    pub source: String,
    /// Clinician the records were scoped to, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clinician_id: Option<String>,
    pub generated_at: DateTime<Utc>,
    pub audit: AuditSummary,
}

#[derive(Serialize)]
struct ReportDocument<'a> {
    metadata: &'a ReportMetadata,
    analytics: &'a AnalyticsReport,
}

/// Generate a complete Markdown report.
pub fn generate_markdown_report(metadata: &ReportMetadata, report: &AnalyticsReport) -> String {
    let mut output = String::new();

    output.push_str("# TB Screening Monitoring Report\n\n");
    output.push_str(&generate_metadata_section(metadata));
    output.push_str(&generate_metrics_section(report));
    output.push_str(&generate_alerts_section(&report.alerts));
    output.push_str(&generate_trend_section(&report.time_series));
    output.push_str(&generate_feedback_section(report));
    output.push_str(&generate_fairness_section(&report.fairness));
    output.push_str(&generate_anomalies_section(&report.anomalies));
    output.push_str(&generate_footer());

    output
}

fn generate_metadata_section(metadata: &ReportMetadata) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!("- **Source:** {}\n", metadata.source));
    if let Some(ref clinician) = metadata.clinician_id {
        section.push_str(&format!("- **Clinician:** `{}`\n", clinician));
    }
    section.push_str(&format!(
        "- **Generated:** {}\n",
        metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!(
        "- **Reviewed:** {} of {} predictions ({:.0}%)\n",
        metadata.audit.reviewed, metadata.audit.total, metadata.audit.review_rate
    ));
    section.push('\n');

    section
}

fn generate_metrics_section(report: &AnalyticsReport) -> String {
    let m = &report.metrics;
    let mut section = String::new();

    section.push_str("## Key Metrics\n\n");
    section.push_str("| Total Predictions | Positive Rate | Sensitivity | Specificity | Avg Latency |\n");
    section.push_str("|:---:|:---:|:---:|:---:|:---:|\n");
    section.push_str(&format!(
        "| {} | {} | {} | {} | {}ms |\n\n",
        m.total_predictions,
        format_percent(m.positive_rate),
        format_fraction_percent(m.sensitivity),
        format_fraction_percent(m.specificity),
        m.avg_latency_ms
    ));

    section
}

fn generate_alerts_section(alerts: &[Alert]) -> String {
    if alerts.is_empty() {
        return String::new();
    }

    let mut section = String::new();
    section.push_str("## System Alerts\n\n");
    for alert in alerts {
        section.push_str(&format!("- ⚠️ **{}:** {}\n", alert.title(), alert.message()));
    }
    section.push('\n');

    section
}

fn generate_trend_section(points: &[TimeSeriesPoint]) -> String {
    let mut section = String::new();

    section.push_str("## Performance Over Time\n\n");
    if points.is_empty() {
        section.push_str("No predictions recorded yet.\n\n");
        return section;
    }

    section.push_str("| # | Sensitivity | Specificity | Latency (ms) |\n");
    section.push_str("|:---:|:---:|:---:|:---:|\n");
    for p in points {
        section.push_str(&format!(
            "| {} | {} | {} | {} |\n",
            p.index,
            format_percent(p.sensitivity),
            format_percent(p.specificity),
            p.latency_ms
        ));
    }
    section.push('\n');

    section
}

fn generate_feedback_section(report: &AnalyticsReport) -> String {
    let mut section = String::new();

    section.push_str("## Clinician Feedback Distribution\n\n");
    section.push_str(&format!(
        "{:.0}% of predictions reviewed.\n\n",
        report.metrics.feedback_rate
    ));

    let distribution = report.feedback_distribution();
    if distribution.is_empty() {
        section.push_str("No feedback data available yet.\n\n");
        return section;
    }

    section.push_str("| Action | Share |\n");
    section.push_str("|:---|:---:|\n");
    for share in distribution {
        section.push_str(&format!("| {} | {} |\n", share.name, format_percent(share.value)));
    }
    section.push('\n');

    section
}

fn generate_fairness_section(fairness: &FairnessBreakdown) -> String {
    let mut section = String::new();

    section.push_str("## Fairness Analysis\n\n");
    section.push_str(&bucket_table(
        "By Gender",
        "Gender",
        fairness.by_gender.iter().map(|(s, c)| (s.display_name(), *c)),
    ));
    section.push_str(&bucket_table(
        "By Age Group",
        "Age",
        AgeBand::ALL
            .iter()
            .map(|b| (b.label().to_string(), fairness.age(*b))),
    ));
    section.push_str(&bucket_table(
        "By HIV Status",
        "HIV Status",
        fairness.by_hiv.iter().map(|(h, c)| (h.to_string(), *c)),
    ));

    section
}

/// Render one dimension, leaving out empty buckets.
fn bucket_table<I>(title: &str, column: &str, buckets: I) -> String
where
    I: Iterator<Item = (String, BucketCount)>,
{
    let mut section = format!("### {}\n\n", title);

    let rows: Vec<String> = buckets
        .filter_map(|(name, count)| {
            count.positive_rate().map(|rate| {
                format!("| {} | {} | {} |\n", name, count.total, format_percent(rate))
            })
        })
        .collect();

    if rows.is_empty() {
        section.push_str("No demographic data available.\n\n");
        return section;
    }

    section.push_str(&format!("| {} | Patients | Positive Rate |\n", column));
    section.push_str("|:---|:---:|:---:|\n");
    for row in rows {
        section.push_str(&row);
    }
    section.push('\n');

    section
}

fn generate_anomalies_section(anomalies: &[InputAnomaly]) -> String {
    if anomalies.is_empty() {
        return String::new();
    }

    let mut section = String::new();
    section.push_str("## Input Anomalies\n\n");
    section.push_str("Values outside the recognised set; counted in totals only.\n\n");
    section.push_str("| Record | Field | Value |\n");
    section.push_str("|:---|:---|:---|\n");
    for a in anomalies {
        section.push_str(&format!(
            "| `{}` | {} | {} |\n",
            escape_cell(&a.record_id),
            a.field,
            escape_cell(&a.value)
        ));
    }
    section.push('\n');

    section
}

/// Keep a value inside its Markdown table cell.
fn escape_cell(value: &str) -> String {
    value.replace('|', "\\|").replace(['\n', '\r'], " ")
}

fn generate_footer() -> String {
    let mut footer = String::new();

    footer.push_str("---\n\n");
    footer.push_str(&format!(
        "*Report generated by cxrmonitor v{}*\n",
        env!("CARGO_PKG_VERSION")
    ));

    footer
}

/// Generate a JSON report.
pub fn generate_json_report(metadata: &ReportMetadata, report: &AnalyticsReport) -> Result<String> {
    let document = ReportDocument {
        metadata,
        analytics: report,
    };
    serde_json::to_string_pretty(&document).map_err(Into::into)
}

/// Write a rendered report to a file.
pub fn write_report(content: &str, path: &Path) -> Result<()> {
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write report to {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::compute_report;
    use crate::models::{
        Feedback, HivStatus, Label, OwningPrediction, PatientMetadataRecord, PredictionRecord, Sex,
    };
    use chrono::TimeZone;

    fn create_test_metadata() -> ReportMetadata {
        ReportMetadata {
            source: "predictions.json".to_string(),
            clinician_id: Some("u-1".to_string()),
            generated_at: Utc.with_ymd_and_hms(2024, 4, 1, 12, 0, 0).unwrap(),
            audit: AuditSummary {
                total: 2,
                reviewed: 2,
                positive: 1,
                review_rate: 100.0,
            },
        }
    }

    fn create_test_report() -> AnalyticsReport {
        let created = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let mut a = PredictionRecord::new("p1", Label::Positive, 0.9, created);
        a.clinician_feedback = Some(Feedback::Flag);
        a.inference_latency_ms = Some(1500);
        a.sensitivity = Some(0.9);
        let mut b = PredictionRecord::new("p2", Label::from("TB-unclear"), 0.6, created);
        b.clinician_feedback = Some(Feedback::Accept);
        b.inference_latency_ms = Some(900);

        let meta = PatientMetadataRecord {
            age: Some(45),
            sex: Some(Sex::Female),
            hiv_status: Some(HivStatus::Positive),
            owner: Some(OwningPrediction {
                label: Label::Positive,
            }),
            ..Default::default()
        };

        compute_report(&[a, b], &[meta])
    }

    #[test]
    fn test_generate_markdown_report() {
        let markdown = generate_markdown_report(&create_test_metadata(), &create_test_report());

        assert!(markdown.contains("# TB Screening Monitoring Report"));
        assert!(markdown.contains("## Key Metrics"));
        assert!(markdown.contains("## System Alerts"));
        assert!(markdown.contains("High Flag Rate"));
        assert!(markdown.contains("Average inference time is 1200ms"));
        assert!(markdown.contains("## Performance Over Time"));
        assert!(markdown.contains("| Flagged | 50.0% |"));
        assert!(markdown.contains("| Female | 1 | 100.0% |"));
        assert!(markdown.contains("| 41-65 | 1 | 100.0% |"));
        assert!(!markdown.contains("| Male |"));
        assert!(markdown.contains("## Input Anomalies"));
        assert!(markdown.contains("TB-unclear"));
    }

    #[test]
    fn test_generate_metadata_section() {
        let section = generate_metadata_section(&create_test_metadata());

        assert!(section.contains("predictions.json"));
        assert!(section.contains("`u-1`"));
        assert!(section.contains("2024-04-01 12:00:00 UTC"));
        assert!(section.contains("2 of 2 predictions (100%)"));
    }

    #[test]
    fn test_empty_report_sections() {
        let markdown = generate_markdown_report(&create_test_metadata(), &compute_report(&[], &[]));

        assert!(!markdown.contains("## System Alerts"));
        assert!(markdown.contains("No predictions recorded yet."));
        assert!(markdown.contains("No feedback data available yet."));
        assert!(markdown.contains("No demographic data available."));
        assert!(!markdown.contains("## Input Anomalies"));
    }

    #[test]
    fn test_anomaly_cells_are_escaped() {
        let anomalies = vec![InputAnomaly {
            record_id: "p|1".to_string(),
            field: "label",
            value: "TB|positive\nmaybe".to_string(),
        }];
        let section = generate_anomalies_section(&anomalies);

        assert!(section.contains("| `p\\|1` | label | TB\\|positive maybe |\n"));
        assert_eq!(section.lines().filter(|l| l.starts_with("| `")).count(), 1);
    }

    #[test]
    fn test_generate_json_report() {
        let json = generate_json_report(&create_test_metadata(), &create_test_report()).unwrap();

        assert!(json.contains("\"metadata\""));
        assert!(json.contains("\"analytics\""));
        assert!(json.contains("\"totalPredictions\": 2"));
        assert!(json.contains("\"kind\": \"high-latency\""));
        assert!(json.contains("\"anomalies\""));
    }
}
