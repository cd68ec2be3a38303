//! CSV export of the audit log.

use crate::analytics::primitives::format_fraction_percent;
use crate::models::PredictionRecord;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use std::path::Path;

/// Column headers, in output order.
pub const CSV_HEADERS: [&str; 13] = [
    "ID",
    "Date",
    "Time",
    "Prediction",
    "Confidence",
    "Clinician Action",
    "Feedback Date",
    "Sensitivity",
    "Specificity",
    "Latency (ms)",
    "Patient Age",
    "Patient Sex",
    "HIV Status",
];

const MISSING: &str = "N/A";
const NO_FEEDBACK: &str = "No feedback";

/// Render records as CSV, one row per record.
pub fn export_csv<'a, I>(records: I) -> String
where
    I: IntoIterator<Item = &'a PredictionRecord>,
{
    let mut lines = vec![CSV_HEADERS.join(",")];

    for record in records {
        let row: Vec<String> = csv_row(record).iter().map(|f| escape_field(f)).collect();
        lines.push(row.join(","));
    }

    lines.join("\n")
}

/// Write records as CSV to `path`.
pub fn write_csv<'a, I>(records: I, path: &Path) -> Result<()>
where
    I: IntoIterator<Item = &'a PredictionRecord>,
{
    let content = export_csv(records);
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write audit CSV to {}", path.display()))
}

/// `tb-audit-logs-YYYY-MM-DD.csv` for the given day.
pub fn default_export_file_name(day: NaiveDate) -> String {
    format!("tb-audit-logs-{}.csv", day.format("%Y-%m-%d"))
}

fn csv_row(p: &PredictionRecord) -> [String; 13] {
    let patient = p.patient.as_ref();
    let or_missing = |value: Option<String>| value.unwrap_or_else(|| MISSING.to_string());

    [
        p.id.clone(),
        p.created_at.format("%Y-%m-%d").to_string(),
        p.created_at.format("%H:%M:%S").to_string(),
        p.label.to_string(),
        format_fraction_percent(p.probability),
        p.clinician_feedback
            .as_ref()
            .map(|f| f.to_string())
            .unwrap_or_else(|| NO_FEEDBACK.to_string()),
        or_missing(p.feedback_at.map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())),
        or_missing(p.sensitivity.map(format_fraction_percent)),
        or_missing(p.specificity.map(format_fraction_percent)),
        or_missing(p.inference_latency_ms.map(|ms| ms.to_string())),
        or_missing(patient.and_then(|m| m.age).map(|age| age.to_string())),
        or_missing(patient.and_then(|m| m.sex.as_ref()).map(|s| s.to_string())),
        or_missing(patient.and_then(|m| m.hiv_status.as_ref()).map(|h| h.to_string())),
    ]
}

fn escape_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
