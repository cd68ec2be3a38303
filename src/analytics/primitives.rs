//! Metric primitives shared by the analytics engine and the audit exporter.

use serde::{Deserialize, Serialize};

/// How absent numeric fields enter a mean.
///
/// Dashboards downstream are calibrated against `TreatAsZero`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MissingValuePolicy {
    /// An absent value counts as `0` and stays in the denominator.
    #[default]
    TreatAsZero,
    /// Absent values are left out of both numerator and denominator.
    ExcludeMissing,
}

/// `part / whole * 100`, or `0` when `whole` is `0`.
pub fn percent(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

/// Mean of optional values under the given policy. Empty input yields `0`.
pub fn mean<I>(values: I, policy: MissingValuePolicy) -> f64
where
    I: IntoIterator<Item = Option<f64>>,
{
    let mut sum = 0.0;
    let mut count = 0usize;

    for value in values {
        match (value, policy) {
            (Some(v), _) => {
                sum += v;
                count += 1;
            }
            (None, MissingValuePolicy::TreatAsZero) => count += 1,
            (None, MissingValuePolicy::ExcludeMissing) => {}
        }
    }

    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

/// Formats a `[0, 1]` fraction as a one-decimal percentage, e.g. `91.0%`.
pub fn format_fraction_percent(fraction: f64) -> String {
    format!("{:.1}%", fraction * 100.0)
}

/// Formats an already-scaled percentage with one decimal, e.g. `33.3%`.
pub fn format_percent(value: f64) -> String {
    format!("{:.1}%", value)
}
