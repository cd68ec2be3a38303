//! Scalar quality and workflow metrics.
//!
//! Rates are percentages in `[0, 100]`. The three feedback rates are
//! normalised over the reviewed subset while `feedback_rate` is normalised
//! over every record.

use crate::analytics::primitives::{mean, percent, MissingValuePolicy};
use crate::models::{Feedback, PredictionRecord};
use serde::Serialize;

/// Scalar metrics over a set of prediction records.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateMetrics {
    pub total_predictions: usize,
    /// Mean sensitivity as a `[0, 1]` fraction.
    pub sensitivity: f64,
    /// Mean specificity as a `[0, 1]` fraction.
    pub specificity: f64,
    /// Mean inference latency, rounded to the nearest millisecond.
    pub avg_latency_ms: u64,
    pub positive_rate: f64,
    pub feedback_rate: f64,
    pub accept_rate: f64,
    pub override_rate: f64,
    pub flag_rate: f64,
}

#[derive(Default)]
struct Tally {
    positive: usize,
    reviewed: usize,
    accepted: usize,
    overridden: usize,
    flagged: usize,
}

/// Reduce the full record set to scalar metrics.
pub fn aggregate_metrics(
    predictions: &[PredictionRecord],
    policy: MissingValuePolicy,
) -> AggregateMetrics {
    let total = predictions.len();
    if total == 0 {
        return AggregateMetrics::default();
    }

    let mut tally = Tally::default();
    for p in predictions {
        if p.label.is_positive() {
            tally.positive += 1;
        }
        if let Some(ref feedback) = p.clinician_feedback {
            tally.reviewed += 1;
            match feedback {
                Feedback::Accept => tally.accepted += 1,
                Feedback::Override => tally.overridden += 1,
                Feedback::Flag => tally.flagged += 1,
                Feedback::Unrecognized(_) => {}
            }
        }
    }

    let sensitivity = mean(predictions.iter().map(|p| p.sensitivity), policy);
    let specificity = mean(predictions.iter().map(|p| p.specificity), policy);
    let latency = mean(
        predictions
            .iter()
            .map(|p| p.inference_latency_ms.map(|ms| ms as f64)),
        policy,
    );

    AggregateMetrics {
        total_predictions: total,
        sensitivity,
        specificity,
        avg_latency_ms: latency.round() as u64,
        positive_rate: percent(tally.positive, total),
        feedback_rate: percent(tally.reviewed, total),
        accept_rate: percent(tally.accepted, tally.reviewed),
        override_rate: percent(tally.overridden, tally.reviewed),
        flag_rate: percent(tally.flagged, tally.reviewed),
    }
}
