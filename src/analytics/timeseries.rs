//! Recent-performance samples for trend charts.

use crate::models::PredictionRecord;
use serde::Serialize;

/// Number of most-recent records kept in the trend.
pub const DEFAULT_TIME_SERIES_WINDOW: usize = 30;

/// One trend point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSeriesPoint {
    /// 1-based position, oldest first.
    pub index: usize,
    /// Sensitivity in percent.
    pub sensitivity: f64,
    /// Specificity in percent.
    pub specificity: f64,
    pub latency_ms: u64,
}

/// Newest `window` records of a newest-first slice, yielded oldest first.
pub fn time_series(
    predictions: &[PredictionRecord],
    window: usize,
) -> impl ExactSizeIterator<Item = TimeSeriesPoint> + '_ {
    predictions
        .iter()
        .take(window)
        .rev()
        .enumerate()
        .map(|(i, p)| TimeSeriesPoint {
            index: i + 1,
            sensitivity: p.sensitivity.unwrap_or(0.0) * 100.0,
            specificity: p.specificity.unwrap_or(0.0) * 100.0,
            latency_ms: p.inference_latency_ms.unwrap_or(0),
        })
}
