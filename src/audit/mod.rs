//! Audit log views over prediction records.
//!
//! Filtering and the review summary used by the activity log, plus the CSV
//! export in [`csv`].

pub mod csv;

pub use self::csv::{default_export_file_name, export_csv, write_csv, CSV_HEADERS};

use crate::analytics::primitives::percent;
use crate::models::{Feedback, Label, PredictionRecord};
use serde::Serialize;

/// Label filter for the activity log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum LabelFilter {
    #[default]
    All,
    Positive,
    Negative,
}

impl LabelFilter {
    fn matches(&self, label: &Label) -> bool {
        match self {
            LabelFilter::All => true,
            LabelFilter::Positive => *label == Label::Positive,
            LabelFilter::Negative => *label == Label::Negative,
        }
    }
}

/// Clinician-action filter for the activity log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum FeedbackFilter {
    #[default]
    All,
    /// Records with no feedback yet.
    None,
    Accept,
    Override,
    Flag,
}

impl FeedbackFilter {
    fn matches(&self, feedback: Option<&Feedback>) -> bool {
        match (self, feedback) {
            (FeedbackFilter::All, _) => true,
            (FeedbackFilter::None, f) => f.is_none(),
            (FeedbackFilter::Accept, Some(Feedback::Accept)) => true,
            (FeedbackFilter::Override, Some(Feedback::Override)) => true,
            (FeedbackFilter::Flag, Some(Feedback::Flag)) => true,
            _ => false,
        }
    }
}

/// Combined activity-log filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuditFilter {
    /// Case-insensitive substring of the id or the label.
    pub query: Option<String>,
    pub label: LabelFilter,
    pub feedback: FeedbackFilter,
}

impl AuditFilter {
    pub fn matches(&self, record: &PredictionRecord) -> bool {
        let matches_query = match self.query.as_deref().map(str::trim) {
            None | Some("") => true,
            Some(q) => {
                let q = q.to_lowercase();
                record.id.to_lowercase().contains(&q)
                    || record.label.as_str().to_lowercase().contains(&q)
            }
        };

        matches_query
            && self.label.matches(&record.label)
            && self.feedback.matches(record.clinician_feedback.as_ref())
    }

    /// Records passing the filter, in input order.
    pub fn apply<'a>(&self, records: &'a [PredictionRecord]) -> Vec<&'a PredictionRecord> {
        records.iter().filter(|r| self.matches(r)).collect()
    }
}

/// Review counters shown above the activity log.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditSummary {
    pub total: usize,
    pub reviewed: usize,
    pub positive: usize,
    /// Percent of records with any feedback.
    pub review_rate: f64,
}

impl AuditSummary {
    pub fn from_records<'a, I>(records: I) -> Self
    where
        I: IntoIterator<Item = &'a PredictionRecord>,
    {
        let mut summary = Self::default();
        for r in records {
            summary.total += 1;
            if r.is_reviewed() {
                summary.reviewed += 1;
            }
            if r.label.is_positive() {
                summary.positive += 1;
            }
        }
        summary.review_rate = percent(summary.reviewed, summary.total);
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn records() -> Vec<PredictionRecord> {
        let created = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();
        let mut a = PredictionRecord::new("ABC-001", Label::Positive, 0.9, created);
        a.clinician_feedback = Some(Feedback::Accept);
        let b = PredictionRecord::new("abc-002", Label::Negative, 0.8, created);
        let mut c = PredictionRecord::new("xyz-003", Label::Negative, 0.7, created);
        c.clinician_feedback = Some(Feedback::Flag);
        vec![a, b, c]
    }

    #[test]
    fn test_default_filter_matches_all() {
        let records = records();
        assert_eq!(AuditFilter::default().apply(&records).len(), 3);
    }

    #[test]
    fn test_query_is_case_insensitive_over_id_and_label() {
        let records = records();
        let filter = AuditFilter {
            query: Some("abc".to_string()),
            ..Default::default()
        };
        assert_eq!(filter.apply(&records).len(), 2);

        let filter = AuditFilter {
            query: Some("tb-NEG".to_string()),
            ..Default::default()
        };
        let ids: Vec<_> = filter.apply(&records).iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["abc-002", "xyz-003"]);
    }

    #[test]
    fn test_label_and_feedback_filters() {
        let records = records();
        let filter = AuditFilter {
            label: LabelFilter::Negative,
            feedback: FeedbackFilter::None,
            ..Default::default()
        };
        let hits = filter.apply(&records);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "abc-002");

        let filter = AuditFilter {
            feedback: FeedbackFilter::Flag,
            ..Default::default()
        };
        assert_eq!(filter.apply(&records)[0].id, "xyz-003");
    }

    #[test]
    fn test_summary() {
        let records = records();
        let summary = AuditSummary::from_records(&records);
        assert_eq!(summary.total, 3);
        assert_eq!(summary.reviewed, 2);
        assert_eq!(summary.positive, 1);
        assert!((summary.review_rate - 200.0 / 3.0).abs() < 1e-9);

        assert_eq!(
            AuditSummary::from_records(std::iter::empty()),
            AuditSummary::default()
        );
    }
}
