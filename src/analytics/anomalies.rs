//! Detection of categorical values the engine does not recognise.
//!
//! Anomalies never alter a metric; they only document which records fell
//! through a categorical rule.

use crate::models::{Feedback, HivStatus, Label, PatientMetadataRecord, PredictionRecord, Sex};
use serde::Serialize;

/// A record field carrying a value outside its known set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InputAnomaly {
    pub record_id: String,
    pub field: &'static str,
    pub value: String,
}

impl InputAnomaly {
    fn new(record_id: &str, field: &'static str, value: &str) -> Self {
        Self {
            record_id: record_id.to_string(),
            field,
            value: value.to_string(),
        }
    }
}

/// Collect anomalies, predictions first, each in input order.
pub fn find_anomalies(
    predictions: &[PredictionRecord],
    metadata: &[PatientMetadataRecord],
) -> Vec<InputAnomaly> {
    let mut anomalies = Vec::new();

    for p in predictions {
        if let Label::Unrecognized(ref value) = p.label {
            anomalies.push(InputAnomaly::new(&p.id, "label", value));
        }
        if let Some(Feedback::Unrecognized(ref value)) = p.clinician_feedback {
            anomalies.push(InputAnomaly::new(&p.id, "clinician_feedback", value));
        }
    }

    for m in metadata {
        if let Some(Sex::Unrecognized(ref value)) = m.sex {
            anomalies.push(InputAnomaly::new(m.record_id(), "sex", value));
        }
        if let Some(HivStatus::Unrecognized(ref value)) = m.hiv_status {
            anomalies.push(InputAnomaly::new(m.record_id(), "hiv_status", value));
        }
    }

    anomalies
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_find_anomalies_in_order() {
        let created = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let mut odd = PredictionRecord::new("p1", Label::from("TB-suspect"), 0.6, created);
        odd.clinician_feedback = Some(Feedback::from("defer"));
        let fine = PredictionRecord::new("p2", Label::Negative, 0.9, created);

        let meta = PatientMetadataRecord {
            prediction_id: Some("p2".to_string()),
            sex: Some(Sex::from("F")),
            hiv_status: Some(HivStatus::Unknown),
            ..Default::default()
        };

        let anomalies = find_anomalies(&[odd, fine], &[meta]);
        assert_eq!(anomalies.len(), 3);
        assert_eq!(anomalies[0], InputAnomaly::new("p1", "label", "TB-suspect"));
        assert_eq!(
            anomalies[1],
            InputAnomaly::new("p1", "clinician_feedback", "defer")
        );
        assert_eq!(anomalies[2], InputAnomaly::new("p2", "sex", "F"));
    }

    #[test]
    fn test_no_anomalies_for_known_values() {
        let created = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let p = PredictionRecord::new("p1", Label::Positive, 0.6, created);
        assert!(find_anomalies(&[p], &[]).is_empty());
    }
}
