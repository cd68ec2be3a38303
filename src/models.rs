//! Data models for prediction records.
//!
//! This module contains the typed input records consumed by the analytics
//! engine and the audit exporter. Categorical fields keep any value they do
//! not recognise instead of rejecting the record, so the engine can report
//! them as anomalies.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Result label produced by the inference service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Label {
    /// `TB-positive`
    Positive,
    /// `TB-negative`
    Negative,
    /// Any other label string, kept verbatim.
    Unrecognized(String),
}

impl Label {
    /// Whether this label is `TB-positive`.
    pub fn is_positive(&self) -> bool {
        matches!(self, Label::Positive)
    }

    /// Wire representation of the label.
    pub fn as_str(&self) -> &str {
        match self {
            Label::Positive => "TB-positive",
            Label::Negative => "TB-negative",
            Label::Unrecognized(s) => s,
        }
    }
}

impl From<String> for Label {
    fn from(s: String) -> Self {
        match s.as_str() {
            "TB-positive" => Label::Positive,
            "TB-negative" => Label::Negative,
            _ => Label::Unrecognized(s),
        }
    }
}

impl From<&str> for Label {
    fn from(s: &str) -> Self {
        Label::from(s.to_string())
    }
}

impl From<Label> for String {
    fn from(label: Label) -> Self {
        label.as_str().to_string()
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Clinician disposition on a prediction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Feedback {
    /// Clinician agreed with the prediction.
    Accept,
    /// Clinician replaced the prediction with their own reading.
    Override,
    /// Clinician flagged the prediction for review.
    Flag,
    /// Any other feedback string, kept verbatim.
    Unrecognized(String),
}

impl Feedback {
    /// Wire representation of the feedback value.
    pub fn as_str(&self) -> &str {
        match self {
            Feedback::Accept => "accept",
            Feedback::Override => "override",
            Feedback::Flag => "flag",
            Feedback::Unrecognized(s) => s,
        }
    }
}

impl From<String> for Feedback {
    fn from(s: String) -> Self {
        match s.as_str() {
            "accept" => Feedback::Accept,
            "override" => Feedback::Override,
            "flag" => Feedback::Flag,
            _ => Feedback::Unrecognized(s),
        }
    }
}

impl From<&str> for Feedback {
    fn from(s: &str) -> Self {
        Feedback::from(s.to_string())
    }
}

impl From<Feedback> for String {
    fn from(feedback: Feedback) -> Self {
        feedback.as_str().to_string()
    }
}

impl fmt::Display for Feedback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Patient sex as recorded in the metadata table.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Sex {
    Male,
    Female,
    Other,
    Unknown,
    Unrecognized(String),
}

impl Sex {
    /// Wire representation of the value.
    pub fn as_str(&self) -> &str {
        match self {
            Sex::Male => "male",
            Sex::Female => "female",
            Sex::Other => "other",
            Sex::Unknown => "unknown",
            Sex::Unrecognized(s) => s,
        }
    }

    /// Capitalised name used in rendered tables.
    pub fn display_name(&self) -> String {
        let s = self.as_str();
        let mut chars = s.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    }
}

impl From<String> for Sex {
    fn from(s: String) -> Self {
        match s.as_str() {
            "male" => Sex::Male,
            "female" => Sex::Female,
            "other" => Sex::Other,
            "unknown" => Sex::Unknown,
            _ => Sex::Unrecognized(s),
        }
    }
}

impl From<&str> for Sex {
    fn from(s: &str) -> Self {
        Sex::from(s.to_string())
    }
}

impl From<Sex> for String {
    fn from(sex: Sex) -> Self {
        sex.as_str().to_string()
    }
}

impl fmt::Display for Sex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Patient HIV status as recorded in the metadata table.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum HivStatus {
    Positive,
    Negative,
    Unknown,
    Unrecognized(String),
}

impl HivStatus {
    /// Wire representation of the value.
    pub fn as_str(&self) -> &str {
        match self {
            HivStatus::Positive => "positive",
            HivStatus::Negative => "negative",
            HivStatus::Unknown => "unknown",
            HivStatus::Unrecognized(s) => s,
        }
    }
}

impl From<String> for HivStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "positive" => HivStatus::Positive,
            "negative" => HivStatus::Negative,
            "unknown" => HivStatus::Unknown,
            _ => HivStatus::Unrecognized(s),
        }
    }
}

impl From<&str> for HivStatus {
    fn from(s: &str) -> Self {
        HivStatus::from(s.to_string())
    }
}

impl From<HivStatus> for String {
    fn from(status: HivStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for HivStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The owning prediction of a metadata row, as returned by the join.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OwningPrediction {
    pub label: Label,
}

/// Patient metadata, either joined from the metadata table or nested in a
/// prediction row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PatientMetadataRecord {
    /// Row identifier in the metadata table.
    #[serde(default)]
    pub id: Option<String>,
    /// Identifier of the owning prediction.
    #[serde(default)]
    pub prediction_id: Option<String>,
    #[serde(default)]
    pub age: Option<u32>,
    #[serde(default)]
    pub sex: Option<Sex>,
    #[serde(default)]
    pub hiv_status: Option<HivStatus>,
    /// Owning prediction; only its label is used.
    #[serde(default, rename = "predictions", skip_serializing_if = "Option::is_none")]
    pub owner: Option<OwningPrediction>,
}

impl PatientMetadataRecord {
    /// Label of the owning prediction, if the join supplied one.
    pub fn owner_label(&self) -> Option<&Label> {
        self.owner.as_ref().map(|o| &o.label)
    }

    /// Best identifier for diagnostics: the prediction id, then the row id.
    pub fn record_id(&self) -> &str {
        self.prediction_id
            .as_deref()
            .or(self.id.as_deref())
            .unwrap_or("")
    }
}

/// A single stored prediction.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PredictionRecord {
    pub id: String,
    pub label: Label,
    /// Confidence of `label`, in `[0, 1]`.
    pub probability: f64,
    #[serde(default)]
    pub sensitivity: Option<f64>,
    #[serde(default)]
    pub specificity: Option<f64>,
    #[serde(default)]
    pub inference_latency_ms: Option<u64>,
    /// An empty string means unreviewed.
    #[serde(default, deserialize_with = "deserialize_feedback")]
    pub clinician_feedback: Option<Feedback>,
    #[serde(default)]
    pub feedback_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    /// Scope owner, when the source exposes it.
    #[serde(default)]
    pub user_id: Option<String>,
    /// First nested patient metadata row, if any.
    #[serde(
        default,
        rename = "patient_metadata",
        deserialize_with = "deserialize_first_metadata"
    )]
    pub patient: Option<PatientMetadataRecord>,
}

impl PredictionRecord {
    /// Creates a record with only the required fields set.
    pub fn new(id: impl Into<String>, label: Label, probability: f64, created_at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            label,
            probability,
            sensitivity: None,
            specificity: None,
            inference_latency_ms: None,
            clinician_feedback: None,
            feedback_at: None,
            created_at,
            user_id: None,
            patient: None,
        }
    }

    /// Whether a clinician has left any feedback on this record.
    pub fn is_reviewed(&self) -> bool {
        self.clinician_feedback.is_some()
    }
}

fn deserialize_feedback<'de, D>(deserializer: D) -> Result<Option<Feedback>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?
        .filter(|value| !value.is_empty())
        .map(Feedback::from))
}

/// The nested relation may come back as a list, a single object, or null.
fn deserialize_first_metadata<'de, D>(
    deserializer: D,
) -> Result<Option<PatientMetadataRecord>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Nested {
        Many(Vec<PatientMetadataRecord>),
        One(PatientMetadataRecord),
    }

    Ok(match Option::<Nested>::deserialize(deserializer)? {
        Some(Nested::Many(rows)) => rows.into_iter().next(),
        Some(Nested::One(row)) => Some(row),
        None => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_from_str() {
        assert_eq!(Label::from("TB-positive"), Label::Positive);
        assert_eq!(Label::from("TB-negative"), Label::Negative);
        assert_eq!(
            Label::from("tb-positive"),
            Label::Unrecognized("tb-positive".to_string())
        );
        assert!(Label::Positive.is_positive());
        assert!(!Label::Unrecognized("x".to_string()).is_positive());
    }

    #[test]
    fn test_sex_display_name() {
        assert_eq!(Sex::Male.display_name(), "Male");
        assert_eq!(Sex::Female.display_name(), "Female");
        assert_eq!(Sex::from("x").display_name(), "X");
    }

    #[test]
    fn test_prediction_deserialize_with_nested_metadata() {
        let json = r#"{
            "id": "p1",
            "label": "TB-positive",
            "probability": 0.91,
            "sensitivity": 0.88,
            "specificity": null,
            "inference_latency_ms": 420,
            "clinician_feedback": "accept",
            "feedback_at": "2024-03-02T10:00:00Z",
            "created_at": "2024-03-01T09:30:00Z",
            "patient_metadata": [{"age": 34, "sex": "female", "hiv_status": "negative"}]
        }"#;

        let record: PredictionRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.label, Label::Positive);
        assert_eq!(record.sensitivity, Some(0.88));
        assert_eq!(record.specificity, None);
        assert_eq!(record.clinician_feedback, Some(Feedback::Accept));
        assert!(record.is_reviewed());

        let patient = record.patient.unwrap();
        assert_eq!(patient.age, Some(34));
        assert_eq!(patient.sex, Some(Sex::Female));
        assert_eq!(patient.hiv_status, Some(HivStatus::Negative));
    }

    #[test]
    fn test_prediction_deserialize_without_optional_fields() {
        let json = r#"{
            "id": "p2",
            "label": "positive?",
            "probability": 0.5,
            "created_at": "2024-03-01T09:30:00Z",
            "patient_metadata": []
        }"#;

        let record: PredictionRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.label, Label::Unrecognized("positive?".to_string()));
        assert!(record.patient.is_none());
        assert!(!record.is_reviewed());
    }

    #[test]
    fn test_empty_feedback_is_unreviewed() {
        let json = r#"{
            "id": "p3",
            "label": "TB-negative",
            "probability": 0.7,
            "clinician_feedback": "",
            "created_at": "2024-03-01T09:30:00Z"
        }"#;

        let record: PredictionRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.clinician_feedback, None);
        assert!(!record.is_reviewed());

        let json = json.replace(r#""clinician_feedback": """#, r#""clinician_feedback": null"#);
        let record: PredictionRecord = serde_json::from_str(&json).unwrap();
        assert!(!record.is_reviewed());
    }

    #[test]
    fn test_metadata_deserialize_with_owner() {
        let json = r#"{
            "id": "m1",
            "prediction_id": "p1",
            "age": 19,
            "sex": "male",
            "hiv_status": "unknown",
            "predictions": {"label": "TB-positive"}
        }"#;

        let meta: PatientMetadataRecord = serde_json::from_str(json).unwrap();
        assert_eq!(meta.owner_label(), Some(&Label::Positive));
        assert_eq!(meta.hiv_status, Some(HivStatus::Unknown));
        assert_eq!(meta.record_id(), "p1");
    }
}
