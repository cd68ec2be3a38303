//! JSON export files.
//!
//! Accepted shapes:
//! - `{ "predictions": [...], "metadata": [...] }`
//! - `{ "predictions": [...] }` with nested `patient_metadata`
//! - a bare array of predictions

use super::{Dataset, SourceError};
use crate::models::{PatientMetadataRecord, PredictionRecord};
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, info};

#[derive(Deserialize)]
#[serde(untagged)]
enum ExportDocument {
    Bundle {
        predictions: Vec<PredictionRecord>,
        #[serde(default)]
        metadata: Option<Vec<PatientMetadataRecord>>,
    },
    Predictions(Vec<PredictionRecord>),
}

/// Decode an export document.
pub fn parse_export(content: &str) -> Result<Dataset, SourceError> {
    let document: ExportDocument = serde_json::from_str(content)?;

    let dataset = match document {
        ExportDocument::Bundle {
            predictions,
            metadata: Some(metadata),
        } => Dataset::new(predictions, metadata),
        ExportDocument::Bundle {
            predictions,
            metadata: None,
        }
        | ExportDocument::Predictions(predictions) => Dataset::from_nested(predictions),
    };

    debug!(
        "Parsed export: {} predictions, {} metadata rows",
        dataset.predictions.len(),
        dataset.metadata.len()
    );
    Ok(dataset)
}

/// Read and decode an export file.
pub async fn load_file(path: &Path) -> Result<Dataset, SourceError> {
    info!("Loading predictions from {}", path.display());

    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| SourceError::Io {
            path: path.to_path_buf(),
            source,
        })?;

    parse_export(&content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Label;
    use tempfile::TempDir;

    const BUNDLE: &str = r#"{
        "predictions": [
            {"id": "a", "label": "TB-negative", "probability": 0.8, "created_at": "2024-01-01T00:00:00Z"},
            {"id": "b", "label": "TB-positive", "probability": 0.9, "created_at": "2024-01-02T00:00:00Z"}
        ],
        "metadata": [
            {"id": "m1", "prediction_id": "b", "age": 66, "sex": "male", "hiv_status": "positive",
             "predictions": {"label": "TB-positive"}}
        ]
    }"#;

    #[test]
    fn test_parse_bundle() {
        let dataset = parse_export(BUNDLE).unwrap();
        assert_eq!(dataset.predictions[0].id, "b");
        assert_eq!(dataset.metadata.len(), 1);
        assert_eq!(dataset.metadata[0].owner_label(), Some(&Label::Positive));
    }

    #[test]
    fn test_parse_bare_array_with_nested_metadata() {
        let json = r#"[
            {"id": "a", "label": "TB-positive", "probability": 0.8, "created_at": "2024-01-01T00:00:00Z",
             "patient_metadata": [{"age": 12, "sex": "female", "hiv_status": "unknown"}]}
        ]"#;

        let dataset = parse_export(json).unwrap();
        assert_eq!(dataset.predictions.len(), 1);
        assert_eq!(dataset.metadata.len(), 1);
        assert_eq!(dataset.metadata[0].age, Some(12));
    }

    #[test]
    fn test_parse_invalid() {
        let err = parse_export("{\"nope\": 1}").unwrap_err();
        assert!(matches!(err, SourceError::Parse(_)));
    }

    #[test]
    fn test_load_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("export.json");
        std::fs::write(&path, BUNDLE).unwrap();

        let dataset = tokio_test::block_on(load_file(&path)).unwrap();
        assert_eq!(dataset.predictions.len(), 2);
    }

    #[test]
    fn test_load_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("missing.json");

        let err = tokio_test::block_on(load_file(&path)).unwrap_err();
        assert!(matches!(err, SourceError::Io { .. }));
        assert!(err.to_string().contains("missing.json"));
    }
}
