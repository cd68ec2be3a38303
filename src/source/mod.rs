//! Prediction data sources.
//!
//! Sources materialise a [`Dataset`] in memory before the engine runs and
//! guarantee that predictions are ordered newest first.

pub mod file;
pub mod remote;

pub use file::{load_file, parse_export};
pub use remote::{RemoteOptions, RemoteSource};

use crate::models::{OwningPrediction, PatientMetadataRecord, PredictionRecord};
use std::collections::HashSet;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while fetching or decoding prediction data.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse prediction data: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Remote store returned {status} for {url}: {body}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("API key not found in environment variable {0}")]
    MissingApiKey(String),
}

/// Predictions and joined patient metadata for one scope.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    /// Newest first.
    pub predictions: Vec<PredictionRecord>,
    pub metadata: Vec<PatientMetadataRecord>,
}

impl Dataset {
    /// Build a dataset, ordering predictions newest first.
    pub fn new(mut predictions: Vec<PredictionRecord>, metadata: Vec<PatientMetadataRecord>) -> Self {
        sort_newest_first(&mut predictions);
        Self {
            predictions,
            metadata,
        }
    }

    /// Build a dataset whose metadata comes from each prediction's nested
    /// patient row, joined with that prediction's label.
    pub fn from_nested(predictions: Vec<PredictionRecord>) -> Self {
        let metadata = derive_metadata(&predictions);
        Self::new(predictions, metadata)
    }

    /// Keep only predictions owned by `user_id`, and the metadata rows
    /// linked to a kept prediction. Predictions without an owner are kept,
    /// since the source may not expose one. Metadata without a
    /// `prediction_id` cannot be attributed and is dropped.
    pub fn scoped_to(mut self, user_id: &str) -> Self {
        self.predictions
            .retain(|p| p.user_id.as_deref().map_or(true, |owner| owner == user_id));

        let kept: HashSet<&str> = self.predictions.iter().map(|p| p.id.as_str()).collect();
        self.metadata.retain(|m| {
            m.prediction_id
                .as_deref()
                .is_some_and(|id| kept.contains(id))
        });
        self
    }
}

/// Stable sort on `created_at`, newest first.
pub fn sort_newest_first(predictions: &mut [PredictionRecord]) {
    predictions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

fn derive_metadata(predictions: &[PredictionRecord]) -> Vec<PatientMetadataRecord> {
    predictions
        .iter()
        .filter_map(|p| {
            p.patient.as_ref().map(|m| PatientMetadataRecord {
                prediction_id: m.prediction_id.clone().or_else(|| Some(p.id.clone())),
                owner: Some(OwningPrediction {
                    label: p.label.clone(),
                }),
                ..m.clone()
            })
        })
        .collect()
}
