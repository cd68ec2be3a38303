//! Remote prediction store exposing a PostgREST-style API.

use super::{Dataset, SourceError};
use crate::models::{PatientMetadataRecord, PredictionRecord};
use indicatif::{ProgressBar, ProgressStyle};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, info};

/// Connection settings for the remote store.
#[derive(Debug, Clone)]
pub struct RemoteOptions {
    /// Project base URL, e.g. `https://project.example.co`.
    pub base_url: String,
    pub api_key: String,
    /// Restrict predictions to one clinician.
    pub clinician_id: Option<String>,
    pub timeout_seconds: u64,
    pub show_progress: bool,
}

impl RemoteOptions {
    /// Options with the API key read from `api_key_env`.
    pub fn from_env(base_url: &str, api_key_env: &str) -> Result<Self, SourceError> {
        let api_key = std::env::var(api_key_env)
            .map_err(|_| SourceError::MissingApiKey(api_key_env.to_string()))?;

        Ok(Self {
            base_url: base_url.to_string(),
            api_key,
            clinician_id: None,
            timeout_seconds: 30,
            show_progress: true,
        })
    }
}

/// Client for the remote prediction store.
pub struct RemoteSource {
    options: RemoteOptions,
    http_client: reqwest::Client,
}

impl RemoteSource {
    pub fn new(options: RemoteOptions) -> Result<Self, SourceError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(options.timeout_seconds))
            .build()
            .map_err(|source| SourceError::Http {
                url: options.base_url.clone(),
                source,
            })?;

        Ok(Self {
            options,
            http_client,
        })
    }

    /// URL listing predictions, newest first, with nested patient rows.
    pub fn predictions_url(&self) -> String {
        format!(
            "{}/rest/v1/predictions?select=*,patient_metadata(*)&order=created_at.desc",
            self.options.base_url.trim_end_matches('/')
        )
    }

    /// URL listing metadata rows joined with their prediction's label.
    pub fn metadata_url(&self) -> String {
        format!(
            "{}/rest/v1/patient_metadata?select=*,predictions!inner(label)",
            self.options.base_url.trim_end_matches('/')
        )
    }

    /// Fetch predictions and metadata concurrently.
    pub async fn fetch(&self) -> Result<Dataset, SourceError> {
        info!("Fetching predictions from {}", self.options.base_url);

        let spinner = self.options.show_progress.then(|| {
            let pb = ProgressBar::new_spinner();
            pb.set_style(
                ProgressStyle::default_spinner()
                    .template("{spinner:.green} [{elapsed_precise}] {msg}")
                    .unwrap(),
            );
            pb.set_message("Fetching prediction records...");
            pb.enable_steady_tick(Duration::from_millis(120));
            pb
        });

        let predictions_url = self.predictions_url();
        let metadata_url = self.metadata_url();
        let result = futures::try_join!(
            self.get_json::<Vec<PredictionRecord>>(&predictions_url, "user_id"),
            self.get_json::<Vec<PatientMetadataRecord>>(&metadata_url, "predictions.user_id"),
        );

        if let Some(pb) = spinner {
            pb.finish_and_clear();
        }

        let (predictions, metadata) = result?;
        debug!(
            "Fetched {} predictions and {} metadata rows",
            predictions.len(),
            metadata.len()
        );

        Ok(Dataset::new(predictions, metadata))
    }

    /// PostgREST equality filter on `column` when scoped to a clinician.
    fn scope_filter(&self, column: &str) -> Vec<(String, String)> {
        self.options
            .clinician_id
            .iter()
            .map(|id| (column.to_string(), format!("eq.{}", id)))
            .collect()
    }

    /// Authenticated GET, with the clinician filter encoded into the query.
    fn request(&self, url: &str, scope_column: &str) -> reqwest::RequestBuilder {
        self.http_client
            .get(url)
            .query(&self.scope_filter(scope_column))
            .header("apikey", &self.options.api_key)
            .bearer_auth(&self.options.api_key)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        scope_column: &str,
    ) -> Result<T, SourceError> {
        let http_err = |source: reqwest::Error| SourceError::Http {
            url: url.to_string(),
            source,
        };

        let response = self
            .request(url, scope_column)
            .send()
            .await
            .map_err(http_err)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SourceError::Status {
                url: url.to_string(),
                status,
                body,
            });
        }

        let body = response.text().await.map_err(http_err)?;
        Ok(serde_json::from_str(&body)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(clinician: Option<&str>) -> RemoteOptions {
        RemoteOptions {
            base_url: "https://store.example.org/".to_string(),
            api_key: "key".to_string(),
            clinician_id: clinician.map(String::from),
            timeout_seconds: 5,
            show_progress: false,
        }
    }

    #[test]
    fn test_predictions_url() {
        let source = RemoteSource::new(options(None)).unwrap();
        assert_eq!(
            source.predictions_url(),
            "https://store.example.org/rest/v1/predictions?select=*,patient_metadata(*)&order=created_at.desc"
        );

        let source = RemoteSource::new(options(Some("u-42"))).unwrap();
        assert!(!source.predictions_url().contains("user_id"));
    }

    fn built_url(source: &RemoteSource, url: &str, scope_column: &str) -> String {
        source
            .request(url, scope_column)
            .build()
            .unwrap()
            .url()
            .to_string()
    }

    #[test]
    fn test_requests_scoped_to_clinician() {
        let source = RemoteSource::new(options(Some("u-42"))).unwrap();

        let predictions = built_url(&source, &source.predictions_url(), "user_id");
        assert!(predictions.contains("order=created_at.desc"));
        assert!(predictions.ends_with("&user_id=eq.u-42"));

        let metadata = built_url(&source, &source.metadata_url(), "predictions.user_id");
        assert!(metadata.contains("predictions!inner(label)"));
        assert!(metadata.ends_with("&predictions.user_id=eq.u-42"));
    }

    #[test]
    fn test_unscoped_requests_have_no_filter() {
        let source = RemoteSource::new(options(None)).unwrap();
        let url = built_url(&source, &source.predictions_url(), "user_id");
        assert!(url.ends_with("order=created_at.desc"));
        assert!(!url.contains("user_id"));
    }

    #[test]
    fn test_clinician_filter_is_encoded() {
        let source = RemoteSource::new(options(Some("a&b,c)"))).unwrap();
        let url = built_url(&source, &source.predictions_url(), "user_id");
        assert!(url.ends_with("&user_id=eq.a%26b%2Cc%29"));
    }

    #[test]
    fn test_metadata_url() {
        let source = RemoteSource::new(options(None)).unwrap();
        assert_eq!(
            source.metadata_url(),
            "https://store.example.org/rest/v1/patient_metadata?select=*,predictions!inner(label)"
        );
    }

    #[test]
    fn test_missing_api_key() {
        let err = RemoteOptions::from_env(
            "https://store.example.org",
            "CXRMONITOR_TEST_KEY_THAT_IS_NOT_SET",
        )
        .unwrap_err();
        assert!(matches!(err, SourceError::MissingApiKey(_)));
    }
}
