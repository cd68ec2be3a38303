//! CXR Monitor - monitoring and fairness analytics for chest X-ray TB
//! predictions.
//!
//! The core is [`analytics::compute_report`], a pure function from
//! prediction and patient-metadata records to an [`analytics::AnalyticsReport`].
//! The remaining modules feed it and render its output:
//! - `source`: load records from JSON exports or a remote store
//! - `audit`: activity-log filtering and CSV export
//! - `report`: Markdown/JSON dashboard rendering
//! - `config`/`cli`: `.cxrmonitor.toml` and command-line settings

pub mod analytics;
pub mod audit;
pub mod cli;
pub mod config;
pub mod models;
pub mod report;
pub mod source;

pub use analytics::{compute_report, compute_report_with, AnalyticsConfig, AnalyticsReport};
pub use models::{Feedback, HivStatus, Label, PatientMetadataRecord, PredictionRecord, Sex};
