//! Report rendering modules.
//!
//! This module turns analytics results into Markdown or JSON documents.

pub mod generator;

pub use generator::{generate_json_report, generate_markdown_report, write_report, ReportMetadata};
