//! CXR Monitor - monitoring and fairness analytics for TB predictions
//!
//! A CLI tool that loads stored chest X-ray predictions, computes quality,
//! workflow and fairness metrics, and writes a dashboard report.
//!
//! Exit codes:
//!   0 - Success (no alerts, or no --fail-on-alert set)
//!   1 - Runtime error (missing source, unreadable data, config, etc.)
//!   2 - Alerts fired and --fail-on-alert is set

use anyhow::{bail, Context, Result};
use chrono::Utc;
use cxrmonitor::audit::{self, AuditSummary};
use cxrmonitor::cli::{Args, OutputFormat};
use cxrmonitor::config::{Config, CONFIG_FILE_NAME};
use cxrmonitor::report::{self, ReportMetadata};
use cxrmonitor::source::{self, Dataset, RemoteOptions, RemoteSource};
use std::path::Path;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    init_logging(&args);

    info!("cxrmonitor v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    match run_monitoring(args).await {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Monitoring run failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .cxrmonitor.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(CONFIG_FILE_NAME);

    if path.exists() {
        eprintln!("⚠️  {} already exists. Remove it first or edit it manually.", CONFIG_FILE_NAME);
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", CONFIG_FILE_NAME))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE_NAME);
    println!("   Edit it to set the data source, alert thresholds and export path.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args) {
    let level = args.log_level();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

/// Run the complete monitoring workflow. Returns exit code (0 or 2).
async fn run_monitoring(args: Args) -> Result<i32> {
    let mut config = load_config(&args)?;
    config.merge_with_args(&args);

    // Step 1: Materialise the records
    let (dataset, source_label) = load_dataset(&config, args.quiet).await?;
    info!(
        "Loaded {} predictions and {} metadata rows",
        dataset.predictions.len(),
        dataset.metadata.len()
    );

    // Step 2: Compute analytics
    let analytics_config = config.analytics_config();
    let analytics = cxrmonitor::compute_report_with(
        &dataset.predictions,
        &dataset.metadata,
        &analytics_config,
    );
    for anomaly in &analytics.anomalies {
        warn!(
            "Record {} has unrecognized {} value '{}'",
            anomaly.record_id, anomaly.field, anomaly.value
        );
    }

    // Step 3: Render and save the report
    let metadata = ReportMetadata {
        source: source_label,
        clinician_id: config.source.clinician_id.clone(),
        generated_at: Utc::now(),
        audit: AuditSummary::from_records(&dataset.predictions),
    };

    let output = match args.format {
        OutputFormat::Json => report::generate_json_report(&metadata, &analytics)?,
        OutputFormat::Markdown => report::generate_markdown_report(&metadata, &analytics),
    };
    let output_path = Path::new(&config.general.output);
    report::write_report(&output, output_path)?;

    // Step 4: Optional audit export
    if let Some(ref csv_path) = config.export.audit_csv {
        let filter = args.audit_filter();
        let rows = filter.apply(&dataset.predictions);
        audit::write_csv(rows.iter().copied(), csv_path)?;
        println!(
            "📄 Audit log: {} of {} records written to {}",
            rows.len(),
            dataset.predictions.len(),
            csv_path.display()
        );
    }

    // Print summary
    let m = &analytics.metrics;
    println!("\n📊 Monitoring Summary:");
    println!(
        "   Predictions: {} ({:.1}% positive)",
        m.total_predictions, m.positive_rate
    );
    println!(
        "   Sensitivity: {:.1}% | Specificity: {:.1}% | Avg latency: {}ms",
        m.sensitivity * 100.0,
        m.specificity * 100.0,
        m.avg_latency_ms
    );
    println!(
        "   Reviewed: {:.0}% (accept {:.1}% | override {:.1}% | flag {:.1}%)",
        m.feedback_rate, m.accept_rate, m.override_rate, m.flag_rate
    );
    for alert in &analytics.alerts {
        println!("   ⚠️  {}", alert);
    }
    println!("\n✅ Report saved to: {}", output_path.display());

    if args.fail_on_alert && analytics.has_alerts() {
        eprintln!(
            "\n⛔ {} alert(s) fired. Failing (exit code 2).",
            analytics.alerts.len()
        );
        return Ok(2);
    }

    Ok(0)
}

/// Load records from the configured source.
async fn load_dataset(config: &Config, quiet: bool) -> Result<(Dataset, String)> {
    let source_config = &config.source;

    if let Some(ref input) = source_config.input {
        println!("📥 Reading predictions: {}", input.display());
        let mut dataset = source::load_file(input).await?;
        if let Some(ref clinician) = source_config.clinician_id {
            dataset = dataset.scoped_to(clinician);
        }
        return Ok((dataset, input.display().to_string()));
    }

    if let Some(ref remote_url) = source_config.remote_url {
        println!("📥 Fetching predictions: {}", remote_url);
        let mut options = RemoteOptions::from_env(remote_url, &source_config.api_key_env)?;
        options.clinician_id = source_config.clinician_id.clone();
        options.timeout_seconds = source_config.timeout_seconds;
        options.show_progress = !quiet;

        let dataset = RemoteSource::new(options)?.fetch().await?;
        return Ok((dataset, remote_url.clone()));
    }

    bail!("No data source configured. Use --input, --remote, or set [source] in {}", CONFIG_FILE_NAME)
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from {}", CONFIG_FILE_NAME);
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {}", e);
            Ok(Config::default())
        }
    }
}
