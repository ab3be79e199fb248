use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;

use anyhow::{Context, Result};
use citation_scan::config::{load_scoring_weights_from_path, AppConfig};
use citation_scan::errors::error_logging;
use citation_scan::observability;
use citation_scan::pipeline::{CitationEngine, ScanInput};
use clap::Parser;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "citation-scan")]
#[command(version, about = "Classify and score OCR-scanned parking and traffic citations", long_about = None)]
struct Cli {
    /// Scan JSON file (reads stdin when omitted)
    #[arg(short, long, env = "CITATION_SCAN_INPUT")]
    input: Option<PathBuf>,

    /// City id whose pattern is tried first
    #[arg(long, env = "CITATION_CITY_HINT")]
    city_hint: Option<String>,

    /// Scoring weights JSON file
    #[arg(long, env = "SCORING_WEIGHTS_CONFIG_PATH")]
    weights: Option<PathBuf>,

    /// Pretty-print the JSON output
    #[arg(long)]
    pretty: bool,

    /// Print Prometheus metrics to stderr after the analysis
    #[arg(long)]
    print_metrics: bool,

    /// Print the synthetic heuristic training set instead of analyzing a scan
    #[arg(long)]
    export_training_data: bool,
}

/// Load and validate configuration at startup
fn load_configuration(cli: &Cli) -> Result<AppConfig> {
    let mut config = AppConfig::from_env().map_err(|e| {
        error_logging::log_config_error(&e, "environment", "load_configuration");
        anyhow::anyhow!("Failed to load configuration: {}", e)
    })?;

    if let Some(path) = &cli.weights {
        config.scoring_weights = load_scoring_weights_from_path(path).map_err(|e| {
            error_logging::log_config_error(&e, "scoring_weights", "load_configuration");
            anyhow::anyhow!("Failed to load scoring weights: {}", e)
        })?;
    }

    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid configuration: {}", e))?;
    info!("Configuration validated successfully");
    Ok(config)
}

fn read_input(path: Option<&PathBuf>) -> Result<String> {
    match path {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("Failed to read scan input from {}", path.display())),
        None => {
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .context("Failed to read scan input from stdin")?;
            Ok(buffer)
        }
    }
}

fn to_json<T: serde::Serialize>(value: &T, pretty: bool) -> Result<String> {
    let json = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    Ok(json)
}

fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = load_configuration(&cli)?;

    let mut observability_config = config.observability.clone();
    observability_config.enable_metrics_export =
        observability_config.enable_metrics_export && cli.print_metrics;
    let metrics_handle = observability::init_observability_with_config(&observability_config)?;

    let engine = CitationEngine::with_config(&config)
        .map_err(|e| anyhow::anyhow!("Failed to build citation engine: {}", e))?;

    if cli.export_training_data {
        let examples = engine.classifier().export_training_data();
        info!(example_count = examples.len(), "Exporting heuristic training data");
        println!("{}", to_json(&examples, cli.pretty)?);
        return Ok(());
    }

    let raw = read_input(cli.input.as_ref())?;
    let scan: ScanInput = serde_json::from_str(&raw).map_err(|e| {
        error_logging::log_validation_error(&e, "parse_scan_input", "json", Some(raw.as_str()));
        anyhow::anyhow!("Invalid scan input: {}", e)
    })?;

    let analysis = engine.analyze(&scan.full_text(), &scan.observations, cli.city_hint.as_deref());
    println!("{}", to_json(&analysis, cli.pretty)?);

    if let Some(handle) = metrics_handle {
        eprintln!("{}", handle.render());
    }

    Ok(())
}
