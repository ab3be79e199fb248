//! Observability module for tracing and metrics setup.
//!
//! This module provides:
//! - Structured logging with configurable levels
//! - Metrics collection with an in-process Prometheus recorder
//! - Recording helpers for every pipeline stage

use std::time::Duration;

use anyhow::Result;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing_subscriber::prelude::*;

use crate::models::{ClassificationResult, ScoreResult};
use crate::observability_config::ObservabilityConfig;
use crate::remediation::PreprocessingOptions;

/// Initialize tracing and metrics
///
/// Returns the Prometheus handle when metrics export is enabled.
pub fn init_observability_with_config(
    config: &ObservabilityConfig,
) -> Result<Option<PrometheusHandle>> {
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid observability configuration: {}", e))?;

    init_tracing_with_config(config)?;
    let handle = init_metrics_with_config(config)?;

    tracing::info!(
        environment = %config.environment,
        metrics_enabled = %config.enable_metrics_export,
        "Observability stack initialized successfully"
    );
    Ok(handle)
}

/// Initialize structured logging with tracing and configuration
pub fn init_tracing_with_config(config: &ObservabilityConfig) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(format!("citation_scan={}", config.log_level.to_lowercase()).parse()?);

    // Pretty for development, JSON for others
    if config.is_development()
        || std::env::var("LOG_FORMAT").unwrap_or_else(|_| "json".to_string()) == "pretty"
    {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .pretty()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_thread_names(false),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_thread_names(true),
            )
            .init();
    }

    tracing::info!(
        environment = %config.environment,
        log_level = %config.log_level,
        "Tracing initialized with structured logging"
    );
    Ok(())
}

/// Install the Prometheus recorder when metrics export is enabled
fn init_metrics_with_config(config: &ObservabilityConfig) -> Result<Option<PrometheusHandle>> {
    if !config.enable_metrics_export {
        tracing::info!("Metrics export disabled");
        return Ok(None);
    }

    let mut builder = PrometheusBuilder::new();
    for (key, value) in &config.tags {
        builder = builder.add_global_label(key.clone(), value.clone());
    }
    let handle = builder.install_recorder()?;

    tracing::info!(tag_count = config.tags.len(), "Metrics collection initialized");
    Ok(Some(handle))
}

/// Create a span covering one end-to-end analysis
pub fn analysis_span(city_hint: Option<&str>, observation_count: usize) -> tracing::Span {
    tracing::info_span!(
        "citation_analysis",
        city_hint = city_hint,
        observation_count = observation_count,
        component = "pipeline"
    )
}

/// Record fused classification metrics
pub fn record_classification_metrics(result: &ClassificationResult) {
    let source = if result.is_from_heuristic_classifier() {
        "heuristic"
    } else {
        "pattern"
    };
    let matched = if result.city_id.is_some() { "true" } else { "false" };
    metrics::counter!(
        "citation_classifications_total",
        "source" => source,
        "citation_type" => result.citation_type.as_str(),
        "city_matched" => matched
    )
    .increment(1);
    metrics::histogram!("citation_classification_confidence").record(result.confidence);
}

/// Record confidence scoring metrics
pub fn record_score_metrics(score: &ScoreResult) {
    metrics::counter!(
        "citation_scores_total",
        "level" => score.level.as_str(),
        "recommendation" => score.recommendation.as_str()
    )
    .increment(1);
    metrics::histogram!("citation_overall_confidence").record(score.overall_confidence);
}

/// Record which preprocessing steps were suggested for a retry
pub fn record_remediation_metrics(options: &PreprocessingOptions) {
    for step in options.enabled_steps() {
        metrics::counter!("citation_remediation_suggestions_total", "step" => step).increment(1);
    }
}

/// Record the duration of one pipeline stage
pub fn record_stage_duration(stage: &'static str, duration: Duration) {
    metrics::histogram!("citation_stage_duration_seconds", "stage" => stage)
        .record(duration.as_secs_f64());
}
