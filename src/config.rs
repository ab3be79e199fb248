//! # Unified Application Configuration
//!
//! This module provides a centralized configuration system that consolidates
//! the engine's tunable settings into a single, structured configuration object:
//! the confidence weight table, the level thresholds, the fusion policy and the
//! observability settings. It supports loading from environment variables and
//! JSON files, and validates everything before the engine is built.

use crate::errors::{AppError, AppResult};
use crate::observability_config::ObservabilityConfig;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

/// Tolerance on the sum of weight tables
const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// Weights of the six confidence components
///
/// A weight of `0.0` disables its component: it is neither computed nor
/// reported in the score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringWeights {
    #[serde(default)]
    pub vision_confidence: f64,
    #[serde(default)]
    pub classifier_confidence: f64,
    #[serde(default)]
    pub text_quality: f64,
    #[serde(default)]
    pub pattern_match: f64,
    #[serde(default)]
    pub layout_confidence: f64,
    #[serde(default)]
    pub observation_consistency: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self::canonical()
    }
}

impl ScoringWeights {
    /// Six-component weighting
    pub fn canonical() -> Self {
        Self {
            vision_confidence: 0.35,
            classifier_confidence: 0.20,
            text_quality: 0.15,
            pattern_match: 0.15,
            layout_confidence: 0.10,
            observation_consistency: 0.05,
        }
    }

    /// Four-component weighting used by older capture flows
    pub fn legacy() -> Self {
        Self {
            vision_confidence: 0.40,
            classifier_confidence: 0.0,
            text_quality: 0.20,
            pattern_match: 0.30,
            layout_confidence: 0.0,
            observation_consistency: 0.10,
        }
    }

    /// `(component name, weight)` pairs in reporting order
    pub fn named(&self) -> [(&'static str, f64); 6] {
        [
            ("vision_confidence", self.vision_confidence),
            ("classifier_confidence", self.classifier_confidence),
            ("text_quality", self.text_quality),
            ("pattern_match", self.pattern_match),
            ("layout_confidence", self.layout_confidence),
            ("observation_consistency", self.observation_consistency),
        ]
    }

    pub fn total(&self) -> f64 {
        self.named().iter().map(|(_, weight)| weight).sum()
    }

    /// Validate weight table
    pub fn validate(&self) -> AppResult<()> {
        for (name, weight) in self.named() {
            if !weight.is_finite() || !(0.0..=1.0).contains(&weight) {
                return Err(AppError::Config(format!(
                    "Scoring weight '{}' must be between 0.0 and 1.0, got {}",
                    name, weight
                )));
            }
        }

        let total = self.total();
        if (total - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(AppError::Config(format!(
                "Scoring weights must sum to 1.0, got {:.6}",
                total
            )));
        }

        Ok(())
    }
}

/// Confidence level boundaries
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringThresholds {
    /// Minimum overall confidence for `high` / auto-accept
    pub high: f64,
    /// Minimum overall confidence for `medium` / review
    pub medium: f64,
}

impl Default for ScoringThresholds {
    fn default() -> Self {
        Self {
            high: 0.85,
            medium: 0.60,
        }
    }
}

impl ScoringThresholds {
    /// Validate threshold ordering
    pub fn validate(&self) -> AppResult<()> {
        if !(self.medium > 0.0 && self.medium < self.high && self.high <= 1.0) {
            return Err(AppError::Config(format!(
                "Scoring thresholds must satisfy 0 < medium < high <= 1, got medium={} high={}",
                self.medium, self.high
            )));
        }
        Ok(())
    }
}

/// Policy for merging heuristic and pattern classifications
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FusionConfig {
    /// Heuristic confidence at or above which the heuristic result is used as-is
    pub heuristic_threshold: f64,
    pub heuristic_weight: f64,
    pub pattern_weight: f64,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            heuristic_threshold: 0.6,
            heuristic_weight: 0.6,
            pattern_weight: 0.4,
        }
    }
}

impl FusionConfig {
    /// Validate fusion configuration
    pub fn validate(&self) -> AppResult<()> {
        if !(0.0..=1.0).contains(&self.heuristic_threshold) {
            return Err(AppError::Config(format!(
                "Fusion heuristic threshold must be between 0.0 and 1.0, got {}",
                self.heuristic_threshold
            )));
        }

        if !self.heuristic_weight.is_finite() || !self.pattern_weight.is_finite() {
            return Err(AppError::Config(
                "Fusion weights must be finite numbers".to_string(),
            ));
        }

        if self.heuristic_weight < 0.0 || self.pattern_weight < 0.0 {
            return Err(AppError::Config(
                "Fusion weights cannot be negative".to_string(),
            ));
        }

        let total = self.heuristic_weight + self.pattern_weight;
        if (total - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(AppError::Config(format!(
                "Fusion weights must sum to 1.0, got {:.6}",
                total
            )));
        }

        Ok(())
    }
}

/// On-disk shape of `config/scoring_weights.json`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringWeightsFile {
    pub scoring_weights: ScoringWeights,
}

/// Read and validate a weight table from a JSON file
pub fn load_scoring_weights_from_path(path: impl AsRef<Path>) -> AppResult<ScoringWeights> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| {
        AppError::Config(format!(
            "Failed to read scoring weights from '{}': {}",
            path.display(),
            e
        ))
    })?;
    let file: ScoringWeightsFile = serde_json::from_str(&content).map_err(|e| {
        AppError::Config(format!(
            "Failed to parse scoring weights from '{}': {}",
            path.display(),
            e
        ))
    })?;
    file.scoring_weights.validate()?;
    Ok(file.scoring_weights)
}

/// Load the scoring weight table
///
/// `SCORING_WEIGHTS_CONFIG_PATH` is tried first, then the Docker, local and test
/// paths. A file that cannot be read, parsed or validated is skipped; when no
/// file is usable the canonical weighting is returned.
pub fn load_scoring_weights_config() -> ScoringWeights {
    // First, try to get path from environment variable
    if let Ok(config_path) = env::var("SCORING_WEIGHTS_CONFIG_PATH") {
        info!(
            "Loading scoring weights config from environment variable: {}",
            config_path
        );
        match load_scoring_weights_from_path(&config_path) {
            Ok(weights) => {
                info!("Successfully loaded scoring weights config from: {}", config_path);
                return weights;
            }
            Err(e) => {
                warn!("{}. Falling back to default paths.", e);
            }
        }
    }

    let possible_paths = [
        "/app/config/scoring_weights.json", // Docker path
        "config/scoring_weights.json",      // Local development path
        "../config/scoring_weights.json",   // Test path
    ];

    for config_path in &possible_paths {
        if !Path::new(config_path).exists() {
            continue;
        }
        match load_scoring_weights_from_path(config_path) {
            Ok(weights) => {
                info!(
                    "Successfully loaded scoring weights config from fallback path: {}",
                    config_path
                );
                return weights;
            }
            Err(e) => {
                warn!("{}. Trying next path.", e);
            }
        }
    }

    warn!("No scoring weights config file found in any expected location. Using canonical weights.");
    ScoringWeights::canonical()
}

fn parse_env_f64(name: &str, default: f64) -> AppResult<f64> {
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| AppError::Config(format!("{} must be a valid number", name))),
        Err(_) => Ok(default),
    }
}

/// Unified application configuration
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    /// Confidence component weights
    pub scoring_weights: ScoringWeights,
    /// Confidence level thresholds
    pub scoring_thresholds: ScoringThresholds,
    /// Heuristic/pattern fusion policy
    pub fusion: FusionConfig,
    /// Observability configuration
    pub observability: ObservabilityConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> AppResult<Self> {
        let defaults = ScoringThresholds::default();
        let scoring_thresholds = ScoringThresholds {
            high: parse_env_f64("SCORING_HIGH_THRESHOLD", defaults.high)?,
            medium: parse_env_f64("SCORING_MEDIUM_THRESHOLD", defaults.medium)?,
        };

        let fusion_defaults = FusionConfig::default();
        let fusion = FusionConfig {
            heuristic_threshold: parse_env_f64(
                "FUSION_HEURISTIC_THRESHOLD",
                fusion_defaults.heuristic_threshold,
            )?,
            ..fusion_defaults
        };

        Ok(Self {
            scoring_weights: load_scoring_weights_config(),
            scoring_thresholds,
            fusion,
            observability: ObservabilityConfig::from_env(),
        })
    }

    /// Validate all configuration sections
    pub fn validate(&self) -> AppResult<()> {
        self.scoring_weights.validate()?;
        self.scoring_thresholds.validate()?;
        self.fusion.validate()?;
        self.observability.validate()?;
        Ok(())
    }

    /// Get a summary of the current configuration for logging
    pub fn summary(&self) -> String {
        format!(
            "Configuration: weights=[vision={}, classifier={}, text={}, pattern={}, layout={}, consistency={}], high_threshold={}, medium_threshold={}, heuristic_threshold={}, environment={}",
            self.scoring_weights.vision_confidence,
            self.scoring_weights.classifier_confidence,
            self.scoring_weights.text_quality,
            self.scoring_weights.pattern_match,
            self.scoring_weights.layout_confidence,
            self.scoring_weights.observation_consistency,
            self.scoring_thresholds.high,
            self.scoring_thresholds.medium,
            self.fusion.heuristic_threshold,
            self.observability.environment
        )
    }
}
