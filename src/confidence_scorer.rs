//! # Confidence Scorer
//!
//! Multi-signal confidence for one scanned citation. Each signal is scored in
//! `[0, 1]` and weighted by the injected [`ScoringWeights`]:
//!
//! | component | signal |
//! |---|---|
//! | `vision_confidence` | mean OCR confidence of the observations |
//! | `classifier_confidence` | text quality and token validity of the observation text |
//! | `text_quality` | length plausibility and alphanumeric ratio of the candidate |
//! | `pattern_match` | tier of the matched city pattern |
//! | `layout_confidence` | regularity of vertical spacing between observations |
//! | `observation_consistency` | spread of the per-observation confidences |
//!
//! Zero-weight components are skipped, so the reported weights always sum to
//! the table total of 1.0.

use std::ops::RangeInclusive;

use tracing::debug;

use crate::city_patterns::CityPattern;
use crate::config::{ScoringThresholds, ScoringWeights};
use crate::errors::AppResult;
use crate::heuristic_classifier::{assess_text_quality, ILLEGIBLE_GLYPHS};
use crate::models::{
    ConfidenceComponent, ConfidenceLevel, Recommendation, RecognizedTextObservation, ScoreResult,
};

/// Plausible candidate length when no pattern matched
const DEFAULT_EXPECTED_LENGTH: RangeInclusive<usize> = 6..=12;
/// Distance from the expected range still considered "close"
const LENGTH_TOLERANCE: usize = 2;
const NO_PATTERN_SCORE: f64 = 0.5;
const MIN_TOKEN_LENGTH: usize = 2;
const TOKEN_PUNCTUATION: &[char] = &['$', '.', '/', '-', ':', ',', '#'];

/// Computes [`ScoreResult`]s from OCR observations
#[derive(Debug, Clone, Default)]
pub struct ConfidenceScorer {
    weights: ScoringWeights,
    thresholds: ScoringThresholds,
}

impl ConfidenceScorer {
    /// Scorer with the canonical weights and default thresholds
    pub fn new() -> Self {
        Self::default()
    }

    /// Scorer with an injected weight table
    pub fn with_weights(weights: ScoringWeights) -> AppResult<Self> {
        Self::with_config(weights, ScoringThresholds::default())
    }

    pub fn with_config(weights: ScoringWeights, thresholds: ScoringThresholds) -> AppResult<Self> {
        weights.validate()?;
        thresholds.validate()?;
        Ok(Self {
            weights,
            thresholds,
        })
    }

    pub fn weights(&self) -> &ScoringWeights {
        &self.weights
    }

    pub fn thresholds(&self) -> &ScoringThresholds {
        &self.thresholds
    }

    /// Score a scan
    ///
    /// `text` is the candidate citation string and `matched_pattern` the city
    /// pattern it matched, if any. An empty observation list scores zero and is
    /// rejected.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use citation_scan::confidence_scorer::ConfidenceScorer;
    /// use citation_scan::models::{BoundingBox, ConfidenceLevel, RecognizedTextObservation};
    ///
    /// let observations = vec![
    ///     RecognizedTextObservation::new("SFMTA", 0.95, BoundingBox::new(0.1, 0.1, 0.3, 0.05)),
    ///     RecognizedTextObservation::new("12345678", 0.92, BoundingBox::new(0.1, 0.2, 0.3, 0.05)),
    /// ];
    /// let score = ConfidenceScorer::new().score(&observations, "SFMTA12345678", None);
    /// assert!(score.overall_confidence > 0.6);
    /// assert_ne!(score.level, ConfidenceLevel::Low);
    /// ```
    pub fn score(
        &self,
        observations: &[RecognizedTextObservation],
        text: &str,
        matched_pattern: Option<&CityPattern>,
    ) -> ScoreResult {
        if observations.is_empty() {
            debug!("No observations to score");
            return ScoreResult {
                overall_confidence: 0.0,
                level: ConfidenceLevel::Low,
                components: Vec::new(),
                recommendation: Recommendation::Reject,
                auto_accept_eligible: false,
            };
        }

        let components: Vec<ConfidenceComponent> = self
            .weights
            .named()
            .into_iter()
            .filter(|(_, weight)| *weight > 0.0)
            .map(|(name, weight)| {
                let score = match name {
                    "vision_confidence" => vision_confidence(observations),
                    "classifier_confidence" => classifier_confidence(observations),
                    "text_quality" => candidate_text_quality(text, matched_pattern),
                    "pattern_match" => pattern_match_score(matched_pattern),
                    "layout_confidence" => layout_confidence(observations),
                    _ => observation_consistency(observations),
                };
                ConfidenceComponent::new(name, score.clamp(0.0, 1.0), weight)
            })
            .collect();

        let overall_confidence = components
            .iter()
            .map(|component| component.weighted_contribution)
            .sum::<f64>()
            .clamp(0.0, 1.0);

        let (level, recommendation) = self.classify(overall_confidence);

        debug!(
            overall_confidence,
            level = level.as_str(),
            recommendation = recommendation.as_str(),
            component_count = components.len(),
            "Confidence score computed"
        );

        ScoreResult {
            overall_confidence,
            level,
            components,
            recommendation,
            auto_accept_eligible: level == ConfidenceLevel::High,
        }
    }

    /// Map an overall confidence onto a level and a recommendation
    pub fn classify(&self, overall_confidence: f64) -> (ConfidenceLevel, Recommendation) {
        if overall_confidence >= self.thresholds.high {
            (ConfidenceLevel::High, Recommendation::Accept)
        } else if overall_confidence >= self.thresholds.medium {
            (ConfidenceLevel::Medium, Recommendation::Review)
        } else {
            (ConfidenceLevel::Low, Recommendation::Reject)
        }
    }
}

/// Whether a confidence reaches the default auto-accept threshold
pub fn meets_auto_accept_threshold(confidence: f64) -> bool {
    confidence >= ScoringThresholds::default().high
}

/// Whether a confidence needs human review under the default thresholds
pub fn requires_review(confidence: f64) -> bool {
    !meets_auto_accept_threshold(confidence)
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let avg = mean(values);
    let variance = values.iter().map(|v| (v - avg).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

fn confidences(observations: &[RecognizedTextObservation]) -> Vec<f64> {
    observations.iter().map(|o| o.confidence).collect()
}

fn vision_confidence(observations: &[RecognizedTextObservation]) -> f64 {
    mean(&confidences(observations))
}

fn classifier_confidence(observations: &[RecognizedTextObservation]) -> f64 {
    let joined = observations
        .iter()
        .map(|o| o.text.as_str())
        .collect::<Vec<_>>()
        .join(" ");
    (assess_text_quality(&joined) + token_validity(&joined)) / 2.0
}

/// Share of whitespace tokens that look like legible citation text
fn token_validity(text: &str) -> f64 {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    if tokens.is_empty() {
        return 0.0;
    }
    let valid = tokens
        .iter()
        .filter(|token| {
            token.chars().count() >= MIN_TOKEN_LENGTH
                && !token.contains(ILLEGIBLE_GLYPHS)
                && token
                    .chars()
                    .all(|c| c.is_alphanumeric() || TOKEN_PUNCTUATION.contains(&c))
        })
        .count();
    valid as f64 / tokens.len() as f64
}

fn candidate_text_quality(text: &str, matched_pattern: Option<&CityPattern>) -> f64 {
    let expected = matched_pattern
        .map(|pattern| pattern.expected_length.clone())
        .unwrap_or(DEFAULT_EXPECTED_LENGTH);
    (length_plausibility(text, &expected) + alphanumeric_ratio(text)) / 2.0
}

fn length_plausibility(text: &str, expected: &RangeInclusive<usize>) -> f64 {
    let length = text.chars().count();
    if length == 0 {
        return 0.0;
    }
    if expected.contains(&length) {
        return 1.0;
    }
    let distance = if length < *expected.start() {
        expected.start() - length
    } else {
        length - expected.end()
    };
    if distance <= LENGTH_TOLERANCE {
        0.7
    } else {
        0.4
    }
}

fn alphanumeric_ratio(text: &str) -> f64 {
    let total = text.chars().count();
    if total == 0 {
        return 0.0;
    }
    text.chars().filter(|c| c.is_alphanumeric()).count() as f64 / total as f64
}

fn pattern_match_score(matched_pattern: Option<&CityPattern>) -> f64 {
    match matched_pattern.map(|pattern| pattern.priority) {
        Some(1) => 0.95,
        Some(2) => 0.90,
        Some(3) => 0.80,
        Some(_) => 0.70,
        None => NO_PATTERN_SCORE,
    }
}

/// Regularity of line spacing: 1 - coefficient of variation of the gaps
fn layout_confidence(observations: &[RecognizedTextObservation]) -> f64 {
    let mut mids: Vec<f64> = observations
        .iter()
        .map(|o| o.bounding_box.mid_y())
        .collect();
    mids.sort_by(|a, b| a.total_cmp(b));

    let gaps: Vec<f64> = mids.windows(2).map(|pair| pair[1] - pair[0]).collect();
    if gaps.len() < 2 {
        return 1.0;
    }
    let mean_gap = mean(&gaps);
    if mean_gap.abs() < f64::EPSILON {
        return 1.0;
    }
    (1.0 - std_dev(&gaps) / mean_gap).clamp(0.0, 1.0)
}

fn observation_consistency(observations: &[RecognizedTextObservation]) -> f64 {
    if observations.len() <= 1 {
        return 1.0;
    }
    (1.0 - 2.0 * std_dev(&confidences(observations))).max(0.0)
}
