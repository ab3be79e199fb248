//! # Citation Data Model
//!
//! Shared types flowing between the matcher, the heuristic classifier, the fusion
//! step and the confidence scorer. Everything here is created and discarded within
//! a single classification call.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Normalized rectangle (0.0-1.0 in both axes) reported by the OCR engine
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Vertical center of the box
    pub fn mid_y(&self) -> f64 {
        self.y + self.height / 2.0
    }
}

/// One OCR-detected text fragment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognizedTextObservation {
    /// Recognized text of the fragment
    pub text: String,
    /// Recognition confidence (0.0-1.0)
    pub confidence: f64,
    /// Location of the fragment in normalized image coordinates
    #[serde(default)]
    pub bounding_box: BoundingBox,
}

impl RecognizedTextObservation {
    pub fn new(text: impl Into<String>, confidence: f64, bounding_box: BoundingBox) -> Self {
        Self {
            text: text.into(),
            confidence,
            bounding_box,
        }
    }
}

/// Closed set of violation categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CitationType {
    Parking,
    Traffic,
    Municipal,
    RedLight,
    Speeding,
    Unknown,
}

impl CitationType {
    /// Stable identifier used in logs and metrics labels
    pub fn as_str(&self) -> &'static str {
        match self {
            CitationType::Parking => "parking",
            CitationType::Traffic => "traffic",
            CitationType::Municipal => "municipal",
            CitationType::RedLight => "red_light",
            CitationType::Speeding => "speeding",
            CitationType::Unknown => "unknown",
        }
    }

    /// Human readable label
    pub fn display_name(&self) -> &'static str {
        match self {
            CitationType::Parking => "Parking Violation",
            CitationType::Traffic => "Traffic Violation",
            CitationType::Municipal => "Municipal Violation",
            CitationType::RedLight => "Red Light Violation",
            CitationType::Speeding => "Speeding Violation",
            CitationType::Unknown => "Unknown",
        }
    }
}

/// Structured fields pulled out of citation text. Absence means "not found".
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ParsedFields {
    pub citation_number: Option<String>,
    pub violation_date: Option<NaiveDate>,
    pub amount: Option<f64>,
    pub violation_code: Option<String>,
    pub license_plate: Option<String>,
}

impl ParsedFields {
    pub fn empty() -> Self {
        Self::default()
    }
}

/// Which classifier supplied the city and citation type of a result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationSource {
    Heuristic,
    Pattern,
}

/// Output of the fusion step
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationResult {
    pub city_id: Option<String>,
    pub city_name: Option<String>,
    pub citation_type: CitationType,
    /// Fused confidence (0.0-1.0)
    pub confidence: f64,
    pub source: ClassificationSource,
    pub parsed_fields: ParsedFields,
}

impl ClassificationResult {
    pub fn is_from_heuristic_classifier(&self) -> bool {
        self.source == ClassificationSource::Heuristic
    }
}

/// One weighted signal of the confidence score
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfidenceComponent {
    pub name: String,
    pub score: f64,
    pub weight: f64,
    pub weighted_contribution: f64,
}

impl ConfidenceComponent {
    pub fn new(name: &str, score: f64, weight: f64) -> Self {
        Self {
            name: name.to_string(),
            score,
            weight,
            weighted_contribution: score * weight,
        }
    }
}

/// Coarse confidence bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceLevel {
    High,
    Medium,
    Low,
}

impl ConfidenceLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfidenceLevel::High => "high",
            ConfidenceLevel::Medium => "medium",
            ConfidenceLevel::Low => "low",
        }
    }

    pub fn requires_review(&self) -> bool {
        *self != ConfidenceLevel::High
    }

    /// User-facing confidence message
    pub fn message(&self) -> &'static str {
        match self {
            ConfidenceLevel::High => "High confidence - looks correct",
            ConfidenceLevel::Medium => "Medium confidence - please verify",
            ConfidenceLevel::Low => "Low confidence - please check and edit",
        }
    }
}

/// What the caller should do with a result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Recommendation {
    Accept,
    Review,
    Reject,
}

impl Recommendation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Recommendation::Accept => "accept",
            Recommendation::Review => "review",
            Recommendation::Reject => "reject",
        }
    }
}

/// Output of the confidence scorer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreResult {
    pub overall_confidence: f64,
    pub level: ConfidenceLevel,
    pub components: Vec<ConfidenceComponent>,
    pub recommendation: Recommendation,
    pub auto_accept_eligible: bool,
}

impl ScoreResult {
    /// Score of the named component, if it was computed
    pub fn component_score(&self, name: &str) -> Option<f64> {
        self.components
            .iter()
            .find(|component| component.name == name)
            .map(|component| component.score)
    }

    /// Sum of component weights
    pub fn total_weight(&self) -> f64 {
        self.components.iter().map(|component| component.weight).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_citation_type_serializes_snake_case() {
        let json = serde_json::to_string(&CitationType::RedLight).unwrap();
        assert_eq!(json, "\"red_light\"");
        assert_eq!(CitationType::RedLight.as_str(), "red_light");
        assert_eq!(CitationType::Speeding.display_name(), "Speeding Violation");
    }

    #[test]
    fn test_component_contribution_is_score_times_weight() {
        let component = ConfidenceComponent::new("vision_confidence", 0.8, 0.35);
        assert!((component.weighted_contribution - 0.28).abs() < 1e-12);
    }

    #[test]
    fn test_observation_deserializes_without_bounding_box() {
        let obs: RecognizedTextObservation =
            serde_json::from_str(r#"{"text":"SFMTA","confidence":0.9}"#).unwrap();
        assert_eq!(obs.bounding_box, BoundingBox::default());
    }

    #[test]
    fn test_source_flag() {
        let result = ClassificationResult {
            city_id: None,
            city_name: None,
            citation_type: CitationType::Unknown,
            confidence: 0.0,
            source: ClassificationSource::Pattern,
            parsed_fields: ParsedFields::empty(),
        };
        assert!(!result.is_from_heuristic_classifier());
    }

    #[test]
    fn test_level_requires_review() {
        assert!(!ConfidenceLevel::High.requires_review());
        assert!(ConfidenceLevel::Medium.requires_review());
        assert!(ConfidenceLevel::Low.requires_review());
    }
}
