//! # Classification Fusion
//!
//! Merges the heuristic classification with the pattern-matcher result into a
//! single [`ClassificationResult`].
//!
//! A confident heuristic result (`confidence >= heuristic_threshold`) is used
//! as-is. Otherwise the confidences are blended
//! `heuristic_weight * h + pattern_weight * p` and the stronger side supplies
//! city and type, with the other side filling any gap.

use tracing::debug;

use crate::config::FusionConfig;
use crate::heuristic_classifier::HeuristicClassification;
use crate::models::{CitationType, ClassificationResult, ClassificationSource, ParsedFields};
use crate::pattern_matcher::ParsingResult;

/// Combines heuristic and pattern classifications
#[derive(Debug, Clone, Default)]
pub struct FusionCombiner {
    config: FusionConfig,
}

impl FusionCombiner {
    pub fn new(config: FusionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FusionConfig {
        &self.config
    }

    /// Fuse both classifications
    ///
    /// `parsed_fields` comes from field extraction over the pattern match and is
    /// always carried through unchanged.
    pub fn combine(
        &self,
        heuristic: &HeuristicClassification,
        parsing: &ParsingResult,
        parsed_fields: ParsedFields,
    ) -> ClassificationResult {
        let pattern = pattern_classification(parsing, parsed_fields.clone());

        if heuristic.confidence >= self.config.heuristic_threshold {
            debug!(
                confidence = heuristic.confidence,
                threshold = self.config.heuristic_threshold,
                "Using heuristic classification directly"
            );
            return ClassificationResult {
                city_id: heuristic.city_id.clone(),
                city_name: heuristic.city_name.clone(),
                citation_type: heuristic.citation_type,
                confidence: heuristic.confidence.clamp(0.0, 1.0),
                source: ClassificationSource::Heuristic,
                parsed_fields,
            };
        }

        let merged = (self.config.heuristic_weight * heuristic.confidence
            + self.config.pattern_weight * pattern.confidence)
            .clamp(0.0, 1.0);

        let heuristic_leads = heuristic.confidence > pattern.confidence;

        let (city_id, city_name) = {
            let heuristic_city = (heuristic.city_id.clone(), heuristic.city_name.clone());
            let pattern_city = (pattern.city_id.clone(), pattern.city_name.clone());
            let (primary, secondary) = if heuristic_leads {
                (heuristic_city, pattern_city)
            } else {
                (pattern_city, heuristic_city)
            };
            if primary.0.is_some() {
                primary
            } else {
                secondary
            }
        };

        let citation_type = {
            let (primary, secondary) = if heuristic_leads {
                (heuristic.citation_type, pattern.citation_type)
            } else {
                (pattern.citation_type, heuristic.citation_type)
            };
            if primary != CitationType::Unknown {
                primary
            } else {
                secondary
            }
        };

        let source = if heuristic_leads {
            ClassificationSource::Heuristic
        } else {
            ClassificationSource::Pattern
        };

        debug!(
            heuristic_confidence = heuristic.confidence,
            pattern_confidence = pattern.confidence,
            merged_confidence = merged,
            source = ?source,
            "Merged heuristic and pattern classifications"
        );

        ClassificationResult {
            city_id,
            city_name,
            citation_type,
            confidence: merged,
            source,
            parsed_fields,
        }
    }
}

/// Pattern-matcher side of the fusion; patterns carry no violation type
pub fn pattern_classification(
    parsing: &ParsingResult,
    parsed_fields: ParsedFields,
) -> ClassificationResult {
    ClassificationResult {
        city_id: parsing.city_id.clone(),
        city_name: parsing.city_name.clone(),
        citation_type: CitationType::Unknown,
        confidence: parsing.confidence,
        source: ClassificationSource::Pattern,
        parsed_fields,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn heuristic(city: Option<&str>, citation_type: CitationType, confidence: f64) -> HeuristicClassification {
        HeuristicClassification {
            city_id: city.map(str::to_string),
            city_name: city.map(|_| "City".to_string()),
            citation_type,
            confidence,
            type_confidence: 0.0,
            city_confidence: 0.0,
            text_quality: 0.5,
            alternative_cities: Vec::new(),
            alternative_types: Vec::new(),
            key_phrases_found: Vec::new(),
        }
    }

    fn parsing(city: Option<&str>, confidence: f64) -> ParsingResult {
        ParsingResult {
            citation_number: city.map(|_| "1234567".to_string()),
            city_id: city.map(str::to_string),
            city_name: city.map(|_| "Pattern City".to_string()),
            confidence,
            matched_pattern: None,
            raw_matches: Vec::new(),
        }
    }

    #[test]
    fn test_confident_heuristic_used_directly() {
        let combiner = FusionCombiner::default();
        let result = combiner.combine(
            &heuristic(None, CitationType::Parking, 0.7),
            &parsing(Some("us-co-denver"), 0.9),
            ParsedFields::empty(),
        );
        assert_eq!(result.source, ClassificationSource::Heuristic);
        // no fallback to the pattern city on this path
        assert_eq!(result.city_id, None);
        assert_eq!(result.confidence, 0.7);
    }

    #[test]
    fn test_heuristic_at_threshold_used_directly() {
        let combiner = FusionCombiner::default();
        let result = combiner.combine(
            &heuristic(Some("us-ny-new_york"), CitationType::Parking, 0.6),
            &parsing(Some("us-co-denver"), 0.9),
            ParsedFields::empty(),
        );
        assert_eq!(result.source, ClassificationSource::Heuristic);
        assert_eq!(result.city_id.as_deref(), Some("us-ny-new_york"));
        assert_eq!(result.confidence, 0.6);

        let below = combiner.combine(
            &heuristic(Some("us-ny-new_york"), CitationType::Parking, 0.59),
            &parsing(Some("us-co-denver"), 0.9),
            ParsedFields::empty(),
        );
        assert_eq!(below.source, ClassificationSource::Pattern);
        assert_eq!(below.city_id.as_deref(), Some("us-co-denver"));
        assert!((below.confidence - (0.6 * 0.59 + 0.4 * 0.9)).abs() < 1e-9);
    }

    #[test]
    fn test_pattern_leads_and_type_falls_back() {
        let combiner = FusionCombiner::default();
        let result = combiner.combine(
            &heuristic(Some("us-ny-new_york"), CitationType::Parking, 0.5),
            &parsing(Some("us-co-denver"), 0.8),
            ParsedFields::empty(),
        );
        assert_eq!(result.source, ClassificationSource::Pattern);
        assert_eq!(result.city_id.as_deref(), Some("us-co-denver"));
        assert_eq!(result.citation_type, CitationType::Parking);
        assert!((result.confidence - 0.62).abs() < 1e-9);
    }

    #[test]
    fn test_heuristic_leads_and_city_falls_back() {
        let combiner = FusionCombiner::default();
        let result = combiner.combine(
            &heuristic(None, CitationType::Speeding, 0.55),
            &parsing(Some("us-co-denver"), 0.0),
            ParsedFields::empty(),
        );
        assert_eq!(result.source, ClassificationSource::Heuristic);
        assert_eq!(result.city_id.as_deref(), Some("us-co-denver"));
        assert_eq!(result.citation_type, CitationType::Speeding);
    }

    #[test]
    fn test_equal_confidences_favor_pattern() {
        let combiner = FusionCombiner::default();
        let result = combiner.combine(
            &heuristic(Some("us-ny-new_york"), CitationType::Parking, 0.5),
            &parsing(Some("us-co-denver"), 0.5),
            ParsedFields::empty(),
        );
        assert_eq!(result.source, ClassificationSource::Pattern);
        assert_eq!(result.city_id.as_deref(), Some("us-co-denver"));
    }

    #[test]
    fn test_parsed_fields_carried_through() {
        let fields = ParsedFields {
            amount: Some(95.0),
            ..ParsedFields::empty()
        };
        let result = FusionCombiner::default().combine(
            &heuristic(None, CitationType::Unknown, 0.1),
            &parsing(None, 0.0),
            fields.clone(),
        );
        assert_eq!(result.parsed_fields, fields);
        assert_eq!(result.citation_type, CitationType::Unknown);
    }
}
