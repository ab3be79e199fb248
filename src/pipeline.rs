//! # Citation Analysis Pipeline
//!
//! End-to-end classification of one scan:
//!
//! 1. pattern matching over the full text and every observation
//! 2. field extraction around the matched citation number
//! 3. heuristic classification of the full text
//! 4. fusion of both classifications
//! 5. confidence scoring of the observations and candidate
//! 6. remediation advice when the result is not accepted
//!
//! The engine holds only immutable tables and can be shared across threads.

use std::time::Instant;

use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::AppConfig;
use crate::confidence_scorer::ConfidenceScorer;
use crate::errors::AppResult;
use crate::field_extraction::FieldExtractor;
use crate::fusion::FusionCombiner;
use crate::heuristic_classifier::HeuristicClassifier;
use crate::models::{ClassificationResult, Recommendation, RecognizedTextObservation, ScoreResult};
use crate::observability;
use crate::pattern_matcher::{ParsingResult, PatternMatcher};
use crate::remediation::{suggest_fallback_options, PreprocessingOptions};
use crate::text_normalizer::normalize;

/// Everything known about one scan
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CitationAnalysis {
    pub parsing: ParsingResult,
    pub classification: ClassificationResult,
    pub score: ScoreResult,
    /// Present only when the score was not accepted
    pub remediation: Option<PreprocessingOptions>,
}

/// One scan as handed over by the capture collaborator
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ScanInput {
    /// Full recognized text; rebuilt from the observations when empty
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub observations: Vec<RecognizedTextObservation>,
}

impl ScanInput {
    /// Full text of the scan
    pub fn full_text(&self) -> String {
        if self.text.trim().is_empty() {
            self.observations
                .iter()
                .map(|o| o.text.as_str())
                .collect::<Vec<_>>()
                .join(" ")
        } else {
            self.text.clone()
        }
    }
}

/// Citation classification and scoring engine
#[derive(Debug, Clone, Default)]
pub struct CitationEngine {
    matcher: PatternMatcher,
    extractor: FieldExtractor,
    classifier: HeuristicClassifier,
    fusion: FusionCombiner,
    scorer: ConfidenceScorer,
}

impl CitationEngine {
    /// Engine over the built-in tables and default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Engine with validated configuration
    pub fn with_config(config: &AppConfig) -> AppResult<Self> {
        config.validate()?;
        let matcher = PatternMatcher::new();
        let extractor = FieldExtractor::with_table(matcher.table().clone());
        let scorer = ConfidenceScorer::with_config(config.scoring_weights, config.scoring_thresholds)?;

        info!(summary = %config.summary(), "Citation engine initialized");
        Ok(Self {
            matcher,
            extractor,
            classifier: HeuristicClassifier::new(),
            fusion: FusionCombiner::new(config.fusion),
            scorer,
        })
    }

    /// Engine from individually built components
    pub fn from_parts(
        matcher: PatternMatcher,
        classifier: HeuristicClassifier,
        fusion: FusionCombiner,
        scorer: ConfidenceScorer,
    ) -> Self {
        let extractor = FieldExtractor::with_table(matcher.table().clone());
        Self {
            matcher,
            extractor,
            classifier,
            fusion,
            scorer,
        }
    }

    pub fn matcher(&self) -> &PatternMatcher {
        &self.matcher
    }

    pub fn classifier(&self) -> &HeuristicClassifier {
        &self.classifier
    }

    pub fn scorer(&self) -> &ConfidenceScorer {
        &self.scorer
    }

    /// Analyze one scan
    ///
    /// `text` is the full recognized text, `observations` the individual OCR
    /// fragments and `city_hint` an optional city id known to the caller.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use citation_scan::models::{BoundingBox, RecognizedTextObservation};
    /// use citation_scan::pipeline::CitationEngine;
    ///
    /// let observations = vec![RecognizedTextObservation::new(
    ///     "SFMTA91234567",
    ///     0.95,
    ///     BoundingBox::new(0.1, 0.1, 0.5, 0.05),
    /// )];
    /// let analysis = CitationEngine::new().analyze("SFMTA91234567", &observations, None);
    /// assert_eq!(analysis.parsing.city_id.as_deref(), Some("us-ca-san_francisco"));
    /// ```
    pub fn analyze(
        &self,
        text: &str,
        observations: &[RecognizedTextObservation],
        city_hint: Option<&str>,
    ) -> CitationAnalysis {
        self.analyze_as_of(text, observations, city_hint, Local::now().date_naive())
    }

    /// Analyze one scan relative to `today`
    ///
    /// `today` bounds the violation date selection; the result is a pure
    /// function of the arguments.
    pub fn analyze_as_of(
        &self,
        text: &str,
        observations: &[RecognizedTextObservation],
        city_hint: Option<&str>,
        today: NaiveDate,
    ) -> CitationAnalysis {
        let span = observability::analysis_span(city_hint, observations.len());
        let _guard = span.enter();
        let start_time = Instant::now();

        let stage_start = Instant::now();
        let candidates = std::iter::once(text).chain(observations.iter().map(|o| o.text.as_str()));
        let parsing = match city_hint {
            Some(city_id) => self.matcher.parse_candidates_with_city_hint(candidates, city_id),
            None => self.matcher.parse_candidates(candidates),
        };
        observability::record_stage_duration("pattern_matching", stage_start.elapsed());

        let stage_start = Instant::now();
        let parsed_fields = self
            .extractor
            .extract_fields_as_of(text, parsing.citation_number.as_deref(), today);
        observability::record_stage_duration("field_extraction", stage_start.elapsed());

        let stage_start = Instant::now();
        let heuristic = self.classifier.classify(text);
        observability::record_stage_duration("heuristic_classification", stage_start.elapsed());

        let classification = self.fusion.combine(&heuristic, &parsing, parsed_fields);
        observability::record_classification_metrics(&classification);

        let stage_start = Instant::now();
        let candidate = parsing
            .citation_number
            .clone()
            .unwrap_or_else(|| normalize(text));
        let score = self
            .scorer
            .score(observations, &candidate, parsing.matched_pattern.as_ref());
        observability::record_stage_duration("confidence_scoring", stage_start.elapsed());
        observability::record_score_metrics(&score);

        let remediation = if score.recommendation != Recommendation::Accept {
            let options = suggest_fallback_options(&score);
            observability::record_remediation_metrics(&options);
            Some(options)
        } else {
            None
        };

        debug!(
            citation_number = ?parsing.citation_number,
            city_id = ?classification.city_id,
            citation_type = classification.citation_type.as_str(),
            overall_confidence = score.overall_confidence,
            recommendation = score.recommendation.as_str(),
            duration_ms = start_time.elapsed().as_millis() as u64,
            "Citation analysis completed"
        );

        CitationAnalysis {
            parsing,
            classification,
            score,
            remediation,
        }
    }
}
