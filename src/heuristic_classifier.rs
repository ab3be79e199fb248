//! # Heuristic Citation Classifier
//!
//! Keyword and indicator weighted scoring of the issuing city and the
//! violation category, independent of the structural citation-number table.
//!
//! ## City scoring
//!
//! ```text
//! raw   = 2.0 * indicators found + 1.0 * keywords found + 3.0 * citation patterns matched
//! score = clamp(raw / 5.0, 0, 1)
//! ```
//!
//! Equal scores are broken by the higher raw score, then by table order.
//!
//! ## Type scoring
//!
//! ```text
//! score      = keywords found / keyword count
//! confidence = min(1, best score * 1.2)
//! ```
//!
//! A text without any type keyword is classified as `Unknown`.

use std::time::Instant;

use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use tracing::{debug, info};

use crate::errors::{AppError, AppResult};
use crate::models::CitationType;
use crate::text_normalizer::normalize_for_keywords;

const INDICATOR_WEIGHT: f64 = 2.0;
const KEYWORD_WEIGHT: f64 = 1.0;
const PATTERN_WEIGHT: f64 = 3.0;
const CITY_SCORE_SCALE: f64 = 5.0;
const TYPE_CONFIDENCE_BOOST: f64 = 1.2;
const MAX_ALTERNATIVES: usize = 3;

const TYPE_WEIGHT: f64 = 0.4;
const CITY_WEIGHT: f64 = 0.4;
const TEXT_QUALITY_WEIGHT: f64 = 0.2;

const KNOWN_PHRASES: &[&str] = &[
    "PARKING VIOLATION",
    "TRAFFIC CITATION",
    "SPEEDING",
    "RED LIGHT",
    "METER EXPIRED",
    "NO PARKING",
    "ILLEGAL PARK",
    "CITY OF",
    "DEPARTMENT OF TRANSPORTATION",
];

/// Glyphs OCR engines emit for characters they could not read
pub const ILLEGIBLE_GLYPHS: &[char] = &['?', '▇', '■', '\u{FFFD}'];

lazy_static! {
    static ref DATE_SHAPE: Regex =
        Regex::new(r"\d{1,2}[/-]\d{1,2}[/-]\d{2,4}").expect("Invalid date shape regex");
}

/// Keyword evidence for one city
#[derive(Debug, Clone)]
pub struct CityTrainingData {
    pub city_id: String,
    pub city_name: String,
    /// Agency and city names, worth the most
    pub indicators: Vec<String>,
    /// Unanchored citation-number shapes
    pub citation_patterns: Vec<Regex>,
    pub keywords: Vec<String>,
}

impl CityTrainingData {
    pub fn new(
        city_id: &str,
        city_name: &str,
        indicators: &[&str],
        citation_patterns: &[&str],
        keywords: &[&str],
    ) -> AppResult<Self> {
        let citation_patterns = citation_patterns
            .iter()
            .map(|p| {
                Regex::new(p).map_err(|e| {
                    AppError::Config(format!(
                        "citation pattern '{}' for '{}' is not a valid regex: {}",
                        p, city_id, e
                    ))
                })
            })
            .collect::<AppResult<Vec<_>>>()?;

        Ok(Self {
            city_id: city_id.to_string(),
            city_name: city_name.to_string(),
            indicators: indicators.iter().map(|s| s.to_uppercase()).collect(),
            citation_patterns,
            keywords: keywords.iter().map(|s| s.to_uppercase()).collect(),
        })
    }
}

/// Keyword list of one citation type
#[derive(Debug, Clone)]
pub struct CitationTypeKeywords {
    pub citation_type: CitationType,
    pub keywords: Vec<String>,
}

impl CitationTypeKeywords {
    pub fn new(citation_type: CitationType, keywords: &[&str]) -> Self {
        Self {
            citation_type,
            keywords: keywords.iter().map(|s| s.to_uppercase()).collect(),
        }
    }
}

/// Built-in city evidence
pub fn default_city_training_data() -> AppResult<Vec<CityTrainingData>> {
    Ok(vec![
        CityTrainingData::new(
            "us-ca-san_francisco",
            "San Francisco",
            &["SFMTA", "SAN FRANCISCO", "SF MTA", "SF MUNICIPAL"],
            &[r"SFMTA\d{8}", r"MT\d{8}"],
            &["PARKING", "CITATION", "FINE", "VIOLATION"],
        )?,
        CityTrainingData::new(
            "us-ny-new_york",
            "New York",
            &["NYC", "NEW YORK", "NYC DOT", "DEPARTMENT OF TRANSPORTATION"],
            &[r"\d{10}"],
            &["PARKING", "VIOLATION", "PENALTY", "AMOUNT DUE"],
        )?,
        CityTrainingData::new(
            "us-ca-los_angeles",
            "Los Angeles",
            &["LA", "LOS ANGELES", "LAPD", "CITY OF LOS ANGELES"],
            &[r"[0-9A-Z]{6,11}"],
            &["PARKING", "CITATION", "VEHICLE CODE"],
        )?,
        CityTrainingData::new(
            "us-co-denver",
            "Denver",
            &["DENVER", "CITY OF DENVER"],
            &[r"\d{5,9}"],
            &["PARKING", "VIOLATION", "ORDINANCE"],
        )?,
    ])
}

/// Built-in citation type keyword lists
pub fn default_citation_type_keywords() -> Vec<CitationTypeKeywords> {
    vec![
        CitationTypeKeywords::new(
            CitationType::Parking,
            &[
                "PARKING", "PARK", "NO PARK", "METER", "EXPIRED", "ILLEGAL", "DOUBLE PARK",
                "NO STOPPING", "HANDICAP",
            ],
        ),
        CitationTypeKeywords::new(
            CitationType::Traffic,
            &[
                "TRAFFIC", "VEHICLE CODE", "CVC", "DIVIDED HWY", "WRONG WAY", "SIGNAL",
                "STOP SIGN",
            ],
        ),
        CitationTypeKeywords::new(
            CitationType::RedLight,
            &["RED LIGHT", "CAMERA", "PHOTO", "STOP LIGHT", "RUN RED", "TRAFFIC SIGNAL"],
        ),
        CitationTypeKeywords::new(
            CitationType::Speeding,
            &["SPEED", "SPEEDING", "MPH", "EXCEED", "LIMIT"],
        ),
        CitationTypeKeywords::new(
            CitationType::Municipal,
            &["CITY ORDINANCE", "MUNICIPAL", "CITY CODE", "LOCAL LAW"],
        ),
    ]
}

/// A runner-up city guess
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CityAlternative {
    pub city_id: String,
    pub city_name: String,
    pub confidence: f64,
}

/// A runner-up type guess
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypeAlternative {
    pub citation_type: CitationType,
    pub confidence: f64,
}

/// City detection outcome
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CityDetection {
    pub city_id: Option<String>,
    pub city_name: Option<String>,
    pub confidence: f64,
    pub alternatives: Vec<CityAlternative>,
}

/// Type detection outcome
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypeDetection {
    pub citation_type: CitationType,
    pub confidence: f64,
    pub alternatives: Vec<TypeAlternative>,
}

/// Standalone heuristic classification
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeuristicClassification {
    pub city_id: Option<String>,
    pub city_name: Option<String>,
    pub citation_type: CitationType,
    /// 0.4 type + 0.4 city + 0.2 text quality
    pub confidence: f64,
    pub type_confidence: f64,
    pub city_confidence: f64,
    pub text_quality: f64,
    pub alternative_cities: Vec<CityAlternative>,
    pub alternative_types: Vec<TypeAlternative>,
    pub key_phrases_found: Vec<String>,
}

/// One synthetic labelled example for offline model training
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrainingExample {
    pub text: String,
    pub city_id: String,
    pub city_name: String,
    pub citation_type: CitationType,
}

/// Keyword-weighted city and type classifier
#[derive(Debug, Clone)]
pub struct HeuristicClassifier {
    cities: Vec<CityTrainingData>,
    types: Vec<CitationTypeKeywords>,
}

lazy_static! {
    static ref DEFAULT_CITIES: Vec<CityTrainingData> =
        default_city_training_data().expect("Built-in city training data should be valid");
}

impl Default for HeuristicClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl HeuristicClassifier {
    /// Classifier over the built-in tables
    pub fn new() -> Self {
        Self {
            cities: DEFAULT_CITIES.clone(),
            types: default_citation_type_keywords(),
        }
    }

    /// Classifier over substitute tables
    pub fn with_training_data(
        cities: Vec<CityTrainingData>,
        types: Vec<CitationTypeKeywords>,
    ) -> AppResult<Self> {
        if cities.is_empty() {
            return Err(AppError::Config(
                "city training data cannot be empty".to_string(),
            ));
        }
        if types.is_empty() {
            return Err(AppError::Config(
                "citation type keywords cannot be empty".to_string(),
            ));
        }
        info!(
            city_count = cities.len(),
            type_count = types.len(),
            "Heuristic classifier initialized with custom tables"
        );
        Ok(Self { cities, types })
    }

    /// Classify raw OCR text
    ///
    /// # Examples
    ///
    /// ```rust
    /// use citation_scan::heuristic_classifier::HeuristicClassifier;
    /// use citation_scan::models::CitationType;
    ///
    /// let result = HeuristicClassifier::new().classify("SFMTA91234567 NO PARKING METER EXPIRED");
    /// assert_eq!(result.city_id.as_deref(), Some("us-ca-san_francisco"));
    /// assert_eq!(result.citation_type, CitationType::Parking);
    /// ```
    pub fn classify(&self, text: &str) -> HeuristicClassification {
        let start_time = Instant::now();
        let normalized = normalize_for_keywords(text);

        let key_phrases_found = extract_key_phrases(&normalized);
        let type_result = self.classify_citation_type(&normalized);
        let city_result = self.detect_city(&normalized);
        let text_quality = assess_text_quality(text);

        let confidence = (type_result.confidence * TYPE_WEIGHT
            + city_result.confidence * CITY_WEIGHT
            + text_quality * TEXT_QUALITY_WEIGHT)
            .clamp(0.0, 1.0);

        debug!(
            city_id = ?city_result.city_id,
            citation_type = type_result.citation_type.as_str(),
            confidence,
            text_quality,
            duration_us = start_time.elapsed().as_micros() as u64,
            "Heuristic classification completed"
        );

        HeuristicClassification {
            city_id: city_result.city_id,
            city_name: city_result.city_name,
            citation_type: type_result.citation_type,
            confidence,
            type_confidence: type_result.confidence,
            city_confidence: city_result.confidence,
            text_quality,
            alternative_cities: city_result.alternatives,
            alternative_types: type_result.alternatives,
            key_phrases_found,
        }
    }

    /// Score every city and pick the best
    pub fn detect_city(&self, text: &str) -> CityDetection {
        let upper = text.to_uppercase();

        // (index, normalized score, raw score)
        let mut scores: Vec<(usize, f64, f64)> = self
            .cities
            .iter()
            .enumerate()
            .map(|(index, city)| {
                let indicators = city
                    .indicators
                    .iter()
                    .filter(|indicator| upper.contains(indicator.as_str()))
                    .count();
                let keywords = city
                    .keywords
                    .iter()
                    .filter(|keyword| upper.contains(keyword.as_str()))
                    .count();
                let patterns = city
                    .citation_patterns
                    .iter()
                    .filter(|pattern| pattern.is_match(&upper))
                    .count();
                let raw = INDICATOR_WEIGHT * indicators as f64
                    + KEYWORD_WEIGHT * keywords as f64
                    + PATTERN_WEIGHT * patterns as f64;
                (index, (raw / CITY_SCORE_SCALE).clamp(0.0, 1.0), raw)
            })
            .collect();

        // stable: table order survives full ties
        scores.sort_by(|a, b| b.1.total_cmp(&a.1).then(b.2.total_cmp(&a.2)));

        match scores.first() {
            Some(&(index, score, _)) if score > 0.0 => {
                let best = &self.cities[index];
                let alternatives = scores
                    .iter()
                    .skip(1)
                    .take(MAX_ALTERNATIVES)
                    .map(|&(i, s, _)| CityAlternative {
                        city_id: self.cities[i].city_id.clone(),
                        city_name: self.cities[i].city_name.clone(),
                        confidence: s,
                    })
                    .collect();
                CityDetection {
                    city_id: Some(best.city_id.clone()),
                    city_name: Some(best.city_name.clone()),
                    confidence: score,
                    alternatives,
                }
            }
            _ => CityDetection {
                city_id: None,
                city_name: None,
                confidence: 0.0,
                alternatives: Vec::new(),
            },
        }
    }

    /// Score every citation type and pick the best
    pub fn classify_citation_type(&self, text: &str) -> TypeDetection {
        let upper = text.to_uppercase();

        let mut scores: Vec<(CitationType, f64)> = self
            .types
            .iter()
            .map(|entry| {
                let matches = entry
                    .keywords
                    .iter()
                    .filter(|keyword| upper.contains(keyword.as_str()))
                    .count();
                let score = matches as f64 / entry.keywords.len().max(1) as f64;
                (entry.citation_type, score)
            })
            .collect();

        scores.sort_by(|a, b| b.1.total_cmp(&a.1));

        let alternatives: Vec<TypeAlternative> = scores
            .iter()
            .skip(1)
            .take(MAX_ALTERNATIVES)
            .map(|&(citation_type, confidence)| TypeAlternative {
                citation_type,
                confidence,
            })
            .collect();

        match scores.first() {
            Some(&(citation_type, score)) if score > 0.0 => TypeDetection {
                citation_type,
                confidence: (score * TYPE_CONFIDENCE_BOOST).min(1.0),
                alternatives,
            },
            _ => TypeDetection {
                citation_type: CitationType::Unknown,
                confidence: 0.0,
                alternatives: Vec::new(),
            },
        }
    }

    /// Synthetic labelled examples built from the city tables
    pub fn export_training_data(&self) -> Vec<TrainingExample> {
        self.cities
            .iter()
            .flat_map(|city| {
                city.indicators.iter().flat_map(move |indicator| {
                    city.keywords.iter().map(move |keyword| TrainingExample {
                        text: format!("{} {} PARKING VIOLATION", indicator, keyword),
                        city_id: city.city_id.clone(),
                        city_name: city.city_name.clone(),
                        citation_type: CitationType::Parking,
                    })
                })
            })
            .collect()
    }
}

/// Known citation phrases present in the text
pub fn extract_key_phrases(text: &str) -> Vec<String> {
    let upper = text.to_uppercase();
    KNOWN_PHRASES
        .iter()
        .filter(|phrase| upper.contains(*phrase))
        .map(|phrase| phrase.to_string())
        .collect()
}

/// OCR text quality estimate (0.0-1.0)
///
/// Starts at 0.5; illegible glyphs cost 0.2, a plausible word count (5-50)
/// earns 0.2 while more than 50 words costs 0.1, and a date or a currency
/// symbol each earn 0.15.
pub fn assess_text_quality(text: &str) -> f64 {
    let mut score: f64 = 0.5;

    if text.contains(ILLEGIBLE_GLYPHS) {
        score -= 0.2;
    }

    let word_count = text.split_whitespace().count();
    if (5..=50).contains(&word_count) {
        score += 0.2;
    } else if word_count > 50 {
        score -= 0.1;
    }

    if DATE_SHAPE.is_match(text) {
        score += 0.15;
    }
    if text.contains('$') {
        score += 0.15;
    }

    score.clamp(0.0, 1.0)
}
