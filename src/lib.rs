//! # Citation Scan
//!
//! Classification and confidence scoring engine for OCR-scanned parking and
//! traffic citations. Takes recognized text plus per-fragment observations and
//! produces the citation number, issuing city, violation type, extracted fields
//! and a calibrated confidence score with an accept/review/reject recommendation.

pub mod city_patterns;
pub mod confidence_scorer;
pub mod config;
pub mod errors;
pub mod field_extraction;
pub mod fusion;
pub mod heuristic_classifier;
pub mod models;
pub mod observability;
pub mod observability_config;
pub mod pattern_matcher;
pub mod pipeline;
pub mod remediation;
pub mod text_normalizer;

// Re-export types for easier access
pub use confidence_scorer::ConfidenceScorer;
pub use heuristic_classifier::HeuristicClassifier;
pub use models::{ClassificationResult, ParsedFields, RecognizedTextObservation, ScoreResult};
pub use pattern_matcher::{ParsingResult, PatternMatcher};
pub use pipeline::{CitationAnalysis, CitationEngine, ScanInput};
