//! # Pattern Matcher
//!
//! Regex-based citation-number matcher over the priority-ordered
//! [`CityPatternTable`]. Every match of every pattern is scored and the
//! globally best one wins; ties go to the match recorded first, which is the
//! pattern with the lower priority number.

use serde::Serialize;
use tracing::{debug, trace};

use crate::city_patterns::{CityPattern, CityPatternTable, SAN_FRANCISCO};
use crate::errors::AppResult;
use crate::text_normalizer::normalize;

/// Citation length the per-match confidence is centred on
const IDEAL_CITATION_LENGTH: usize = 9;
const BASE_MATCH_CONFIDENCE: f64 = 0.9;
const LENGTH_PENALTY_PER_CHAR: f64 = 0.05;
const MIXED_PREFIX_BONUS: f64 = 0.05;
const MIN_MATCH_CONFIDENCE: f64 = 0.5;
const MAX_MATCH_CONFIDENCE: f64 = 1.0;

/// One regex match with its confidence
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchResult {
    pub matched_string: String,
    pub pattern: CityPattern,
    pub confidence: f64,
}

/// Outcome of a citation-number search
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsingResult {
    pub citation_number: Option<String>,
    pub city_id: Option<String>,
    pub city_name: Option<String>,
    pub confidence: f64,
    pub matched_pattern: Option<CityPattern>,
    /// Every match considered, in discovery order
    pub raw_matches: Vec<String>,
}

impl ParsingResult {
    /// Result carrying no match
    pub fn no_match() -> Self {
        Self {
            citation_number: None,
            city_id: None,
            city_name: None,
            confidence: 0.0,
            matched_pattern: None,
            raw_matches: Vec::new(),
        }
    }

    fn from_best(best: &MatchResult, raw_matches: Vec<String>) -> Self {
        Self {
            citation_number: Some(best.matched_string.clone()),
            city_id: Some(best.pattern.city_id.clone()),
            city_name: Some(best.pattern.city_name.clone()),
            confidence: best.confidence,
            matched_pattern: Some(best.pattern.clone()),
            raw_matches,
        }
    }

    pub fn is_match(&self) -> bool {
        self.citation_number.is_some()
    }
}

/// Finds citation numbers using the city pattern table
#[derive(Debug, Clone, Default)]
pub struct PatternMatcher {
    table: CityPatternTable,
}

impl PatternMatcher {
    /// Matcher over the built-in city table
    pub fn new() -> Self {
        Self {
            table: CityPatternTable::builtin(),
        }
    }

    /// Matcher over a caller-supplied table
    pub fn with_patterns(patterns: Vec<CityPattern>) -> AppResult<Self> {
        Ok(Self {
            table: CityPatternTable::new(patterns)?,
        })
    }

    pub fn with_table(table: CityPatternTable) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &CityPatternTable {
        &self.table
    }

    /// Parse OCR text for a citation number
    ///
    /// # Examples
    ///
    /// ```rust
    /// use citation_scan::pattern_matcher::PatternMatcher;
    ///
    /// let matcher = PatternMatcher::new();
    /// let result = matcher.parse("SFMTA 9123 4567");
    /// assert_eq!(result.citation_number.as_deref(), Some("SFMTA91234567"));
    /// assert_eq!(result.city_id.as_deref(), Some("us-ca-san_francisco"));
    /// ```
    pub fn parse(&self, text: &str) -> ParsingResult {
        self.parse_candidates([text])
    }

    /// Parse several candidate strings as one search
    ///
    /// Matches are collected candidate by candidate and, within a candidate,
    /// pattern by pattern in priority order. The highest confidence wins and
    /// ties go to the earliest collected match.
    pub fn parse_candidates<'a, I>(&self, candidates: I) -> ParsingResult
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut all_matches: Vec<MatchResult> = Vec::new();
        for candidate in candidates {
            let normalized = normalize(candidate);
            if normalized.is_empty() {
                continue;
            }
            all_matches.extend(self.find_all_matches(&normalized));
        }

        let raw_matches: Vec<String> = all_matches
            .iter()
            .map(|m| m.matched_string.clone())
            .collect();

        match select_best(&all_matches) {
            Some(best) => {
                debug!(
                    citation_number = %best.matched_string,
                    city_id = %best.pattern.city_id,
                    confidence = best.confidence,
                    match_count = all_matches.len(),
                    "Selected best citation match"
                );
                ParsingResult::from_best(best, raw_matches)
            }
            None => {
                debug!("No citation pattern matched");
                ParsingResult::no_match()
            }
        }
    }

    /// Parse with a caller-supplied city hint
    ///
    /// The hinted city's pattern is tried first. When it does not match (or the
    /// hint names an unknown city) the full priority-ordered search runs instead.
    pub fn parse_with_city_hint(&self, text: &str, city_id: &str) -> ParsingResult {
        self.parse_candidates_with_city_hint([text], city_id)
    }

    /// [`parse_candidates`](Self::parse_candidates) with a city hint
    ///
    /// The hinted pattern is tried against every candidate and its best match
    /// wins. Without a hinted match the full search runs over the same
    /// candidates.
    pub fn parse_candidates_with_city_hint<'a, I>(&self, candidates: I, city_id: &str) -> ParsingResult
    where
        I: IntoIterator<Item = &'a str>,
    {
        let candidates: Vec<&str> = candidates.into_iter().collect();

        if let Some(entry) = self.table.get(city_id) {
            let matches: Vec<MatchResult> = candidates
                .iter()
                .map(|candidate| normalize(candidate))
                .filter(|normalized| !normalized.is_empty())
                .flat_map(|normalized| {
                    self.find_matches(&normalized, entry.pattern.clone(), &entry.regex)
                })
                .collect();
            if let Some(best) = select_best(&matches) {
                debug!(city_id = %city_id, match_count = matches.len(), "City hint pattern matched");
                let raw_matches = matches.iter().map(|m| m.matched_string.clone()).collect();
                return ParsingResult::from_best(best, raw_matches);
            }
            debug!(city_id = %city_id, "City hint pattern did not match, falling back");
        } else {
            debug!(city_id = %city_id, "Unknown city hint, falling back");
        }

        self.parse_candidates(candidates)
    }

    /// Format a citation number according to city conventions
    ///
    /// San Francisco 9-digit numbers are dashed as `NNN-NNN-NNN`; every other
    /// input, including already-dashed numbers, is returned unchanged.
    pub fn format_citation(&self, citation_number: &str, city_id: &str) -> String {
        format_citation(citation_number, city_id)
    }

    fn find_all_matches(&self, normalized: &str) -> Vec<MatchResult> {
        self.table
            .entries()
            .iter()
            .flat_map(|entry| self.find_matches(normalized, entry.pattern.clone(), &entry.regex))
            .collect()
    }

    fn find_matches(
        &self,
        normalized: &str,
        pattern: CityPattern,
        regex: &regex::Regex,
    ) -> Vec<MatchResult> {
        regex
            .find_iter(normalized)
            .map(|m| {
                let matched_string = m.as_str().to_string();
                let confidence = calculate_match_confidence(&matched_string, &pattern.city_id);
                trace!(
                    matched = %matched_string,
                    city_id = %pattern.city_id,
                    confidence,
                    "Pattern match"
                );
                MatchResult {
                    matched_string,
                    pattern: pattern.clone(),
                    confidence,
                }
            })
            .collect()
    }
}

/// Highest confidence, first occurrence on ties
fn select_best(matches: &[MatchResult]) -> Option<&MatchResult> {
    matches.iter().fold(None, |best: Option<&MatchResult>, candidate| match best {
        Some(current) if current.confidence >= candidate.confidence => Some(current),
        _ => Some(candidate),
    })
}

/// Per-match confidence centred on the ideal citation length
pub fn calculate_match_confidence(matched: &str, city_id: &str) -> f64 {
    let length_diff = matched.chars().count().abs_diff(IDEAL_CITATION_LENGTH);
    let mut confidence = BASE_MATCH_CONFIDENCE - length_diff as f64 * LENGTH_PENALTY_PER_CHAR;

    let has_letters = matched.chars().any(|c| c.is_alphabetic());
    let has_digits = matched.chars().any(|c| c.is_ascii_digit());
    if city_id == SAN_FRANCISCO && has_letters && has_digits {
        confidence += MIXED_PREFIX_BONUS;
    }

    confidence.clamp(MIN_MATCH_CONFIDENCE, MAX_MATCH_CONFIDENCE)
}

/// See [`PatternMatcher::format_citation`]
pub fn format_citation(citation_number: &str, city_id: &str) -> String {
    match city_id {
        SAN_FRANCISCO
            if citation_number.len() == 9
                && citation_number.chars().all(|c| c.is_ascii_digit()) =>
        {
            format!(
                "{}-{}-{}",
                &citation_number[0..3],
                &citation_number[3..6],
                &citation_number[6..9]
            )
        }
        _ => citation_number.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::city_patterns::{DENVER, LOS_ANGELES, NEW_YORK};

    #[test]
    fn test_match_confidence_values() {
        // 13 chars: 0.9 - 0.2 + 0.05
        assert!((calculate_match_confidence("SFMTA91234567", SAN_FRANCISCO) - 0.75).abs() < 1e-9);
        assert!((calculate_match_confidence("1234567890", NEW_YORK) - 0.85).abs() < 1e-9);
        assert!((calculate_match_confidence("123456789", DENVER) - 0.9).abs() < 1e-9);
        // long strings clamp to the floor
        assert_eq!(calculate_match_confidence(&"1".repeat(40), LOS_ANGELES), 0.5);
    }

    #[test]
    fn test_sf_bonus_requires_letters_and_digits() {
        let plain = calculate_match_confidence("MT12345678", DENVER);
        let sf = calculate_match_confidence("MT12345678", SAN_FRANCISCO);
        assert!(sf > plain);
    }

    #[test]
    fn test_select_best_keeps_first_on_tie() {
        let matcher = PatternMatcher::new();
        let matches = matcher.find_all_matches("123456");
        assert_eq!(matches.len(), 2);
        let best = select_best(&matches).unwrap();
        assert_eq!(best.pattern.city_id, DENVER);
    }

    #[test]
    fn test_format_citation() {
        assert_eq!(format_citation("912345678", SAN_FRANCISCO), "912-345-678");
        assert_eq!(format_citation("912-345-678", SAN_FRANCISCO), "912-345-678");
        assert_eq!(format_citation("1234567890", NEW_YORK), "1234567890");
        assert_eq!(format_citation("UNKNOWN123", "unknown"), "UNKNOWN123");
    }

    #[test]
    fn test_unknown_hint_falls_back() {
        let matcher = PatternMatcher::new();
        let result = matcher.parse_with_city_hint("1234567890", "us-xx-nowhere");
        assert_eq!(result.city_id.as_deref(), Some(NEW_YORK));
    }
}
