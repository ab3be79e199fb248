//! # City Pattern Table
//!
//! Static, priority-ordered citation-number formats of the supported issuing
//! authorities. Patterns are compiled once when the table is built; an invalid
//! pattern is a configuration defect reported at construction time.

use std::ops::RangeInclusive;

use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use tracing::{debug, info};

use crate::errors::{AppError, AppResult};

pub const SAN_FRANCISCO: &str = "us-ca-san_francisco";
pub const NEW_YORK: &str = "us-ny-new_york";
pub const DENVER: &str = "us-co-denver";
pub const LOS_ANGELES: &str = "us-ca-los_angeles";

/// Citation-number format of one issuing authority
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CityPattern {
    pub city_id: String,
    pub city_name: String,
    pub regex: String,
    /// Lower is tried and preferred first
    pub priority: u32,
    pub format_example: String,
    /// Plausible length of a normalized citation number for this city
    pub expected_length: RangeInclusive<usize>,
}

impl CityPattern {
    pub fn new(
        city_id: &str,
        city_name: &str,
        regex: &str,
        priority: u32,
        format_example: &str,
        expected_length: RangeInclusive<usize>,
    ) -> Self {
        Self {
            city_id: city_id.to_string(),
            city_name: city_name.to_string(),
            regex: regex.to_string(),
            priority,
            format_example: format_example.to_string(),
            expected_length,
        }
    }
}

/// The built-in table of supported cities, in priority order
pub fn default_city_patterns() -> Vec<CityPattern> {
    vec![
        // SFMTA or MT prefix followed by 8 digits
        CityPattern::new(
            SAN_FRANCISCO,
            "San Francisco",
            r"^(SFMTA|MT)[0-9]{8}$",
            1,
            "SFMTA91234567",
            10..=13,
        ),
        CityPattern::new(NEW_YORK, "New York", r"^[0-9]{10}$", 2, "1234567890", 10..=10),
        CityPattern::new(DENVER, "Denver", r"^[0-9]{5,9}$", 3, "1234567", 5..=9),
        CityPattern::new(
            LOS_ANGELES,
            "Los Angeles",
            r"^[0-9A-Z]{6,11}$",
            4,
            "LA123456",
            6..=11,
        ),
    ]
}

/// A city pattern together with its compiled regex
#[derive(Debug, Clone)]
pub struct CompiledCityPattern {
    pub pattern: CityPattern,
    pub regex: Regex,
}

/// Immutable, priority-sorted arena of compiled city patterns
#[derive(Debug, Clone)]
pub struct CityPatternTable {
    entries: Vec<CompiledCityPattern>,
}

lazy_static! {
    static ref DEFAULT_TABLE: CityPatternTable = CityPatternTable::new(default_city_patterns())
        .expect("Built-in city pattern table should be valid");
}

impl CityPatternTable {
    /// Compile and validate a pattern table
    ///
    /// Entries are ordered by ascending priority; entries sharing a priority keep
    /// their given order. Fails on an empty table, an empty or duplicate city id,
    /// or a regex that does not compile.
    pub fn new(patterns: Vec<CityPattern>) -> AppResult<Self> {
        if patterns.is_empty() {
            return Err(AppError::Config(
                "city pattern table cannot be empty".to_string(),
            ));
        }

        let mut entries = Vec::with_capacity(patterns.len());
        for pattern in patterns {
            if pattern.city_id.trim().is_empty() {
                return Err(AppError::Config(format!(
                    "city pattern '{}' has an empty city_id",
                    pattern.city_name
                )));
            }
            if entries
                .iter()
                .any(|e: &CompiledCityPattern| e.pattern.city_id == pattern.city_id)
            {
                return Err(AppError::Config(format!(
                    "duplicate city_id '{}' in city pattern table",
                    pattern.city_id
                )));
            }
            let regex = Regex::new(&pattern.regex).map_err(|e| {
                AppError::Config(format!(
                    "pattern for '{}' is not a valid regex: {}",
                    pattern.city_id, e
                ))
            })?;
            debug!(city_id = %pattern.city_id, priority = pattern.priority, "Compiled city pattern");
            entries.push(CompiledCityPattern { pattern, regex });
        }

        entries.sort_by_key(|entry| entry.pattern.priority);

        info!(pattern_count = entries.len(), "City pattern table initialized");
        Ok(Self { entries })
    }

    /// Shared copy of the built-in table
    pub fn builtin() -> Self {
        DEFAULT_TABLE.clone()
    }

    /// Entries in priority order
    pub fn entries(&self) -> &[CompiledCityPattern] {
        &self.entries
    }

    pub fn get(&self, city_id: &str) -> Option<&CompiledCityPattern> {
        self.entries.iter().find(|e| e.pattern.city_id == city_id)
    }

    /// Whether `candidate` satisfies any pattern of the table
    pub fn matches_any(&self, candidate: &str) -> bool {
        self.entries.iter().any(|e| e.regex.is_match(candidate))
    }
}

impl Default for CityPatternTable {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_table_is_priority_ordered() {
        let table = CityPatternTable::builtin();
        let ids: Vec<&str> = table
            .entries()
            .iter()
            .map(|e| e.pattern.city_id.as_str())
            .collect();
        assert_eq!(ids, vec![SAN_FRANCISCO, NEW_YORK, DENVER, LOS_ANGELES]);
    }

    #[test]
    fn test_format_examples_match_their_own_pattern() {
        let table = CityPatternTable::builtin();
        for entry in table.entries() {
            assert!(
                entry.regex.is_match(&entry.pattern.format_example),
                "{} should match {}",
                entry.pattern.format_example,
                entry.pattern.city_id
            );
            assert!(entry
                .pattern
                .expected_length
                .contains(&entry.pattern.format_example.len()));
        }
    }

    #[test]
    fn test_invalid_regex_is_config_error() {
        let patterns = vec![CityPattern::new("x", "X", "([0-9", 1, "1", 1..=1)];
        let err = CityPatternTable::new(patterns).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn test_empty_and_duplicate_tables_rejected() {
        assert!(CityPatternTable::new(vec![]).is_err());

        let dup = vec![
            CityPattern::new("x", "X", "^A$", 1, "A", 1..=1),
            CityPattern::new("x", "X2", "^B$", 2, "B", 1..=1),
        ];
        assert!(CityPatternTable::new(dup).is_err());
    }

    #[test]
    fn test_unsorted_input_is_sorted_by_priority() {
        let patterns = vec![
            CityPattern::new("b", "B", "^B$", 2, "B", 1..=1),
            CityPattern::new("a", "A", "^A$", 1, "A", 1..=1),
        ];
        let table = CityPatternTable::new(patterns).unwrap();
        assert_eq!(table.entries()[0].pattern.city_id, "a");
    }

    #[test]
    fn test_matches_any() {
        let table = CityPatternTable::builtin();
        assert!(table.matches_any("1234567"));
        assert!(!table.matches_any("AB12"));
    }
}
