//! # Field Extraction
//!
//! Best-effort extraction of the structured fields printed on a citation:
//! violation dates, fine amount, violation code and licence plate. Each
//! extractor is independent and returns `None`/empty when nothing is found.

use chrono::{Local, NaiveDate};
use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use tracing::{debug, trace};

use crate::city_patterns::CityPatternTable;
use crate::models::ParsedFields;

lazy_static! {
    /// Date shapes with the chrono formats able to parse them, in extraction order
    static ref DATE_PATTERNS: Vec<(Regex, &'static [&'static str])> = vec![
        // MM/DD/YYYY
        (
            Regex::new(r"\b\d{1,2}/\d{1,2}/\d{4}\b").expect("Invalid MM/DD/YYYY regex"),
            &["%m/%d/%Y"][..],
        ),
        // MM-DD-YYYY
        (
            Regex::new(r"\b\d{1,2}-\d{1,2}-\d{4}\b").expect("Invalid MM-DD-YYYY regex"),
            &["%m-%d-%Y"][..],
        ),
        // YYYY-MM-DD
        (
            Regex::new(r"\b\d{4}-\d{2}-\d{2}\b").expect("Invalid YYYY-MM-DD regex"),
            &["%Y-%m-%d"][..],
        ),
        // Month DD, YYYY (full or abbreviated month)
        (
            Regex::new(r"\b[A-Za-z]{3,9}\.? \d{1,2},? \d{4}\b").expect("Invalid month-name date regex"),
            &["%B %d, %Y", "%B %d %Y", "%b. %d, %Y", "%b. %d %Y"][..],
        ),
    ];

    static ref AMOUNT_PATTERNS: Vec<Regex> = vec![
        Regex::new(r"\$\s?(\d+\.\d{2})").expect("Invalid dollar-cents regex"),
        Regex::new(r"\$\s?(\d+)").expect("Invalid dollar regex"),
        // Not part of a longer dotted or digit run such as `7.2.20`
        Regex::new(r"(?:^|[^\d.])(\d+\.\d{2})(?:$|[^\d.])").expect("Invalid decimal amount regex"),
    ];

    static ref CVC_CODE: Regex =
        Regex::new(r"(?i)\bCVC\s*[#:]?\s*(\d{3,5}(?:\.\d+)?(?:\([A-Za-z0-9]\))?)")
            .expect("Invalid CVC code regex");
    static ref SECTION_CODE: Regex =
        Regex::new(r"(?i)\bSEC(?:TION|T?\.)?\s*[#:]?\s*(\d+(?:\.\d+)*(?:\([A-Za-z0-9]\))?)")
            .expect("Invalid section code regex");
    static ref PREFIXED_CODE: Regex =
        Regex::new(r"\b([A-Z]{1,4}[-.]\d{1,5}(?:[-.]\d{1,5})*[A-Z]?)\b")
            .expect("Invalid prefixed code regex");
    static ref DOTTED_CODE: Regex =
        Regex::new(r"\b(\d{1,3}\.\d{1,3}\.\d{1,3}(?:\([A-Za-z0-9]\))?)")
            .expect("Invalid dotted code regex");

    static ref LABELLED_PLATE: Regex = Regex::new(
        r"(?i)\b(?:LICENSE\s+PLATE|LIC(?:ENSE)?|PLATE|TAG)\s*(?:NO\.?|NUMBER|#)?\s*[:#]?\s*([A-Z0-9]{2,4}[- ]?[A-Z0-9]{2,4})\b"
    )
    .expect("Invalid labelled plate regex");
    static ref PLATE_SHAPES: Vec<Regex> = vec![
        // 7ABC123
        Regex::new(r"\b\d[A-Z]{3}\d{3}\b").expect("Invalid plate shape regex"),
        // ABC1234 / ABC-1234
        Regex::new(r"\b[A-Z]{3}-?\d{3,4}\b").expect("Invalid plate shape regex"),
        // 123ABC / 12AB34
        Regex::new(r"\b\d{2,3}[A-Z]{2,3}\d{0,2}\b").expect("Invalid plate shape regex"),
        // AB123 / AB1234C
        Regex::new(r"\b[A-Z]{1,2}\d{3,4}[A-Z]?\b").expect("Invalid plate shape regex"),
    ];
}

const MIN_PLATE_LENGTH: usize = 5;
const MAX_PLATE_LENGTH: usize = 8;

/// A date found in citation text
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractedDate {
    /// Substring as printed
    pub raw_value: String,
    pub parsed_date: NaiveDate,
    /// Byte offset of the match in the source text
    pub position: usize,
}

/// Extracts structured fields from citation text
#[derive(Debug, Clone, Default)]
pub struct FieldExtractor {
    table: CityPatternTable,
}

impl FieldExtractor {
    pub fn new() -> Self {
        Self {
            table: CityPatternTable::builtin(),
        }
    }

    /// Extractor whose plate filter uses the given city table
    pub fn with_table(table: CityPatternTable) -> Self {
        Self { table }
    }

    /// Extract every field, combining them with an already matched citation number
    pub fn extract_fields(&self, text: &str, citation_number: Option<&str>) -> ParsedFields {
        self.extract_fields_as_of(text, citation_number, Local::now().date_naive())
    }

    /// [`extract_fields`](Self::extract_fields) with an explicit current date
    pub fn extract_fields_as_of(
        &self,
        text: &str,
        citation_number: Option<&str>,
        today: NaiveDate,
    ) -> ParsedFields {
        let fields = ParsedFields {
            citation_number: citation_number.map(str::to_string),
            violation_date: self.extract_violation_date_as_of(text, today),
            amount: self.extract_amount(text),
            violation_code: self.extract_violation_code(text),
            license_plate: self.extract_license_plate(text, citation_number),
        };
        debug!(
            has_date = fields.violation_date.is_some(),
            has_amount = fields.amount.is_some(),
            has_code = fields.violation_code.is_some(),
            has_plate = fields.license_plate.is_some(),
            "Extracted citation fields"
        );
        fields
    }

    /// All parseable dates, ordered by position
    ///
    /// Overlapping matches of later patterns are dropped.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use citation_scan::field_extraction::FieldExtractor;
    ///
    /// let dates = FieldExtractor::new().extract_dates("Ticket issued on 01/15/2024");
    /// assert_eq!(dates[0].raw_value, "01/15/2024");
    /// ```
    pub fn extract_dates(&self, text: &str) -> Vec<ExtractedDate> {
        let mut dates: Vec<(ExtractedDate, usize)> = Vec::new();

        for (regex, formats) in DATE_PATTERNS.iter() {
            for m in regex.find_iter(text) {
                let overlaps = dates
                    .iter()
                    .any(|(d, end)| m.start() < *end && d.position < m.end());
                if overlaps {
                    continue;
                }
                if let Some(parsed_date) = parse_date(m.as_str(), formats) {
                    trace!(raw = %m.as_str(), position = m.start(), "Date match");
                    dates.push((
                        ExtractedDate {
                            raw_value: m.as_str().to_string(),
                            parsed_date,
                            position: m.start(),
                        },
                        m.end(),
                    ));
                }
            }
        }

        let mut dates: Vec<ExtractedDate> = dates.into_iter().map(|(d, _)| d).collect();
        dates.sort_by_key(|d| d.position);
        dates
    }

    /// Violation date relative to today's local date
    pub fn extract_violation_date(&self, text: &str) -> Option<NaiveDate> {
        self.extract_violation_date_as_of(text, Local::now().date_naive())
    }

    /// Earliest date not after `today`; the first printed date when every date is in the future
    pub fn extract_violation_date_as_of(&self, text: &str, today: NaiveDate) -> Option<NaiveDate> {
        let dates = self.extract_dates(text);
        dates
            .iter()
            .map(|d| d.parsed_date)
            .filter(|date| *date <= today)
            .min()
            .or_else(|| dates.first().map(|d| d.parsed_date))
    }

    /// First amount found, trying `$D.CC`, `$D`, then bare `D.CC`
    pub fn extract_amount(&self, text: &str) -> Option<f64> {
        AMOUNT_PATTERNS.iter().find_map(|regex| {
            regex
                .captures(text)
                .and_then(|caps| caps.get(1))
                .and_then(|m| m.as_str().parse::<f64>().ok())
        })
    }

    /// Violation code such as `CVC 22500`, `SECTION 7.2.20` or `TRC-7.2.22`
    pub fn extract_violation_code(&self, text: &str) -> Option<String> {
        if let Some(code) = capture_upper(&CVC_CODE, text) {
            return Some(format!("CVC {}", code));
        }
        if let Some(code) = capture_upper(&SECTION_CODE, text) {
            return Some(format!("SECTION {}", code));
        }
        let upper = text.to_uppercase();
        capture_upper(&PREFIXED_CODE, &upper).or_else(|| capture_upper(&DOTTED_CODE, &upper))
    }

    /// Licence plate, 5 to 8 alphanumerics
    ///
    /// Labelled plates (`PLATE: AB123`) are tried before bare plate-shaped
    /// tokens. No candidate may equal the citation number or satisfy any city
    /// citation pattern, so citation numbers are never reported as plates.
    pub fn extract_license_plate(&self, text: &str, citation_number: Option<&str>) -> Option<String> {
        let upper = text.to_uppercase();
        let accept = |candidate: &String| {
            is_plate_shaped(candidate)
                && citation_number != Some(candidate.as_str())
                && !self.table.matches_any(candidate)
        };

        let labelled = LABELLED_PLATE
            .captures_iter(&upper)
            .filter_map(|caps| caps.get(1))
            .map(|m| m.as_str().replace(['-', ' '], ""))
            .find(|candidate| accept(candidate));
        if labelled.is_some() {
            return labelled;
        }

        PLATE_SHAPES.iter().find_map(|regex| {
            regex
                .find_iter(&upper)
                .map(|m| m.as_str().replace('-', ""))
                .find(|candidate| accept(candidate))
        })
    }
}

fn parse_date(raw: &str, formats: &[&str]) -> Option<NaiveDate> {
    formats
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(raw, format).ok())
}

fn capture_upper(regex: &Regex, text: &str) -> Option<String> {
    regex
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_uppercase())
}

fn is_plate_shaped(candidate: &str) -> bool {
    (MIN_PLATE_LENGTH..=MAX_PLATE_LENGTH).contains(&candidate.len())
        && candidate.chars().all(|c| c.is_ascii_alphanumeric())
        && candidate.chars().any(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor() -> FieldExtractor {
        FieldExtractor::new()
    }

    #[test]
    fn test_dates_all_formats() {
        let ex = extractor();
        assert_eq!(ex.extract_dates("Issued 01/15/2024")[0].raw_value, "01/15/2024");
        assert_eq!(
            ex.extract_dates("Issued 1-5-2024")[0].parsed_date,
            NaiveDate::from_ymd_opt(2024, 1, 5).unwrap()
        );
        assert_eq!(
            ex.extract_dates("2024-03-09 10:15")[0].parsed_date,
            NaiveDate::from_ymd_opt(2024, 3, 9).unwrap()
        );
        assert_eq!(
            ex.extract_dates("January 15, 2024")[0].parsed_date,
            NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()
        );
        assert_eq!(
            ex.extract_dates("Jan 15 2024")[0].parsed_date,
            NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()
        );
    }

    #[test]
    fn test_invalid_calendar_dates_are_skipped() {
        assert!(extractor().extract_dates("13/45/2024").is_empty());
        assert!(extractor().extract_dates("Ticket 15, 2024").is_empty());
    }

    #[test]
    fn test_dates_ordered_by_position() {
        let dates = extractor().extract_dates("Due 2024-02-15, issued 01/15/2024");
        assert_eq!(dates.len(), 2);
        assert_eq!(dates[0].raw_value, "2024-02-15");
        assert_eq!(dates[1].raw_value, "01/15/2024");
    }

    #[test]
    fn test_violation_date_skips_future_dates() {
        let today = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
        let text = "Due 03/01/2024 issued 01/15/2024 notice 01/20/2024";
        assert_eq!(
            extractor().extract_violation_date_as_of(text, today),
            NaiveDate::from_ymd_opt(2024, 1, 15)
        );
    }

    #[test]
    fn test_violation_date_falls_back_to_first_when_all_future() {
        let today = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        let text = "Due 03/01/2024 issued 01/15/2024";
        assert_eq!(
            extractor().extract_violation_date_as_of(text, today),
            NaiveDate::from_ymd_opt(2024, 3, 1)
        );
    }

    #[test]
    fn test_amount_priority() {
        let ex = extractor();
        assert_eq!(ex.extract_amount("Fine: $95.00"), Some(95.0));
        assert_eq!(ex.extract_amount("Fine 12.50 or $110"), Some(110.0));
        assert_eq!(ex.extract_amount("Total due 72.25"), Some(72.25));
        assert_eq!(ex.extract_amount("no money here"), None);
    }

    #[test]
    fn test_amount_ignores_dotted_violation_codes() {
        let ex = extractor();
        assert_eq!(ex.extract_amount("Section 7.2.20 meter"), None);
        assert_eq!(ex.extract_amount("7.2.35 fine 72.25"), Some(72.25));
        assert_eq!(ex.extract_amount("Section 7.2.20 fine $95.00"), Some(95.0));
    }

    #[test]
    fn test_violation_codes() {
        let ex = extractor();
        assert_eq!(ex.extract_violation_code("cvc 22500(e) red zone").as_deref(), Some("CVC 22500(E)"));
        assert_eq!(ex.extract_violation_code("Section 7.2.20 meter").as_deref(), Some("SECTION 7.2.20"));
        assert_eq!(ex.extract_violation_code("code TRC-7.2.22").as_deref(), Some("TRC-7.2.22"));
        assert_eq!(ex.extract_violation_code("violation 7.2.35").as_deref(), Some("7.2.35"));
        assert_eq!(ex.extract_violation_code("nothing relevant"), None);
    }

    #[test]
    fn test_labelled_plate() {
        let ex = extractor();
        assert_eq!(
            ex.extract_license_plate("License Plate: ab123 CA", None).as_deref(),
            Some("AB123")
        );
        assert_eq!(
            ex.extract_license_plate("TAG # XY-123", None).as_deref(),
            Some("XY123")
        );
    }

    #[test]
    fn test_labelled_plate_excludes_citation_patterns() {
        let ex = extractor();
        // Denver citation shape
        assert_eq!(
            ex.extract_license_plate("PLATE 1234567 citation SFMTA91234567", Some("SFMTA91234567")),
            None
        );
        // Los Angeles citation shape
        assert_eq!(ex.extract_license_plate("License Plate: 7abc123", None), None);
        assert_eq!(
            ex.extract_license_plate("PLATE 7ABC123 vehicle AB123", None).as_deref(),
            Some("AB123")
        );
    }

    #[test]
    fn test_unlabelled_plate_excludes_citation_patterns() {
        let ex = extractor();
        // 6+ alphanumerics satisfy the Los Angeles citation pattern
        assert_eq!(ex.extract_license_plate("ticket 7ABC123", None), None);
        assert_eq!(ex.extract_license_plate("vehicle AB123 blue", None).as_deref(), Some("AB123"));
    }

    #[test]
    fn test_labelled_plate_never_equals_citation_number() {
        let ex = extractor();
        assert_eq!(ex.extract_license_plate("PLATE 1234567", Some("1234567")), None);
    }

    #[test]
    fn test_extract_fields_combines_everything() {
        let text = "SFMTA91234567 01/15/2024 $95.00 CVC 22500 PLATE AB123";
        let fields = extractor().extract_fields(text, Some("SFMTA91234567"));
        assert_eq!(fields.citation_number.as_deref(), Some("SFMTA91234567"));
        assert_eq!(fields.violation_date, NaiveDate::from_ymd_opt(2024, 1, 15));
        assert_eq!(fields.amount, Some(95.0));
        assert_eq!(fields.violation_code.as_deref(), Some("CVC 22500"));
        assert_eq!(fields.license_plate.as_deref(), Some("AB123"));
    }
}
