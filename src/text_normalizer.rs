//! # Text Normalizer
//!
//! Canonicalizes raw OCR text before citation-number matching: uppercase,
//! no whitespace, common glyph confusions folded, ASCII alphanumerics only.

/// Normalize OCR text for citation-number matching
///
/// - `|` and lowercase `l` become `I` (mapped before uppercasing so the
///   lowercase form is still distinguishable)
/// - everything is uppercased
/// - whitespace and every non-alphanumeric character is dropped
///
/// `0` and `O` are never exchanged: numeric citation numbers rely on the zeros.
///
/// # Examples
///
/// ```rust
/// use citation_scan::text_normalizer::normalize;
///
/// assert_eq!(normalize("sfmta 9l23-4567"), "SFMTA9I234567");
/// assert_eq!(normalize("12345 06789"), "1234506789");
/// ```
pub fn normalize(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '|' | 'l' => 'I',
            other => other,
        })
        .flat_map(char::to_uppercase)
        .filter(char::is_ascii_alphanumeric)
        .collect()
}

/// Uppercase and collapse runs of whitespace to single spaces
///
/// Used by the keyword classifier, which needs word boundaries that
/// [`normalize`] removes.
pub fn normalize_for_keywords(text: &str) -> String {
    text.split_whitespace()
        .map(str::to_uppercase)
        .collect::<Vec<_>>()
        .join(" ")
}
