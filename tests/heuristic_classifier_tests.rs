//! Integration tests for the keyword heuristic classifier

use citation_scan::heuristic_classifier::{
    assess_text_quality, default_citation_type_keywords, extract_key_phrases, CityTrainingData,
    HeuristicClassifier,
};
use citation_scan::models::CitationType;

fn create_classifier() -> HeuristicClassifier {
    HeuristicClassifier::new()
}

#[test]
fn test_san_francisco_parking_notice() {
    let result = create_classifier()
        .classify("SFMTA Parking Citation SFMTA91234567 Meter expired. Fine $95.00 01/15/2024");

    assert_eq!(result.city_id.as_deref(), Some("us-ca-san_francisco"));
    assert_eq!(result.city_name.as_deref(), Some("San Francisco"));
    assert_eq!(result.citation_type, CitationType::Parking);
    assert!(result.confidence > 0.6);
    assert!(result.key_phrases_found.contains(&"METER EXPIRED".to_string()));
}

#[test]
fn test_new_york_notice() {
    let result = create_classifier()
        .classify("NYC Department of Finance parking violation 1234567890 penalty amount due");
    assert_eq!(result.city_id.as_deref(), Some("us-ny-new_york"));
}

#[test]
fn test_los_angeles_notice() {
    let result = create_classifier()
        .classify("City of Los Angeles LAPD parking citation vehicle code");
    assert_eq!(result.city_id.as_deref(), Some("us-ca-los_angeles"));
}

#[test]
fn test_denver_notice() {
    let result = create_classifier().classify("1234567 Denver Parking Violation");
    assert_eq!(result.city_id.as_deref(), Some("us-co-denver"));
}

#[test]
fn test_citation_types() {
    let classifier = create_classifier();
    assert_eq!(
        classifier.classify("SPEEDING 45 MPH in 25 limit").citation_type,
        CitationType::Speeding
    );
    assert_eq!(
        classifier.classify("RED LIGHT CAMERA PHOTO enforcement").citation_type,
        CitationType::RedLight
    );
    assert_eq!(
        classifier.classify("violation of municipal city code, local law").citation_type,
        CitationType::Municipal
    );
    assert_eq!(
        classifier.classify("hello world").citation_type,
        CitationType::Unknown
    );
}

#[test]
fn test_empty_text() {
    let result = create_classifier().classify("");
    assert_eq!(result.city_id, None);
    assert_eq!(result.citation_type, CitationType::Unknown);
    // only the text quality baseline contributes
    assert!((result.confidence - 0.1).abs() < 1e-9);
    assert!(result.key_phrases_found.is_empty());
}

#[test]
fn test_confidence_bounds_and_alternatives() {
    let classifier = create_classifier();
    for text in [
        "",
        "SFMTA",
        "PARKING PARKING PARKING",
        "NYC LAPD DENVER SFMTA PARKING VIOLATION CITATION 1234567890 $50 01/01/2024",
    ] {
        let result = classifier.classify(text);
        assert!((0.0..=1.0).contains(&result.confidence), "text {:?}", text);
        assert!(result.alternative_cities.len() <= 3);
        assert!(result.alternative_types.len() <= 3);
    }
}

#[test]
fn test_deterministic() {
    let classifier = create_classifier();
    let text = "SFMTA parking violation 01/15/2024 $95";
    assert_eq!(classifier.classify(text), classifier.classify(text));
}

#[test]
fn test_key_phrase_extraction() {
    let phrases = extract_key_phrases("Department of Transportation TRAFFIC CITATION");
    assert_eq!(
        phrases,
        vec!["TRAFFIC CITATION".to_string(), "DEPARTMENT OF TRANSPORTATION".to_string()]
    );
}

#[test]
fn test_text_quality_bounds() {
    let long = "w ".repeat(100);
    for text in ["", "????", "a b c d e f $1 01/01/24", long.as_str()] {
        let quality = assess_text_quality(text);
        assert!((0.0..=1.0).contains(&quality));
    }
}

#[test]
fn test_substitute_tables() {
    let cities = vec![CityTrainingData::new(
        "us-xx-test",
        "Test City",
        &["TEST CITY"],
        &[r"TC\d{6}"],
        &["PARKING"],
    )
    .unwrap()];
    let classifier =
        HeuristicClassifier::with_training_data(cities, default_citation_type_keywords()).unwrap();

    let result = classifier.classify("Test City parking TC123456");
    assert_eq!(result.city_id.as_deref(), Some("us-xx-test"));
    assert!(classifier.classify("SFMTA").city_id.is_none());
}

#[test]
fn test_training_data_export() {
    let examples = create_classifier().export_training_data();
    assert!(!examples.is_empty());
    assert!(examples
        .iter()
        .all(|e| e.citation_type == CitationType::Parking && e.text.ends_with("PARKING VIOLATION")));
    assert!(examples.iter().any(|e| e.city_id == "us-co-denver"));

    let json = serde_json::to_string(&examples[0]).unwrap();
    assert!(json.contains("\"citation_type\":\"parking\""));
}
