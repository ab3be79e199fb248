//! # Performance Checks
//!
//! Coarse throughput checks for the classification pipeline. Bounds are loose
//! enough for unoptimized builds; they catch pathological regressions such as
//! recompiling patterns per call.


#[cfg(test)]
mod tests {
    use super::test_helpers::{create_engine, observations};
    use citation_scan::pattern_matcher::PatternMatcher;
    use std::time::{Duration, Instant};

    #[test]
    fn test_pattern_matching_throughput() {
        let matcher = PatternMatcher::new();
        let iterations = 2000u32;

        let start = Instant::now();
        for i in 0..iterations {
            let _ = matcher.parse(&format!("SFMTA{:08}", i));
        }
        let duration = start.elapsed();

        println!(
            "📊 Pattern matching: {}ns per parse ({} iterations)",
            duration.as_nanos() / iterations as u128,
            iterations
        );
        assert!(duration < Duration::from_secs(10));
    }

    #[test]
    fn test_end_to_end_throughput() {
        let engine = create_engine();
        let text = "CITY OF DENVER PARKING VIOLATION 1234567 $50.00 03/02/2024 PLATE ABC-1234";
        let obs = observations(&[
            ("CITY OF DENVER", 0.9),
            ("PARKING VIOLATION", 0.88),
            ("1234567", 0.93),
            ("$50.00 03/02/2024", 0.85),
        ]);
        let iterations = 500u32;

        let start = Instant::now();
        for _ in 0..iterations {
            let analysis = engine.analyze(text, &obs, None);
            assert!(analysis.parsing.is_match());
        }
        let duration = start.elapsed();
        let avg = duration / iterations;

        println!("📊 End-to-end analysis: {:?} per scan ({} iterations)", avg, iterations);
        assert!(avg < Duration::from_millis(20), "analysis took {:?} per scan", avg);
    }
}
