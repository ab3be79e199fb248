//! # Remediation Advisor
//!
//! Turns weak confidence components into image preprocessing suggestions for a
//! capture retry. Nothing here retries; the caller decides what to do with the
//! returned options.

use serde::Serialize;
use tracing::debug;

use crate::models::{ConfidenceLevel, Recommendation, ScoreResult};

/// Components below this score trigger a suggestion
const WEAK_COMPONENT_THRESHOLD: f64 = 0.5;

/// Preprocessing steps the image collaborator can apply before re-running OCR
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct PreprocessingOptions {
    pub enhance_contrast: bool,
    pub reduce_noise: bool,
    pub correct_perspective: bool,
    pub binarize: bool,
}

impl PreprocessingOptions {
    /// Every preprocessing step enabled
    pub fn all() -> Self {
        Self {
            enhance_contrast: true,
            reduce_noise: true,
            correct_perspective: true,
            binarize: true,
        }
    }

    pub fn any_enabled(&self) -> bool {
        self.enhance_contrast || self.reduce_noise || self.correct_perspective || self.binarize
    }

    /// Names of the enabled steps
    pub fn enabled_steps(&self) -> Vec<&'static str> {
        [
            ("enhance_contrast", self.enhance_contrast),
            ("reduce_noise", self.reduce_noise),
            ("correct_perspective", self.correct_perspective),
            ("binarize", self.binarize),
        ]
        .into_iter()
        .filter(|(_, enabled)| *enabled)
        .map(|(name, _)| name)
        .collect()
    }
}

/// Suggest preprocessing for a retry based on the weak components of `score`
///
/// - weak `vision_confidence` or `classifier_confidence`: contrast and noise
/// - weak `vision_confidence`: binarization as well
/// - weak `layout_confidence`: perspective correction, keyed on weak
///   `text_quality` when the score carries no layout component
///
/// A score without components (no observations at all) gets every step.
///
/// # Examples
///
/// ```rust
/// use citation_scan::models::{ConfidenceComponent, ConfidenceLevel, Recommendation, ScoreResult};
/// use citation_scan::remediation::suggest_fallback_options;
///
/// let score = ScoreResult {
///     overall_confidence: 0.4,
///     level: ConfidenceLevel::Low,
///     components: vec![ConfidenceComponent::new("layout_confidence", 0.2, 1.0)],
///     recommendation: Recommendation::Reject,
///     auto_accept_eligible: false,
/// };
/// let options = suggest_fallback_options(&score);
/// assert!(options.correct_perspective);
/// assert!(!options.binarize);
/// ```
pub fn suggest_fallback_options(score: &ScoreResult) -> PreprocessingOptions {
    if score.components.is_empty() {
        debug!("No confidence components, suggesting full preprocessing");
        return PreprocessingOptions::all();
    }

    let is_weak = |name: &str| {
        score
            .component_score(name)
            .is_some_and(|value| value < WEAK_COMPONENT_THRESHOLD)
    };

    let mut options = PreprocessingOptions::default();

    let weak_vision = is_weak("vision_confidence");
    if weak_vision || is_weak("classifier_confidence") {
        options.enhance_contrast = true;
        options.reduce_noise = true;
    }
    if weak_vision {
        options.binarize = true;
    }
    let weak_layout = match score.component_score("layout_confidence") {
        Some(_) => is_weak("layout_confidence"),
        None => is_weak("text_quality"),
    };
    if weak_layout {
        options.correct_perspective = true;
    }

    debug!(steps = ?options.enabled_steps(), "Suggested preprocessing options");
    options
}

/// Whether the capture flow should retry with preprocessing
pub fn should_use_fallback(score: &ScoreResult) -> bool {
    score.level == ConfidenceLevel::Low || score.recommendation == Recommendation::Reject
}
