use serde::{Deserialize, Serialize};

/// Confidence below which the review step asks for manual input.
pub const LOW_CONFIDENCE_THRESHOLD: f32 = 50.0;

pub fn is_low_confidence(confidence: f32) -> bool {
    confidence < LOW_CONFIDENCE_THRESHOLD
}

/// Text and self-reported confidence (0–100) from one engine run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecognitionResult {
    pub text: String,
    pub confidence: f32,
}

impl RecognitionResult {
    /// Non-finite confidence is treated as 0; everything else is clamped to 0–100.
    pub fn new(text: impl Into<String>, confidence: f32) -> Self {
        let confidence = if confidence.is_finite() {
            confidence.clamp(0.0, 100.0)
        } else {
            0.0
        };
        Self { text: text.into(), confidence }
    }
}

/// Candidate values for one reading, in first-seen order.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CandidateSet {
    /// Normalized recognized text, kept for audit.
    pub raw_text: String,
    /// Finite, strictly positive, deduplicated.
    pub values: Vec<f64>,
}

impl CandidateSet {
    pub fn new(raw_text: impl Into<String>, values: impl IntoIterator<Item = f64>) -> Self {
        let mut unique: Vec<f64> = Vec::new();
        for v in values {
            if v.is_finite() && v > 0.0 && !unique.contains(&v) {
                unique.push(v);
            }
        }
        Self { raw_text: raw_text.into(), values: unique }
    }

    pub fn first(&self) -> Option<f64> {
        self.values.first().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Extractor output for both readings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Candidates {
    pub km_per_liter: CandidateSet,
    pub distance: CandidateSet,
}

impl Candidates {
    /// True when neither reading produced a candidate.
    pub fn is_empty(&self) -> bool {
        self.km_per_liter.is_empty() && self.distance.is_empty()
    }

    pub fn raw_text(&self) -> &str {
        &self.km_per_liter.raw_text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognition_result_clamps_confidence() {
        assert_eq!(RecognitionResult::new("x", 140.0).confidence, 100.0);
        assert_eq!(RecognitionResult::new("x", -3.0).confidence, 0.0);
        assert_eq!(RecognitionResult::new("x", f32::NAN).confidence, 0.0);
    }

    #[test]
    fn low_confidence_threshold() {
        assert!(is_low_confidence(49.9));
        assert!(!is_low_confidence(50.0));
        assert!(is_low_confidence(RecognitionResult::new("", f32::NAN).confidence));
    }

    #[test]
    fn candidate_set_dedups_in_first_seen_order() {
        let set = CandidateSet::new("", [12.0, 30.0, 12.0, 7.5, 30.0]);
        assert_eq!(set.values, vec![12.0, 30.0, 7.5]);
        assert_eq!(set.first(), Some(12.0));
    }

    #[test]
    fn candidate_set_drops_non_positive_and_non_finite() {
        let set = CandidateSet::new("", [0.0, -1.0, f64::INFINITY, f64::NAN, 4.0]);
        assert_eq!(set.values, vec![4.0]);
    }

    #[test]
    fn empty_candidates() {
        let c = Candidates::default();
        assert!(c.is_empty());
        assert_eq!(c.km_per_liter.first(), None);
    }
}
