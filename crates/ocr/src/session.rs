use ambagas_core::{Reading, TripTarget};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::{is_low_confidence, CandidateSet, Candidates};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Idle,
    Running,
    Ready,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Idle => write!(f, "idle"),
            Phase::Running => write!(f, "running"),
            Phase::Ready => write!(f, "ready"),
        }
    }
}

/// User-facing advisories shown in the review step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    /// Low engine confidence, or nothing matched either reading.
    NoValuesDetected,
    /// Preprocessing or recognition failed outright.
    RecognitionFailed,
    /// Apply attempted with a chosen value that is not a positive number.
    InvalidApplyInput,
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::NoValuesDetected => {
                write!(f, "Could not confidently detect values. Please input manually.")
            }
            Notice::RecognitionFailed => write!(f, "Couldn't detect, please input manually."),
            Notice::InvalidApplyInput => write!(f, "Both values must be greater than 0."),
        }
    }
}

/// Non-blocking warning for chosen values outside the plausible ranges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeAdvisory {
    pub km_per_liter: bool,
    pub distance_km: bool,
}

impl fmt::Display for RangeAdvisory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Value is outside expected range. You can still apply if this is correct."
        )
    }
}

/// Candidates plus the two values the user is about to confirm.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Extraction {
    pub km_per_liter_candidates: CandidateSet,
    pub distance_candidates: CandidateSet,
    pub chosen_km_per_liter: String,
    pub chosen_distance_km: String,
}

impl Extraction {
    /// The first candidate of each list is pre-filled as the chosen value.
    pub fn from_candidates(candidates: Candidates) -> Self {
        let chosen = |set: &CandidateSet| set.first().map(|v| v.to_string()).unwrap_or_default();
        Self {
            chosen_km_per_liter: chosen(&candidates.km_per_liter),
            chosen_distance_km: chosen(&candidates.distance),
            km_per_liter_candidates: candidates.km_per_liter,
            distance_candidates: candidates.distance,
        }
    }

    pub fn raw_text(&self) -> &str {
        &self.km_per_liter_candidates.raw_text
    }

    /// Both chosen values as strictly positive numbers, if they parse.
    pub fn chosen_values(&self) -> Option<(f64, f64)> {
        let km_per_liter = parse_positive(&self.chosen_km_per_liter)?;
        let distance_km = parse_positive(&self.chosen_distance_km)?;
        Some((km_per_liter, distance_km))
    }

    pub fn range_advisory(&self) -> Option<RangeAdvisory> {
        let implausible = |reading: Reading, s: &str| {
            parse_positive(s).is_some_and(|v| reading.is_implausible(v))
        };
        let advisory = RangeAdvisory {
            km_per_liter: implausible(Reading::KmPerLiter, &self.chosen_km_per_liter),
            distance_km: implausible(Reading::DistanceKm, &self.chosen_distance_km),
        };
        (advisory.km_per_liter || advisory.distance_km).then_some(advisory)
    }
}

fn parse_positive(s: &str) -> Option<f64> {
    s.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v > 0.0)
}

/// State of the single photo-import session.
///
/// Transitions consume the current value and return the next one; the review
/// workflow publishes each result to observers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OcrSession {
    pub phase: Phase,
    pub progress_percent: u8,
    pub target: Option<TripTarget>,
    pub extracted: Option<Extraction>,
    pub confidence: Option<f32>,
    /// Advisory for the user; empty when there is none.
    pub message: String,
}

impl OcrSession {
    pub fn idle() -> Self {
        Self::default()
    }

    pub fn running(target: TripTarget) -> Self {
        Self {
            phase: Phase::Running,
            target: Some(target),
            ..Self::default()
        }
    }

    pub fn is_running(&self) -> bool {
        self.phase == Phase::Running
    }

    pub fn is_ready(&self) -> bool {
        self.phase == Phase::Ready
    }

    /// Progress only moves forward, and only while running.
    pub fn with_progress(self, percent: u8) -> Self {
        if !self.is_running() {
            return self;
        }
        Self {
            progress_percent: self.progress_percent.max(percent.min(100)),
            ..self
        }
    }

    /// Recognition finished: candidates pre-filled, advisory set when the
    /// engine was unsure or nothing was found.
    pub fn recognized(self, confidence: f32, candidates: Candidates) -> Self {
        let message = if is_low_confidence(confidence) || candidates.is_empty() {
            Notice::NoValuesDetected.to_string()
        } else {
            String::new()
        };
        Self {
            phase: Phase::Ready,
            extracted: Some(Extraction::from_candidates(candidates)),
            confidence: Some(confidence),
            message,
            ..self
        }
    }

    /// Preprocessing or recognition failed; the user types the values instead.
    pub fn failed(self) -> Self {
        Self {
            phase: Phase::Ready,
            extracted: Some(Extraction::default()),
            confidence: Some(0.0),
            message: Notice::RecognitionFailed.to_string(),
            ..self
        }
    }

    pub fn with_chosen_km_per_liter(self, value: impl Into<String>) -> Self {
        let value = value.into();
        self.edit(|e| e.chosen_km_per_liter = value)
    }

    pub fn with_chosen_distance_km(self, value: impl Into<String>) -> Self {
        let value = value.into();
        self.edit(|e| e.chosen_distance_km = value)
    }

    pub fn with_message(self, message: impl Into<String>) -> Self {
        Self { message: message.into(), ..self }
    }

    pub fn range_advisory(&self) -> Option<RangeAdvisory> {
        self.extracted.as_ref()?.range_advisory()
    }

    fn edit(mut self, f: impl FnOnce(&mut Extraction)) -> Self {
        if let Some(extraction) = self.extracted.as_mut() {
            f(extraction);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::Extractor;

    fn ready_with(kpl: &str, dist: &str) -> OcrSession {
        OcrSession::running(TripTarget::New)
            .recognized(90.0, Candidates::default())
            .with_chosen_km_per_liter(kpl)
            .with_chosen_distance_km(dist)
    }

    #[test]
    fn running_starts_from_zero() {
        let s = OcrSession::running(TripTarget::New);
        assert_eq!(s.phase, Phase::Running);
        assert_eq!(s.progress_percent, 0);
        assert!(s.extracted.is_none());
        assert!(s.message.is_empty());
    }

    #[test]
    fn progress_never_goes_backwards() {
        let s = OcrSession::running(TripTarget::New)
            .with_progress(40)
            .with_progress(20)
            .with_progress(120);
        assert_eq!(s.progress_percent, 100);
    }

    #[test]
    fn progress_ignored_outside_running() {
        let s = OcrSession::idle().with_progress(50);
        assert_eq!(s.progress_percent, 0);
    }

    #[test]
    fn recognized_prefills_first_candidates() {
        let candidates = Extractor::extract("14.5 km/l 15 km/l, distance 120 km");
        let s = OcrSession::running(TripTarget::New).recognized(80.0, candidates);
        let e = s.extracted.unwrap();
        assert_eq!(s.phase, Phase::Ready);
        assert_eq!(e.chosen_km_per_liter, "14.5");
        assert_eq!(e.chosen_distance_km, "120");
        assert!(s.message.is_empty());
        assert_eq!(s.confidence, Some(80.0));
    }

    #[test]
    fn low_confidence_sets_advisory() {
        let candidates = Extractor::extract("14.5 km/l");
        let s = OcrSession::running(TripTarget::New).recognized(40.0, candidates);
        assert_eq!(s.message, Notice::NoValuesDetected.to_string());
    }

    #[test]
    fn no_candidates_sets_advisory_even_when_confident() {
        let s = OcrSession::running(TripTarget::New).recognized(95.0, Candidates::default());
        assert!(!s.message.is_empty());
        let e = s.extracted.unwrap();
        assert!(e.chosen_km_per_liter.is_empty());
        assert!(e.chosen_distance_km.is_empty());
    }

    #[test]
    fn failed_lands_in_ready_with_empty_candidates() {
        let s = OcrSession::running(TripTarget::New).with_progress(30).failed();
        assert_eq!(s.phase, Phase::Ready);
        assert_eq!(s.confidence, Some(0.0));
        assert_eq!(s.message, Notice::RecognitionFailed.to_string());
        let e = s.extracted.unwrap();
        assert!(e.km_per_liter_candidates.is_empty());
        assert!(e.distance_candidates.is_empty());
    }

    #[test]
    fn chosen_values_require_positive_numbers() {
        assert_eq!(ready_with("14.5", "120").extracted.unwrap().chosen_values(), Some((14.5, 120.0)));
        assert_eq!(ready_with("0", "50").extracted.unwrap().chosen_values(), None);
        assert_eq!(ready_with("", "50").extracted.unwrap().chosen_values(), None);
        assert_eq!(ready_with("abc", "50").extracted.unwrap().chosen_values(), None);
        assert_eq!(ready_with(" 9 ", "-2").extracted.unwrap().chosen_values(), None);
        assert_eq!(ready_with("inf", "5").extracted.unwrap().chosen_values(), None);
    }

    #[test]
    fn range_advisory_flags_each_reading() {
        assert_eq!(ready_with("14.5", "120").range_advisory(), None);
        assert_eq!(
            ready_with("2", "120").range_advisory(),
            Some(RangeAdvisory { km_per_liter: true, distance_km: false })
        );
        assert_eq!(
            ready_with("10", "1500").range_advisory(),
            Some(RangeAdvisory { km_per_liter: false, distance_km: true })
        );
        // Non-positive values are an apply error, not a range advisory.
        assert_eq!(ready_with("0", "").range_advisory(), None);
    }

    #[test]
    fn phase_display() {
        assert_eq!(Phase::Ready.to_string(), "ready");
        assert_eq!(Phase::Idle.to_string(), "idle");
    }
}
