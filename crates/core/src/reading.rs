use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::RangeInclusive;

/// Plausible fuel efficiency for a road vehicle (km/L).
pub const KM_PER_LITER_RANGE: RangeInclusive<f64> = 3.0..=60.0;

/// Plausible single-trip distance (km).
pub const DISTANCE_KM_RANGE: RangeInclusive<f64> = 0.1..=1000.0;

/// The two readings a trip needs from a photo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reading {
    KmPerLiter,
    DistanceKm,
}

impl Reading {
    pub fn expected_range(self) -> RangeInclusive<f64> {
        match self {
            Reading::KmPerLiter => KM_PER_LITER_RANGE,
            Reading::DistanceKm => DISTANCE_KM_RANGE,
        }
    }

    /// True for a positive value that falls outside the expected range.
    /// Non-positive values are rejected elsewhere, not flagged here.
    pub fn is_implausible(self, value: f64) -> bool {
        value > 0.0 && !self.expected_range().contains(&value)
    }
}

impl fmt::Display for Reading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reading::KmPerLiter => write!(f, "km/L"),
            Reading::DistanceKm => write!(f, "distance (km)"),
        }
    }
}

/// Canonical string form of a reading as stored on a trip (`14.5`, `120`).
pub fn format_reading(value: f64) -> String {
    value.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn km_per_liter_bounds_are_inclusive() {
        assert!(!Reading::KmPerLiter.is_implausible(3.0));
        assert!(!Reading::KmPerLiter.is_implausible(60.0));
        assert!(Reading::KmPerLiter.is_implausible(2.0));
        assert!(Reading::KmPerLiter.is_implausible(60.5));
    }

    #[test]
    fn distance_bounds() {
        assert!(!Reading::DistanceKm.is_implausible(0.1));
        assert!(!Reading::DistanceKm.is_implausible(1000.0));
        assert!(Reading::DistanceKm.is_implausible(0.05));
        assert!(Reading::DistanceKm.is_implausible(1200.0));
    }

    #[test]
    fn non_positive_is_not_flagged() {
        assert!(!Reading::KmPerLiter.is_implausible(0.0));
        assert!(!Reading::DistanceKm.is_implausible(-4.0));
    }

    #[test]
    fn format_reading_drops_trailing_zero() {
        assert_eq!(format_reading(120.0), "120");
        assert_eq!(format_reading(14.5), "14.5");
    }
}
