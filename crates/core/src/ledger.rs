use thiserror::Error;

use super::reading::{format_reading, Reading};
use super::trip::{Trip, TripId, TripTarget};

#[derive(Debug, Clone, Error, PartialEq)]
pub enum LedgerError {
    #[error("Trip not found: {0}")]
    TripNotFound(TripId),
    #[error("Invalid {reading}: {value} (must be greater than 0)")]
    InvalidValue { reading: Reading, value: f64 },
}

/// The narrow write path a confirmed photo import uses.
///
/// Implementations store both readings on the target trip, creating a new
/// trip when the target is [`TripTarget::New`], and return the id written to.
pub trait TripLedger {
    fn apply_values(
        &mut self,
        target: &TripTarget,
        km_per_liter: f64,
        distance_km: f64,
    ) -> Result<TripId, LedgerError>;
}

/// Vec-backed ledger for embedding without persistence and for tests.
#[derive(Debug, Clone, Default)]
pub struct InMemoryLedger {
    trips: Vec<Trip>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_trips(trips: Vec<Trip>) -> Self {
        Self { trips }
    }

    pub fn trips(&self) -> &[Trip] {
        &self.trips
    }

    pub fn get(&self, id: TripId) -> Option<&Trip> {
        self.trips.iter().find(|t| t.id == id)
    }

    pub fn add_trip(&mut self, trip: Trip) -> TripId {
        let id = trip.id;
        self.trips.push(trip);
        id
    }
}

impl TripLedger for InMemoryLedger {
    fn apply_values(
        &mut self,
        target: &TripTarget,
        km_per_liter: f64,
        distance_km: f64,
    ) -> Result<TripId, LedgerError> {
        check_positive(Reading::KmPerLiter, km_per_liter)?;
        check_positive(Reading::DistanceKm, distance_km)?;

        match target {
            TripTarget::New => {
                let mut trip = Trip::today();
                write_readings(&mut trip, km_per_liter, distance_km);
                Ok(self.add_trip(trip))
            }
            TripTarget::Existing(id) => {
                let trip = self
                    .trips
                    .iter_mut()
                    .find(|t| t.id == *id)
                    .ok_or(LedgerError::TripNotFound(*id))?;
                write_readings(trip, km_per_liter, distance_km);
                Ok(trip.id)
            }
        }
    }
}

fn write_readings(trip: &mut Trip, km_per_liter: f64, distance_km: f64) {
    trip.km_per_liter = format_reading(km_per_liter);
    trip.distance_km = format_reading(distance_km);
}

fn check_positive(reading: Reading, value: f64) -> Result<(), LedgerError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(LedgerError::InvalidValue { reading, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn trip_on(y: i32, m: u32, d: u32) -> Trip {
        Trip::new(NaiveDate::from_ymd_opt(y, m, d).unwrap())
    }

    #[test]
    fn apply_to_new_creates_one_trip() {
        let mut ledger = InMemoryLedger::new();
        let id = ledger.apply_values(&TripTarget::New, 14.5, 120.0).unwrap();

        assert_eq!(ledger.trips().len(), 1);
        let trip = ledger.get(id).unwrap();
        assert_eq!(trip.km_per_liter, "14.5");
        assert_eq!(trip.distance_km, "120");
    }

    #[test]
    fn apply_to_existing_updates_only_that_trip() {
        let mut first = trip_on(2024, 1, 15);
        first.label = "Office run".to_string();
        let second = trip_on(2024, 1, 16);
        let (first_id, second_id) = (first.id, second.id);
        let mut ledger = InMemoryLedger::with_trips(vec![first, second]);

        let written = ledger
            .apply_values(&TripTarget::Existing(first_id), 12.0, 33.3)
            .unwrap();

        assert_eq!(written, first_id);
        let updated = ledger.get(first_id).unwrap();
        assert_eq!(updated.km_per_liter, "12");
        assert_eq!(updated.distance_km, "33.3");
        assert_eq!(updated.label, "Office run");
        assert!(ledger.get(second_id).unwrap().km_per_liter.is_empty());
    }

    #[test]
    fn apply_to_unknown_trip_fails() {
        let mut ledger = InMemoryLedger::new();
        let missing = TripId::new();
        assert_eq!(
            ledger.apply_values(&TripTarget::Existing(missing), 10.0, 10.0),
            Err(LedgerError::TripNotFound(missing))
        );
    }

    #[test]
    fn apply_rejects_non_positive_values() {
        let mut ledger = InMemoryLedger::new();
        assert!(matches!(
            ledger.apply_values(&TripTarget::New, 0.0, 50.0),
            Err(LedgerError::InvalidValue { reading: Reading::KmPerLiter, .. })
        ));
        assert!(matches!(
            ledger.apply_values(&TripTarget::New, 10.0, f64::NAN),
            Err(LedgerError::InvalidValue { reading: Reading::DistanceKm, .. })
        ));
        assert!(ledger.trips().is_empty());
    }
}
