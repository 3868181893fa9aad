use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TripId(pub Uuid);

impl TripId {
    pub fn new() -> Self {
        TripId(Uuid::new_v4())
    }
}

impl Default for TripId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TripId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TripId {
    type Err = uuid::Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(TripId)
    }
}

/// The trip a photo import writes into once the user confirms the values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TripTarget {
    Existing(TripId),
    /// Create a fresh trip record on apply.
    New,
}

impl fmt::Display for TripTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TripTarget::Existing(id) => write!(f, "{id}"),
            TripTarget::New => write!(f, "new"),
        }
    }
}

impl FromStr for TripTarget {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "new" => Ok(TripTarget::New),
            other => other
                .parse::<TripId>()
                .map(TripTarget::Existing)
                .map_err(|e| format!("Unknown trip target '{other}': {e}")),
        }
    }
}

/// A trip as the ledger stores it. Readings are kept as the numeric strings
/// the user confirmed; an empty string means "not entered yet".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trip {
    pub id: TripId,
    pub date: NaiveDate,
    pub label: String,
    pub km_per_liter: String,
    pub distance_km: String,
}

impl Trip {
    pub fn new(date: NaiveDate) -> Self {
        Trip {
            id: TripId::new(),
            date,
            label: String::new(),
            km_per_liter: String::new(),
            distance_km: String::new(),
        }
    }

    pub fn today() -> Self {
        Self::new(chrono::Local::now().date_naive())
    }
}
