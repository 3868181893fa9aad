pub mod ledger;
pub mod reading;
pub mod trip;

pub use ledger::{InMemoryLedger, LedgerError, TripLedger};
pub use reading::{format_reading, Reading};
pub use trip::{Trip, TripId, TripTarget};
