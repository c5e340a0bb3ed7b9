//! QR scan workflow for meal counting and staff check-in
//!
//! A decoded QR payload is reduced to an attendee identity, submitted once,
//! shown to the operator and then, after a short pause, the station accepts
//! the next code. Decodes that arrive while a scan is in progress are dropped.

mod extract;
mod machine;
mod station;

pub use extract::{extract_identity, QrIdentity};
pub use machine::{Effect, ScanEvent, ScanMachine, ScanOutcome, ScanState};
pub use station::{
    CheckInSubmitter, MealScanSubmitter, ScanBroadcaster, ScanStation, ScanSubmitter,
};
