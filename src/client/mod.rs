//! Attendee-side check-in flow.
//!
//! Wires a scanner feed, a location capability and a check-in submitter into
//! a [`ScanSession`] that allows one submission at a time.

pub mod location;
pub mod scanner;
pub mod session;

pub use location::{DEFAULT_FIX_TIMEOUT, LocationError, LocationProvider, acquire_fix};
pub use scanner::{ScanFeed, ScanStream, scan_channel};
pub use session::{CheckInSubmitter, ClientOutcome, ScanSession};
