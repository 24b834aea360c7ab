//! Domain layer: identifiers, events, codes, geofencing and outcomes.
//!
//! Everything in this module is free of I/O. Storage lives in
//! [`crate::persistence`], orchestration in [`crate::service`].

pub mod attendance;
pub mod checkin;
pub mod checkin_code;
pub mod checkin_event;
pub mod event;
pub mod event_bus;
pub mod geofence;
pub mod ids;

pub use attendance::{
    AttendanceRecord, CheckInHistoryEntry, CheckInMethod, LeaderboardEntry, NewAttendance,
    PointsSummary,
};
pub use checkin::{CheckInAttempt, CheckInOutcome, CheckInToken};
pub use checkin_code::{CheckInCode, CodeFormatError};
pub use checkin_event::CheckInEvent;
pub use event::{Event, EventLocation, EventWindow, LocationPolicy, NewEvent};
pub use event_bus::EventBus;
pub use geofence::{Coordinate, CoordinateError, Geofence};
pub use ids::{AttendanceId, CircleId, EventId, UserId};
