//! Scan session: turns raw scans into check-in submissions.
//!
//! A session belongs to one signed-in attendee. It allows a single
//! submission in flight; scans arriving while one is pending are ignored
//! and counted rather than queued. Every completed submission is mapped to a
//! [`ClientOutcome`] carrying the message shown to the attendee.

use std::fmt::Debug;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;

use super::location::{LocationProvider, acquire_fix};
use super::scanner::ScanStream;
use crate::domain::{CheckInAttempt, CheckInCode, CheckInOutcome, EventLocation, UserId};
use crate::error::GatewayError;
use crate::service::CheckInService;

/// Something that can decide a check-in attempt.
#[async_trait]
pub trait CheckInSubmitter: Send + Sync + Debug {
    /// Submits one attempt and waits for its outcome.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError`] when the attempt could not be decided.
    async fn submit(&self, attempt: CheckInAttempt) -> Result<CheckInOutcome, GatewayError>;
}

#[async_trait]
impl CheckInSubmitter for CheckInService {
    async fn submit(&self, attempt: CheckInAttempt) -> Result<CheckInOutcome, GatewayError> {
        self.check_in(attempt).await
    }
}

/// What the attendee sees after a scan.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientOutcome {
    /// Attendance committed.
    CheckedIn {
        /// Title of the event.
        event_title: String,
        /// Points awarded.
        points_earned: u32,
    },
    /// The attendee was already checked in.
    AlreadyCheckedIn {
        /// Title of the event.
        event_title: String,
    },
    /// The code is unknown or no longer valid.
    InvalidCode,
    /// The event needs a location and none was available.
    LocationRequired {
        /// Where the event takes place.
        location: EventLocation,
    },
    /// The attendee is too far from the event.
    OutOfRange {
        /// Where the event takes place.
        location: EventLocation,
        /// How far away the attendee was.
        distance_m: f64,
    },
    /// The scanned text is not a check-in code.
    MalformedScan(String),
    /// The submission failed before a decision was made.
    Failed(String),
}

impl ClientOutcome {
    /// Whether the attendee should see a positive confirmation.
    #[must_use]
    pub const fn is_confirmation(&self) -> bool {
        matches!(self, Self::CheckedIn { .. } | Self::AlreadyCheckedIn { .. })
    }

    /// Message presented to the attendee.
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::CheckedIn {
                event_title,
                points_earned,
            } => format!("Checked in to {event_title}! You earned {points_earned} points."),
            Self::AlreadyCheckedIn { event_title } => {
                format!("You're already checked in to {event_title}.")
            }
            Self::InvalidCode => "This QR code is not valid for any event.".to_string(),
            Self::LocationRequired { location } => format!(
                "This event requires your location. Enable location access and scan again.\n\n\
                 Event location: {:.5}, {:.5} (within {} m)",
                location.center.latitude(),
                location.center.longitude(),
                location.radius_m
            ),
            Self::OutOfRange {
                location,
                distance_m,
            } => format!(
                "You're {distance_m:.0} m from the event. Move within {} m and scan again.",
                location.radius_m
            ),
            Self::MalformedScan(reason) => format!("Unrecognized QR code: {reason}"),
            Self::Failed(reason) => format!("Check-in failed: {reason}"),
        }
    }
}

impl From<CheckInOutcome> for ClientOutcome {
    fn from(outcome: CheckInOutcome) -> Self {
        match outcome {
            CheckInOutcome::Success {
                points_earned,
                event_title,
                ..
            } => Self::CheckedIn {
                event_title,
                points_earned,
            },
            CheckInOutcome::AlreadyCheckedIn { event_title }
            | CheckInOutcome::StorageConflict { event_title } => {
                Self::AlreadyCheckedIn { event_title }
            }
            CheckInOutcome::InvalidCode => Self::InvalidCode,
            CheckInOutcome::LocationRequired { location } => Self::LocationRequired { location },
            CheckInOutcome::OutOfRange {
                location,
                distance_m,
            } => Self::OutOfRange {
                location,
                distance_m,
            },
        }
    }
}

/// Clears the in-flight flag when a submission ends, however it ends.
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Per-attendee scan session.
#[derive(Debug)]
pub struct ScanSession {
    submitter: Arc<dyn CheckInSubmitter>,
    location: Arc<dyn LocationProvider>,
    user_id: UserId,
    fix_timeout: Duration,
    in_flight: AtomicBool,
    ignored: AtomicU64,
}

impl ScanSession {
    /// Creates a session for `user_id`.
    #[must_use]
    pub fn new(
        submitter: Arc<dyn CheckInSubmitter>,
        location: Arc<dyn LocationProvider>,
        user_id: UserId,
        fix_timeout: Duration,
    ) -> Self {
        Self {
            submitter,
            location,
            user_id,
            fix_timeout,
            in_flight: AtomicBool::new(false),
            ignored: AtomicU64::new(0),
        }
    }

    /// Whether a submission is currently pending.
    #[must_use]
    pub fn is_submitting(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Number of scans dropped because a submission was pending.
    #[must_use]
    pub fn ignored_scans(&self) -> u64 {
        self.ignored.load(Ordering::Relaxed)
    }

    /// Handles one raw scan.
    ///
    /// Returns `None` when the scan was ignored because another submission
    /// is pending.
    pub async fn handle_scan(&self, raw: &str) -> Option<ClientOutcome> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            let ignored = self.ignored.fetch_add(1, Ordering::Relaxed) + 1;
            tracing::debug!(user_id = %self.user_id, ignored, "scan ignored, submission pending");
            return None;
        }
        let _guard = InFlight(&self.in_flight);

        let code = match CheckInCode::extract(raw) {
            Ok(code) => code,
            Err(err) => {
                tracing::debug!(user_id = %self.user_id, error = %err, "malformed scan");
                return Some(ClientOutcome::MalformedScan(err.to_string()));
            }
        };

        let coordinate = acquire_fix(self.location.as_ref(), self.fix_timeout).await;
        let attempt = CheckInAttempt {
            code,
            user_id: self.user_id,
            coordinate,
        };

        let outcome = match self.submitter.submit(attempt).await {
            Ok(outcome) => ClientOutcome::from(outcome),
            Err(err) => {
                tracing::warn!(user_id = %self.user_id, error = %err, "check-in submission failed");
                ClientOutcome::Failed(err.to_string())
            }
        };
        Some(outcome)
    }

    /// Consumes `scans` until the stream ends, reporting each outcome.
    ///
    /// Scans keep being pulled while a submission is pending so that they
    /// are ignored instead of piling up.
    pub async fn run<F>(&self, scans: ScanStream, on_outcome: F)
    where
        F: Fn(ClientOutcome),
    {
        let on_outcome = &on_outcome;
        scans
            .for_each_concurrent(None, move |raw| async move {
                if let Some(outcome) = self.handle_scan(&raw).await {
                    on_outcome(outcome);
                }
            })
            .await;
    }
}
