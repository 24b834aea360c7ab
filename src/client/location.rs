//! Location fix acquisition with a bounded wait.

use std::fmt::Debug;
use std::time::Duration;

use async_trait::async_trait;

use crate::domain::Coordinate;

/// How long a scan waits for a fix unless the session is told otherwise.
pub const DEFAULT_FIX_TIMEOUT: Duration = Duration::from_secs(5);

/// Why a device could not produce a fix.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LocationError {
    /// The user has not granted location access.
    #[error("location permission denied")]
    PermissionDenied,

    /// The platform reported a failure.
    #[error("location unavailable: {0}")]
    Unavailable(String),
}

/// Device capability that yields the current position.
#[async_trait]
pub trait LocationProvider: Send + Sync + Debug {
    /// Requests a single fix.
    ///
    /// # Errors
    ///
    /// Returns [`LocationError`] when access is denied or the platform fails.
    async fn current_fix(&self) -> Result<Coordinate, LocationError>;
}

/// Requests one fix from `provider`, waiting at most `wait`.
///
/// Denied permission, provider failures and timeouts all yield `None`; the
/// attempt then proceeds without a coordinate.
pub async fn acquire_fix(provider: &dyn LocationProvider, wait: Duration) -> Option<Coordinate> {
    match tokio::time::timeout(wait, provider.current_fix()).await {
        Ok(Ok(fix)) => Some(fix),
        Ok(Err(err)) => {
            tracing::debug!(error = %err, "no location fix");
            None
        }
        Err(_) => {
            tracing::debug!(wait_ms = wait.as_millis(), "location fix timed out");
            None
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
pub(crate) mod tests {
    use super::*;
    use crate::domain::geofence::tests::coord;

    /// Provider answering with a fixed result after an optional delay.
    #[derive(Debug)]
    pub(crate) struct StubProvider {
        pub(crate) result: Result<Coordinate, LocationError>,
        pub(crate) delay: Duration,
    }

    #[async_trait]
    impl LocationProvider for StubProvider {
        async fn current_fix(&self) -> Result<Coordinate, LocationError> {
            tokio::time::sleep(self.delay).await;
            self.result.clone()
        }
    }

    #[tokio::test]
    async fn returns_fix_within_wait() {
        let provider = StubProvider {
            result: Ok(coord(51.5, -0.12)),
            delay: Duration::ZERO,
        };
        let fix = acquire_fix(&provider, Duration::from_millis(100)).await;
        assert_eq!(fix, Some(coord(51.5, -0.12)));
    }

    #[tokio::test]
    async fn denied_permission_yields_none() {
        let provider = StubProvider {
            result: Err(LocationError::PermissionDenied),
            delay: Duration::ZERO,
        };
        assert!(acquire_fix(&provider, Duration::from_millis(100)).await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn slow_provider_times_out() {
        let provider = StubProvider {
            result: Ok(coord(0.0, 0.0)),
            delay: DEFAULT_FIX_TIMEOUT + Duration::from_millis(1),
        };
        assert!(acquire_fix(&provider, DEFAULT_FIX_TIMEOUT).await.is_none());
    }
}
