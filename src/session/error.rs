use std::fmt;

use crate::api::ApiError;
use crate::camera::CameraError;
use crate::identity::IdentityError;

use super::state::{LifecycleError, SessionState};

/// Why `start_training` (or a capture retry) did not go through.
#[derive(Debug, thiserror::Error)]
pub enum SetupError {
    #[error("a session is already {0}")]
    NotIdle(SessionState),

    #[error("no active session (currently {0})")]
    NotActive(SessionState),

    #[error("connection to the analysis service was lost; stop and start again")]
    LinkDown,

    #[error("camera unavailable: {0}")]
    Device(#[from] CameraError),

    #[error("could not set up the session: {0}")]
    Api(#[from] ApiError),

    #[error(transparent)]
    Identity(#[from] IdentityError),

    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    #[error("start cancelled by a stop request")]
    Cancelled,
}

/// The remote call a teardown failure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeardownStep {
    EndSeries,
    EndSession,
}

impl fmt::Display for TeardownStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TeardownStep::EndSeries => f.write_str("ending the series"),
            TeardownStep::EndSession => f.write_str("ending the session"),
        }
    }
}

/// A best-effort remote termination that failed. Local cleanup still ran.
#[derive(Debug, thiserror::Error)]
#[error("{step} failed: {source}")]
pub struct TeardownError {
    pub step: TeardownStep,
    #[source]
    pub source: ApiError,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_teardown_error_display() {
        let err = TeardownError {
            step: TeardownStep::EndSession,
            source: ApiError::Status {
                status: 502,
                body: "bad gateway".to_string(),
            },
        };
        assert_eq!(
            err.to_string(),
            "ending the session failed: Error 502: bad gateway"
        );
    }

    #[test]
    fn test_setup_error_from_camera() {
        let err: SetupError = CameraError::PermissionDenied.into();
        assert!(matches!(err, SetupError::Device(CameraError::PermissionDenied)));
        assert!(err.to_string().starts_with("camera unavailable"));
    }
}
