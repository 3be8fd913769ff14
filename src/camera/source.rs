//! The capture-source seam used by the session manager.

use std::sync::{Arc, Mutex};

use tokio::sync::oneshot;

use super::types::{CameraError, CaptureState, Frame, Resolution};

/// Resolves once device frames are arriving, carrying the negotiated resolution.
pub type Readiness = oneshot::Receiver<Result<Resolution, CameraError>>;

/// Cloneable reader over the newest captured frame.
///
/// The capture thread writes, the frame sampler reads. Only the latest frame
/// is kept; older ones are overwritten.
#[derive(Debug, Clone, Default)]
pub struct FrameFeed {
    slot: Arc<Mutex<Option<Frame>>>,
}

impl FrameFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the latest captured frame, if any.
    pub fn latest(&self) -> Option<Frame> {
        let slot = self.slot.lock().ok()?;
        slot.clone()
    }

    /// Replace the latest frame.
    pub fn publish(&self, frame: Frame) {
        if let Ok(mut slot) = self.slot.lock() {
            *slot = Some(frame);
        }
    }

    /// Drop whatever frame is stored.
    pub fn clear(&self) {
        if let Ok(mut slot) = self.slot.lock() {
            *slot = None;
        }
    }
}

/// A camera-like device that can be acquired and released.
pub trait CaptureSource: Send {
    /// Check that the device is present without holding it.
    fn probe(&self) -> Result<(), CameraError>;

    /// Begin device negotiation.
    ///
    /// Returns immediately; the returned [`Readiness`] resolves once real frames
    /// are arriving. Only one acquisition may be outstanding at a time.
    ///
    /// # Errors
    /// * `CameraError::AcquisitionPending` - a previous acquisition has not resolved
    /// * `CameraError::AlreadyRunning` - the device is already streaming
    fn acquire(&mut self) -> Result<Readiness, CameraError>;

    /// Release the device. Idempotent and safe in every state.
    fn release(&mut self);

    /// Reader for the newest frame.
    fn feed(&self) -> FrameFeed;

    fn state(&self) -> CaptureState;
}
