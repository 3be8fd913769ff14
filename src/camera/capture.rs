//! nokhwa-backed [`CaptureSource`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use tokio::sync::oneshot;

use super::capture_loop::{run_capture_loop, LoopShared};
use super::device::list_devices;
use super::source::{CaptureSource, FrameFeed, Readiness};
use super::types::{CameraError, CameraSettings, CaptureState};

/// Camera capture handle.
///
/// The device is opened inside a background thread, which keeps the newest
/// frame in a shared [`FrameFeed`]. `acquire()` spawns that thread and returns
/// straight away; the returned [`Readiness`] resolves once frames arrive.
pub struct CameraCapture {
    feed: FrameFeed,
    capture_thread: Option<JoinHandle<()>>,
    /// Signal to stop the current capture thread
    stop_signal: Arc<AtomicBool>,
    state: Arc<Mutex<CaptureState>>,
    settings: CameraSettings,
}

impl std::fmt::Debug for CameraCapture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CameraCapture")
            .field("settings", &self.settings)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl CameraCapture {
    /// Create a handle for the configured device. Nothing is opened yet.
    pub fn new(settings: CameraSettings) -> Self {
        Self {
            feed: FrameFeed::new(),
            capture_thread: None,
            stop_signal: Arc::new(AtomicBool::new(false)),
            state: Arc::new(Mutex::new(CaptureState::Released)),
            settings,
        }
    }

    /// Get the current camera settings.
    pub fn settings(&self) -> &CameraSettings {
        &self.settings
    }
}

impl CaptureSource for CameraCapture {
    fn probe(&self) -> Result<(), CameraError> {
        let devices = list_devices()?;
        if devices.is_empty() {
            return Err(CameraError::NoDevices);
        }
        if !devices.iter().any(|d| d.index == self.settings.device_index) {
            return Err(CameraError::DeviceNotFound(self.settings.device_index));
        }
        Ok(())
    }

    fn acquire(&mut self) -> Result<Readiness, CameraError> {
        {
            let mut state = self
                .state
                .lock()
                .map_err(|_| CameraError::StreamFailed("capture state poisoned".to_string()))?;
            match *state {
                CaptureState::Acquiring => return Err(CameraError::AcquisitionPending),
                CaptureState::Ready => return Err(CameraError::AlreadyRunning),
                CaptureState::Released => *state = CaptureState::Acquiring,
            }
        }

        // Each run gets a fresh stop flag so a detached thread from an earlier
        // run keeps seeing its own stop request.
        self.stop_signal = Arc::new(AtomicBool::new(false));
        self.feed.clear();

        let (ready_tx, ready_rx) = oneshot::channel();
        let shared = LoopShared {
            feed: self.feed.clone(),
            stop: Arc::clone(&self.stop_signal),
            state: Arc::clone(&self.state),
        };
        let settings = self.settings.clone();

        log::info!("Acquiring camera {}", settings.device_index);
        let handle = std::thread::spawn(move || {
            run_capture_loop(settings, shared, ready_tx);
        });
        self.capture_thread = Some(handle);

        Ok(ready_rx)
    }

    fn release(&mut self) {
        let was = {
            let Ok(mut state) = self.state.lock() else {
                return;
            };
            self.stop_signal.store(true, Ordering::SeqCst);
            std::mem::replace(&mut *state, CaptureState::Released)
        };

        if let Some(handle) = self.capture_thread.take() {
            // A thread still negotiating may block inside the backend; let it
            // finish on its own instead of stalling the caller.
            if was == CaptureState::Ready || handle.is_finished() {
                let _ = handle.join();
            }
        }
        self.feed.clear();

        if was != CaptureState::Released {
            log::info!("Camera released");
        }
    }

    fn feed(&self) -> FrameFeed {
        self.feed.clone()
    }

    fn state(&self) -> CaptureState {
        self.state
            .lock()
            .map(|s| *s)
            .unwrap_or(CaptureState::Released)
    }
}

impl Drop for CameraCapture {
    fn drop(&mut self) {
        self.release();
    }
}
