//! Background capture thread implementation.

use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{
    CameraFormat, CameraIndex, FrameFormat as NokhwaFrameFormat, RequestedFormat,
    RequestedFormatType,
};
use nokhwa::Camera;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;
use tokio::sync::oneshot;

use super::frame_utils::{convert_to_rgb, mirror_horizontal};
use super::source::FrameFeed;
use super::types::{CameraError, CameraSettings, CaptureState, Resolution};

/// How many empty reads to tolerate before giving up on the first frame.
const FIRST_FRAME_ATTEMPTS: u32 = 200;

/// Everything the capture thread shares with its [`super::CameraCapture`] handle.
pub struct LoopShared {
    pub feed: FrameFeed,
    pub stop: Arc<AtomicBool>,
    pub state: Arc<Mutex<CaptureState>>,
}

/// Run the capture loop in a background thread.
///
/// Readiness is reported exactly once through `ready_tx`: either the negotiated
/// resolution once the first frame has been decoded, or the error that stopped
/// negotiation. If a release is requested while negotiating, the thread shuts the
/// stream down on its own and reports nothing.
pub fn run_capture_loop(
    settings: CameraSettings,
    shared: LoopShared,
    ready_tx: oneshot::Sender<Result<Resolution, CameraError>>,
) {
    let index = CameraIndex::Index(settings.device_index);

    let mut camera = match open_camera_with_fallback(&index, &settings) {
        Ok(cam) => cam,
        Err(e) => {
            fail(&shared, ready_tx, e);
            return;
        }
    };

    if let Err(e) = camera.open_stream() {
        fail(&shared, ready_tx, CameraError::StreamFailed(e.to_string()));
        return;
    }

    let res = camera.resolution();
    let actual_res = Resolution {
        width: res.width(),
        height: res.height(),
    };

    // Readiness means frames are flowing, so wait for the first decodable one.
    let mut attempts = 0;
    while !publish_next(&mut camera, &settings, &shared.feed) {
        attempts += 1;
        if shared.stop.load(Ordering::SeqCst) {
            let _ = camera.stop_stream();
            return;
        }
        if attempts >= FIRST_FRAME_ATTEMPTS {
            let _ = camera.stop_stream();
            fail(
                &shared,
                ready_tx,
                CameraError::StreamFailed("camera produced no frames".to_string()),
            );
            return;
        }
        thread::sleep(Duration::from_millis(5));
    }

    {
        let Ok(mut state) = shared.state.lock() else {
            let _ = camera.stop_stream();
            return;
        };
        if shared.stop.load(Ordering::SeqCst) {
            drop(state);
            let _ = camera.stop_stream();
            return;
        }
        *state = CaptureState::Ready;
    }
    log::info!("Camera streaming at {}", actual_res);
    let _ = ready_tx.send(Ok(actual_res));

    while !shared.stop.load(Ordering::Relaxed) {
        // Undecodable frames are skipped.
        publish_next(&mut camera, &settings, &shared.feed);
        thread::sleep(Duration::from_millis(1));
    }

    let _ = camera.stop_stream();
    log::debug!("Capture thread exited");
}

/// Read, decode and publish one frame. False when nothing usable came out.
fn publish_next(camera: &mut Camera, settings: &CameraSettings, feed: &FrameFeed) -> bool {
    let Some(mut frame) = camera.frame().ok().and_then(|raw| convert_to_rgb(&raw)) else {
        return false;
    };
    if settings.mirror {
        mirror_horizontal(&mut frame);
    }
    feed.publish(frame);
    true
}

/// Report a failed negotiation.
///
/// A thread whose run was already released must not touch the state cell: a
/// later acquisition may own it by now.
fn fail(
    shared: &LoopShared,
    ready_tx: oneshot::Sender<Result<Resolution, CameraError>>,
    error: CameraError,
) {
    {
        let Ok(mut state) = shared.state.lock() else {
            return;
        };
        if shared.stop.load(Ordering::SeqCst) {
            log::debug!("Released capture run failed late: {}", error);
            return;
        }
        *state = CaptureState::Released;
    }
    log::warn!("Camera acquisition failed: {}", error);
    let _ = ready_tx.send(Err(error));
}

/// Open the device, trying NV12 then MJPEG near the requested size, then
/// whatever the device likes best.
fn open_camera_with_fallback(
    index: &CameraIndex,
    settings: &CameraSettings,
) -> Result<Camera, CameraError> {
    let wanted =
        nokhwa::utils::Resolution::new(settings.resolution.width, settings.resolution.height);
    let closest = |format| {
        RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(CameraFormat::new(
            wanted,
            format,
            settings.fps,
        )))
    };
    let requests = [
        closest(NokhwaFrameFormat::NV12),
        closest(NokhwaFrameFormat::MJPEG),
        RequestedFormat::new::<RgbFormat>(RequestedFormatType::AbsoluteHighestResolution),
    ];

    let mut last_error = String::from("no usable camera format");
    for requested in requests {
        match Camera::new(index.clone(), requested) {
            Ok(cam) => return Ok(cam),
            Err(e) => {
                log::debug!("Camera format rejected: {}", e);
                last_error = e.to_string();
            }
        }
    }
    Err(classify_open_error(&last_error))
}

/// Map a backend error message to a [`CameraError`].
fn classify_open_error(msg: &str) -> CameraError {
    let lower = msg.to_lowercase();
    if lower.contains("permission")
        || lower.contains("denied")
        || lower.contains("authorization")
        || lower.contains("access")
    {
        CameraError::PermissionDenied
    } else {
        CameraError::OpenFailed(msg.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shared(state: CaptureState, stopped: bool) -> LoopShared {
        LoopShared {
            feed: FrameFeed::new(),
            stop: Arc::new(AtomicBool::new(stopped)),
            state: Arc::new(Mutex::new(state)),
        }
    }

    #[test]
    fn test_fail_releases_and_reports() {
        let shared = shared(CaptureState::Acquiring, false);
        let (tx, mut rx) = oneshot::channel();
        fail(&shared, tx, CameraError::NoDevices);

        assert_eq!(*shared.state.lock().unwrap(), CaptureState::Released);
        assert_eq!(rx.try_recv().unwrap(), Err(CameraError::NoDevices));
    }

    #[test]
    fn test_fail_after_release_leaves_newer_run_alone() {
        // An earlier run's thread failing late, while a newer acquisition
        // shares the state cell and is still negotiating.
        let stale = shared(CaptureState::Acquiring, true);
        let newer = LoopShared {
            feed: stale.feed.clone(),
            stop: Arc::new(AtomicBool::new(false)),
            state: Arc::clone(&stale.state),
        };
        let (tx, mut rx) = oneshot::channel();
        fail(&stale, tx, CameraError::OpenFailed("busy".to_string()));

        assert_eq!(*newer.state.lock().unwrap(), CaptureState::Acquiring);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_classify_permission_errors() {
        assert!(matches!(
            classify_open_error("Access denied by user"),
            CameraError::PermissionDenied
        ));
        assert!(matches!(
            classify_open_error("Not Authorization granted"),
            CameraError::PermissionDenied
        ));
    }

    #[test]
    fn test_classify_other_errors() {
        match classify_open_error("device busy") {
            CameraError::OpenFailed(msg) => assert_eq!(msg, "device busy"),
            other => panic!("Expected OpenFailed, got {:?}", other),
        }
    }
}
