//! Capture Source: owns the camera device and the live frame feed.
//!
//! - Device enumeration via [`list_devices`]
//! - The [`CaptureSource`] seam and its nokhwa implementation [`CameraCapture`]
//! - The latest-frame reader [`FrameFeed`]

mod capture;
mod capture_loop;
mod device;
mod frame_utils;
mod source;
mod types;

pub use capture::CameraCapture;
pub use device::list_devices;
pub use source::{CaptureSource, FrameFeed, Readiness};
pub use types::{CameraError, CameraInfo, CameraSettings, CaptureState, Frame, Resolution};
