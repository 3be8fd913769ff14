//! Device, frame and error types shared by the capture side.

use std::fmt;

/// A camera the backend can see.
#[derive(Debug, Clone)]
pub struct CameraInfo {
    pub index: u32,
    pub name: String,
    pub description: String,
}

impl fmt::Display for CameraInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {} ({})", self.index, self.name, self.description)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    /// The capture size the analysis service is tuned for.
    pub const VGA: Resolution = Resolution {
        width: 640,
        height: 480,
    };

    pub const HD: Resolution = Resolution {
        width: 1280,
        height: 720,
    };

    /// True when either side is zero, i.e. nothing negotiated yet.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl Default for Resolution {
    fn default() -> Self {
        Self::VGA
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// One decoded camera image, packed RGB8, row-major.
#[derive(Debug, Clone)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl Frame {
    pub const CHANNELS: usize = 3;

    pub fn solid(width: u32, height: u32, rgb: [u8; 3]) -> Self {
        let pixels = width as usize * height as usize;
        Self {
            width,
            height,
            data: rgb.repeat(pixels),
        }
    }

    /// Byte length a well-formed frame of this size has.
    pub fn expected_len(&self) -> usize {
        self.width as usize * self.height as usize * Self::CHANNELS
    }

    pub fn resolution(&self) -> Resolution {
        Resolution {
            width: self.width,
            height: self.height,
        }
    }
}

/// What to open and how.
#[derive(Debug, Clone)]
pub struct CameraSettings {
    pub device_index: u32,
    /// Requested size; the device may negotiate something else.
    pub resolution: Resolution,
    pub fps: u32,
    /// Flip left-right before publishing (selfie view).
    pub mirror: bool,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            device_index: 0,
            resolution: Resolution::VGA,
            fps: 30,
            mirror: false,
        }
    }
}

/// Where a capture source is in its acquire/release cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    /// No device held.
    Released,
    /// Negotiating; no frame yet.
    Acquiring,
    /// Frames are arriving.
    Ready,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CameraError {
    #[error("No cameras found")]
    NoDevices,

    #[error("Failed to query cameras: {0}")]
    QueryFailed(String),

    #[error("Failed to open camera: {0}")]
    OpenFailed(String),

    #[error("Camera permission denied. Grant camera access to your terminal and retry")]
    PermissionDenied,

    #[error("Camera device {0} not found. Run 'list-cameras' to see available devices")]
    DeviceNotFound(u32),

    #[error("Camera stream failed: {0}")]
    StreamFailed(String),

    #[error("Camera is already streaming")]
    AlreadyRunning,

    #[error("Camera acquisition is already in progress")]
    AcquisitionPending,
}
