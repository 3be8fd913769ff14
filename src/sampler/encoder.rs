//! Offscreen raster + JPEG data-URI encoding for outgoing frames.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::codecs::jpeg::JpegEncoder;
use image::RgbImage;

use crate::camera::{Frame, Resolution};

/// JPEG quality used for streamed frames; tuned for size over fidelity.
pub const DEFAULT_JPEG_QUALITY: u8 = 70;

const DATA_URI_PREFIX: &str = "data:image/jpeg;base64,";

/// Errors while turning a frame into a payload.
#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    #[error("frame holds {actual} bytes, expected {expected} for {width}x{height} RGB")]
    MalformedFrame {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },

    #[error("JPEG encode failed: {0}")]
    Image(#[from] image::ImageError),
}

/// Reusable encoder: one raster and one byte buffer for the whole run.
pub struct FrameEncoder {
    raster: RgbImage,
    jpeg: Vec<u8>,
    quality: u8,
}

impl FrameEncoder {
    pub fn new(target: Resolution, quality: u8) -> Self {
        Self {
            raster: RgbImage::new(target.width.max(1), target.height.max(1)),
            jpeg: Vec::new(),
            quality: quality.clamp(1, 100),
        }
    }

    pub fn target(&self) -> Resolution {
        Resolution {
            width: self.raster.width(),
            height: self.raster.height(),
        }
    }

    /// Draw `frame` into the raster and return it as a JPEG data URI.
    pub fn encode(&mut self, frame: &Frame) -> Result<String, EncodeError> {
        draw_scaled(frame, &mut self.raster)?;

        self.jpeg.clear();
        JpegEncoder::new_with_quality(&mut self.jpeg, self.quality).encode_image(&self.raster)?;

        let mut uri = String::with_capacity(DATA_URI_PREFIX.len() + self.jpeg.len() * 4 / 3 + 4);
        uri.push_str(DATA_URI_PREFIX);
        STANDARD.encode_string(&self.jpeg, &mut uri);
        Ok(uri)
    }
}

/// Nearest-neighbour scale of an RGB frame onto the raster.
fn draw_scaled(frame: &Frame, raster: &mut RgbImage) -> Result<(), EncodeError> {
    let expected = frame.expected_len();
    if frame.width == 0 || frame.height == 0 || frame.data.len() < expected {
        return Err(EncodeError::MalformedFrame {
            width: frame.width,
            height: frame.height,
            expected,
            actual: frame.data.len(),
        });
    }

    let (dst_w, dst_h) = raster.dimensions();
    let src_w = frame.width as usize;
    for y in 0..dst_h {
        let sy = (y as u64 * frame.height as u64 / dst_h as u64) as usize;
        for x in 0..dst_w {
            let sx = (x as u64 * frame.width as u64 / dst_w as u64) as usize;
            let i = (sy * src_w + sx) * Frame::CHANNELS;
            raster.put_pixel(
                x,
                y,
                image::Rgb([frame.data[i], frame.data[i + 1], frame.data[i + 2]]),
            );
        }
    }
    Ok(())
}
