//! Buffer decoding and in-place frame transforms.

use nokhwa::pixel_format::RgbFormat;

use super::types::Frame;

/// Decode a nokhwa buffer (MJPEG, YUYV, NV12, ...) into an RGB [`Frame`].
///
/// `None` when the backend cannot decode it.
pub fn convert_to_rgb(buffer: &nokhwa::Buffer) -> Option<Frame> {
    let decoded = buffer.decode_image::<RgbFormat>().ok()?;
    let resolution = buffer.resolution();

    Some(Frame {
        width: resolution.width(),
        height: resolution.height(),
        data: decoded.into_raw(),
    })
}

/// Flip left-right for selfie view.
pub fn mirror_horizontal(frame: &mut Frame) {
    let stride = frame.width as usize * Frame::CHANNELS;
    if stride == 0 {
        return;
    }

    for row in frame.data.chunks_exact_mut(stride) {
        // Reversing the row also reverses channel order inside each pixel.
        row.reverse();
        for pixel in row.chunks_exact_mut(Frame::CHANNELS) {
            pixel.reverse();
        }
    }
}
