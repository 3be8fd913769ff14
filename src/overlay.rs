//! Skeletal overlay: the latest landmarks painted onto a transparent RGBA
//! surface the size of the video.
//!
//! Stateless between snapshots. Each `render` starts from a cleared surface,
//! so a joint that disappears from one snapshot disappears from the drawing.

use std::path::Path;

use image::{ImageFormat, Rgba, RgbaImage};

use crate::camera::Resolution;
use crate::transport::Landmark;

/// Bone list over the fixed joint schema (shoulders, arms, torso, legs, feet).
pub const CONNECTIONS: [(usize, usize); 16] = [
    (11, 12),
    (11, 13),
    (13, 15),
    (12, 14),
    (14, 16),
    (11, 23),
    (12, 24),
    (23, 24),
    (23, 25),
    (25, 27),
    (27, 29),
    (27, 31),
    (24, 26),
    (26, 28),
    (28, 30),
    (28, 32),
];

/// Shoulders, elbows, hips, knees, ankles.
pub const KEY_JOINTS: [usize; 10] = [11, 12, 13, 14, 23, 24, 25, 26, 27, 28];

pub const KNEES: [usize; 2] = [25, 26];

/// A landmark is drawn only above this confidence.
pub const VISIBILITY_THRESHOLD: f32 = 0.5;

const LINE_WIDTH: i32 = 3;
const JOINT_RADIUS: i32 = 6;
const KNEE_RADIUS: i32 = 8;

/// Joints are pinned to this far outside the surface, which keeps line
/// stepping bounded for wild coordinates.
const OFFSCREEN_MARGIN: f32 = 16.0;

const GREEN: Rgba<u8> = Rgba([0, 255, 0, 255]);
const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);
const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);

#[derive(Debug, Clone)]
pub struct OverlayRenderer {
    surface: RgbaImage,
}

impl Default for OverlayRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl OverlayRenderer {
    pub fn new() -> Self {
        Self {
            surface: RgbaImage::new(Resolution::VGA.width, Resolution::VGA.height),
        }
    }

    pub fn size(&self) -> Resolution {
        Resolution {
            width: self.surface.width(),
            height: self.surface.height(),
        }
    }

    pub fn surface(&self) -> &RgbaImage {
        &self.surface
    }

    /// True when nothing is drawn.
    pub fn is_blank(&self) -> bool {
        self.surface.pixels().all(|p| p[3] == 0)
    }

    /// Redraw the surface from `landmarks`.
    ///
    /// The surface follows `video`'s resolution, falling back to 640x480 when
    /// the video size is not known yet. An empty list leaves it cleared.
    pub fn render(&mut self, landmarks: &[Option<Landmark>], video: Resolution) {
        let target = if video.is_empty() {
            Resolution::VGA
        } else {
            video
        };
        if self.size() != target {
            log::debug!("Overlay resized {} -> {}", self.size(), target);
            self.surface = RgbaImage::new(target.width, target.height);
        } else {
            self.clear();
        }

        if landmarks.is_empty() {
            return;
        }

        for (start, end) in CONNECTIONS {
            if let (Some(a), Some(b)) = (self.visible(landmarks, start), self.visible(landmarks, end))
            {
                draw_line(&mut self.surface, a, b, LINE_WIDTH / 2, GREEN);
            }
        }
        for idx in KEY_JOINTS {
            if let Some(p) = self.visible(landmarks, idx) {
                fill_disc(&mut self.surface, p, JOINT_RADIUS, GREEN);
            }
        }
        for idx in KNEES {
            if let Some(p) = self.visible(landmarks, idx) {
                fill_disc(&mut self.surface, p, KNEE_RADIUS, RED);
            }
        }
    }

    pub fn clear(&mut self) {
        self.surface.pixels_mut().for_each(|p| *p = TRANSPARENT);
    }

    /// Write the current surface as a PNG.
    pub fn save_png(&self, path: &Path) -> Result<(), image::ImageError> {
        self.surface.save_with_format(path, ImageFormat::Png)
    }

    /// Pixel position of a joint, if present and confident enough.
    fn visible(&self, landmarks: &[Option<Landmark>], idx: usize) -> Option<(i32, i32)> {
        let lm = landmarks.get(idx).copied().flatten()?;
        if lm.visibility <= VISIBILITY_THRESHOLD {
            return None;
        }
        Some((
            to_pixel(lm.x, self.surface.width()),
            to_pixel(lm.y, self.surface.height()),
        ))
    }
}

/// Normalized coordinate to pixel, pinned near the surface. NaN lands on 0.
fn to_pixel(normalized: f32, extent: u32) -> i32 {
    let extent = extent as f32;
    (normalized * extent)
        .round()
        .clamp(-OFFSCREEN_MARGIN, extent + OFFSCREEN_MARGIN) as i32
}

fn fill_disc(image: &mut RgbaImage, (cx, cy): (i32, i32), radius: i32, color: Rgba<u8>) {
    let width = image.width() as i32;
    let height = image.height() as i32;
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            if dx * dx + dy * dy > radius * radius {
                continue;
            }
            let (x, y) = (cx + dx, cy + dy);
            if x >= 0 && x < width && y >= 0 && y < height {
                image.put_pixel(x as u32, y as u32, color);
            }
        }
    }
}

/// Thick line: stamp a disc at every step along the longer axis.
fn draw_line(
    image: &mut RgbaImage,
    (x0, y0): (i32, i32),
    (x1, y1): (i32, i32),
    half_width: i32,
    color: Rgba<u8>,
) {
    let steps = (x1 - x0).abs().max((y1 - y0).abs()).max(1);
    for i in 0..=steps {
        let x = x0 + (x1 - x0) * i / steps;
        let y = y0 + (y1 - y0) * i / steps;
        fill_disc(image, (x, y), half_width, color);
    }
}
