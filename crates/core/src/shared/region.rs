use serde::Serialize;

/// Axis-aligned face rectangle in frame pixel coordinates.
///
/// Always non-empty and fully inside the frame it was built for:
/// backends go through [`FaceRegion::clamped`], which clips boxes to the
/// frame and discards those left with no area.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct FaceRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl FaceRegion {
    /// Clips an `(x1, y1, x2, y2)` box to a `frame_w` × `frame_h` frame.
    ///
    /// Returns `None` when the clipped box is empty or coordinates are not finite.
    pub fn clamped(x1: f64, y1: f64, x2: f64, y2: f64, frame_w: u32, frame_h: u32) -> Option<Self> {
        if ![x1, y1, x2, y2].iter().all(|v| v.is_finite()) {
            return None;
        }
        let left = x1.min(x2).max(0.0).min(frame_w as f64) as u32;
        let top = y1.min(y2).max(0.0).min(frame_h as f64) as u32;
        let right = x1.max(x2).max(0.0).min(frame_w as f64) as u32;
        let bottom = y1.max(y2).max(0.0).min(frame_h as f64) as u32;

        if right <= left || bottom <= top {
            return None;
        }
        Some(Self {
            x: left,
            y: top,
            width: right - left,
            height: bottom - top,
        })
    }

    /// Same as [`FaceRegion::clamped`] for an `(x, y, width, height)` box.
    pub fn clamped_xywh(x: f64, y: f64, width: f64, height: f64, frame_w: u32, frame_h: u32) -> Option<Self> {
        Self::clamped(x, y, x + width, y + height, frame_w, frame_h)
    }

    /// Whether the region lies entirely within a `frame_w` × `frame_h` frame.
    pub fn fits_within(&self, frame_w: u32, frame_h: u32) -> bool {
        self.width > 0
            && self.height > 0
            && self.x as u64 + self.width as u64 <= frame_w as u64
            && self.y as u64 + self.height as u64 <= frame_h as u64
    }
}
