use ndarray::ArrayView3;

use crate::shared::region::FaceRegion;

/// Channels every analyzed frame must carry (8-bit RGB).
pub const RGB_CHANNELS: u8 = 3;

/// A single video/image frame: contiguous RGB bytes in row-major order.
///
/// Frames are owned by the caller and never mutated by the pipeline.
/// Format conversion happens at I/O boundaries only.
#[derive(Clone, Debug)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    channels: u8,
    index: usize,
}

impl Frame {
    pub fn new(data: Vec<u8>, width: u32, height: u32, channels: u8, index: usize) -> Self {
        Self {
            data,
            width,
            height,
            channels,
            index,
        }
    }

    /// Convenience constructor for an RGB frame.
    pub fn rgb(data: Vec<u8>, width: u32, height: u32, index: usize) -> Self {
        Self::new(data, width, height, RGB_CHANNELS, index)
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Checks that the frame is an analyzable RGB raster.
    ///
    /// Returns a human-readable reason when it is not.
    pub fn validate(&self) -> Result<(), String> {
        if self.width == 0 || self.height == 0 {
            return Err(format!(
                "frame has zero dimension ({}x{})",
                self.width, self.height
            ));
        }
        if self.channels != RGB_CHANNELS {
            return Err(format!(
                "expected {RGB_CHANNELS} channels, got {}",
                self.channels
            ));
        }
        let expected = (self.width as usize) * (self.height as usize) * RGB_CHANNELS as usize;
        if self.data.len() != expected {
            return Err(format!(
                "frame data has {} bytes, expected {expected}",
                self.data.len()
            ));
        }
        Ok(())
    }

    /// `[H, W, C]` view of the pixels. Only valid on frames that pass [`Frame::validate`].
    pub fn as_ndarray(&self) -> ArrayView3<'_, u8> {
        ArrayView3::from_shape(self.shape(), &self.data)
            .expect("Frame data length must match dimensions")
    }

    /// Row-major luma plane (ITU-R BT.601 weights), one byte per pixel.
    pub fn to_grayscale(&self) -> Vec<u8> {
        self.data
            .chunks_exact(self.channels as usize)
            .map(|px| luma(px[0], px[1], px[2]))
            .collect()
    }

    /// Luma plane of the pixels covered by `region`, row-major.
    ///
    /// The region must lie within the frame; use [`FaceRegion::clamped`].
    pub fn crop_grayscale(&self, region: &FaceRegion) -> Vec<u8> {
        let src = self.as_ndarray();
        let x2 = (region.x + region.width).min(self.width) as usize;
        let y2 = (region.y + region.height).min(self.height) as usize;
        let mut out = Vec::with_capacity(region.width as usize * region.height as usize);
        for row in region.y as usize..y2 {
            for col in region.x as usize..x2 {
                out.push(luma(src[[row, col, 0]], src[[row, col, 1]], src[[row, col, 2]]));
            }
        }
        out
    }

    fn shape(&self) -> (usize, usize, usize) {
        (
            self.height as usize,
            self.width as usize,
            self.channels as usize,
        )
    }
}

fn luma(r: u8, g: u8, b: u8) -> u8 {
    (0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_construction_and_accessors() {
        let data = vec![0u8; 12]; // 2x2x3
        let frame = Frame::new(data.clone(), 2, 2, 3, 5);
        assert_eq!(frame.width(), 2);
        assert_eq!(frame.height(), 2);
        assert_eq!(frame.channels(), 3);
        assert_eq!(frame.index(), 5);
        assert_eq!(frame.data(), &data[..]);
    }

    #[test]
    fn test_mismatched_data_length_is_reported_by_validate() {
        let frame = Frame::new(vec![0u8; 10], 2, 2, 3, 0);
        let reason = frame.validate().unwrap_err();
        assert!(reason.contains("10 bytes"));
    }

    #[test]
    fn test_validate_accepts_rgb_frame() {
        let frame = Frame::rgb(vec![0u8; 4 * 3 * 3], 4, 3, 0);
        assert!(frame.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_dimensions() {
        let frame = Frame::rgb(Vec::new(), 0, 10, 0);
        let reason = frame.validate().unwrap_err();
        assert!(reason.contains("zero dimension"));
    }

    #[test]
    fn test_validate_rejects_non_rgb() {
        let frame = Frame::new(vec![0u8; 4], 2, 2, 1, 0);
        assert!(frame.validate().is_err());
    }

    #[test]
    fn test_as_ndarray_shape() {
        let data = vec![0u8; 24]; // 2x4x3
        let frame = Frame::new(data, 4, 2, 3, 0);
        let arr = frame.as_ndarray();
        assert_eq!(arr.shape(), &[2, 4, 3]); // (height, width, channels)
    }

    #[test]
    fn test_grayscale_of_pure_colors() {
        // red, green, blue, white
        let data = vec![255, 0, 0, 0, 255, 0, 0, 0, 255, 255, 255, 255];
        let frame = Frame::rgb(data, 2, 2, 0);
        assert_eq!(frame.to_grayscale(), vec![76, 150, 29, 255]);
    }

    #[test]
    fn test_crop_grayscale_takes_region_pixels() {
        // 3x2 frame, bright pixel at (row=1, col=2)
        let mut data = vec![0u8; 3 * 2 * 3];
        let offset = (3 + 2) * 3;
        data[offset..offset + 3].copy_from_slice(&[255, 255, 255]);
        let frame = Frame::rgb(data, 3, 2, 0);
        let region = FaceRegion {
            x: 1,
            y: 1,
            width: 2,
            height: 1,
        };
        assert_eq!(frame.crop_grayscale(&region), vec![0, 255]);
    }
}
