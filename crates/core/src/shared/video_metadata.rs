use std::path::PathBuf;

use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct VideoMetadata {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    pub total_frames: usize,
    pub codec: String,
    pub source_path: Option<PathBuf>,
}

impl VideoMetadata {
    /// Duration in seconds, or 0 when the frame rate is unknown.
    pub fn duration_secs(&self) -> f64 {
        if self.fps > 0.0 {
            self.total_frames as f64 / self.fps
        } else {
            0.0
        }
    }

    /// Timestamp of a frame index, or 0 when the frame rate is unknown.
    pub fn timestamp_secs(&self, frame_index: usize) -> f64 {
        if self.fps > 0.0 {
            frame_index as f64 / self.fps
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn meta(fps: f64, total_frames: usize) -> VideoMetadata {
        VideoMetadata {
            width: 640,
            height: 480,
            fps,
            total_frames,
            codec: "h264".to_string(),
            source_path: None,
        }
    }

    #[test]
    fn test_duration() {
        assert_relative_eq!(meta(30.0, 900).duration_secs(), 30.0);
    }

    #[test]
    fn test_timestamp() {
        assert_relative_eq!(meta(25.0, 100).timestamp_secs(50), 2.0);
    }

    #[test]
    fn test_image_metadata_has_zero_times() {
        // Images are represented as single-frame video with fps=0
        let m = meta(0.0, 1);
        assert_relative_eq!(m.duration_secs(), 0.0);
        assert_relative_eq!(m.timestamp_secs(0), 0.0);
    }
}
