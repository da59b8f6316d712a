use std::path::Path;

use thiserror::Error;

use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;

/// A frame that could not be decoded. The stream continues past it.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("frame {index}: {reason}")]
pub struct FrameReadError {
    pub index: usize,
    pub reason: String,
}

impl FrameReadError {
    pub fn new(index: usize, reason: impl std::fmt::Display) -> Self {
        Self {
            index,
            reason: reason.to_string(),
        }
    }
}

/// Reads frames from a video or image source.
///
/// Implementations handle I/O details (codec, container format, etc.)
/// while the pipeline works with the abstract `Frame` and `VideoMetadata`
/// types.
pub trait VideoReader: Send {
    /// Opens a video or image file and returns its metadata.
    fn open(&mut self, path: &Path) -> Result<VideoMetadata, Box<dyn std::error::Error>>;

    /// Returns an iterator over frames in decode order.
    ///
    /// A corrupt frame yields an error item carrying its index; iteration
    /// then moves on to the next frame.
    fn frames(&mut self) -> Box<dyn Iterator<Item = Result<Frame, FrameReadError>> + '_>;

    /// Releases any resources held by the reader.
    fn close(&mut self);
}
