use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::detection::domain::detection::Detection;
use crate::video::domain::video_reader::VideoReader;

use super::analysis_error::AnalysisError;
use super::analyzer::FrameAnalyzer;
use super::stream_aggregator::{summarize, Summary};

/// Result of analyzing one still image.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ImageAnalysis {
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
    pub detections: Vec<Detection>,
    pub summary: Summary,
}

/// Analyzes a single image file.
pub struct AnalyzeImageUseCase<'a> {
    analyzer: &'a dyn FrameAnalyzer,
    reader: Box<dyn VideoReader>,
}

impl<'a> AnalyzeImageUseCase<'a> {
    pub fn new(analyzer: &'a dyn FrameAnalyzer, reader: Box<dyn VideoReader>) -> Self {
        Self { analyzer, reader }
    }

    pub fn execute(&mut self, path: &Path) -> Result<ImageAnalysis, AnalysisError> {
        let metadata = self
            .reader
            .open(path)
            .map_err(|e| AnalysisError::Source(format!("{}: {e}", path.display())))?;
        let frame = self
            .reader
            .frames()
            .next()
            .ok_or_else(|| AnalysisError::Source(format!("{}: no image data", path.display())))?
            .map_err(|e| AnalysisError::Source(format!("{}: {e}", path.display())));
        self.reader.close();

        let detections = self.analyzer.analyze_frame(&frame?)?;
        log::info!(
            "{}: {} detection(s)",
            path.display(),
            detections.len()
        );
        let summary = summarize(&detections);
        Ok(ImageAnalysis {
            path: path.to_path_buf(),
            width: metadata.width,
            height: metadata.height,
            detections,
            summary,
        })
    }
}
