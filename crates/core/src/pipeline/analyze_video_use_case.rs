use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use serde::Serialize;

use crate::detection::domain::detection::Detection;
use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::video_reader::{FrameReadError, VideoReader};

use super::analysis_error::AnalysisError;
use super::analyzer::FrameAnalyzer;
use super::stream_aggregator::{StreamAggregator, Summary};

const DEFAULT_CHANNEL_CAPACITY: usize = 4;

/// Progress callback: `(sampled_frames_done, sampled_frames_expected)`.
/// Return `false` to stop early. `expected` is 0 when the frame count is unknown.
pub type ProgressFn = Box<dyn Fn(usize, usize) -> bool + Send>;

/// What happened to one sampled frame.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FrameOutcome {
    Analyzed { detections: Vec<Detection> },
    Skipped { reason: String },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FrameAnalysis {
    pub frame_index: usize,
    pub time_secs: f64,
    #[serde(flatten)]
    pub outcome: FrameOutcome,
}

impl FrameAnalysis {
    pub fn detections(&self) -> &[Detection] {
        match &self.outcome {
            FrameOutcome::Analyzed { detections } => detections,
            FrameOutcome::Skipped { .. } => &[],
        }
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self.outcome, FrameOutcome::Skipped { .. })
    }
}

/// Result of analyzing a video file.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct VideoAnalysis {
    pub metadata: VideoMetadata,
    pub duration_secs: f64,
    pub frame_interval: usize,
    pub analyzed_frames: usize,
    pub skipped_frames: usize,
    /// False when the progress callback stopped the run early.
    pub completed: bool,
    pub frames: Vec<FrameAnalysis>,
    pub summary: Summary,
}

/// Samples every `frame_interval`-th frame of a video and analyzes it.
///
/// Layout: `reader thread [decode + sample] → caller thread [analyze + fold]`.
/// Decoding overlaps analysis; analysis itself stays on the calling thread.
/// Frames that fail to decode or analyze are recorded as skipped.
pub struct AnalyzeVideoUseCase<'a> {
    analyzer: &'a dyn FrameAnalyzer,
    reader: Option<Box<dyn VideoReader>>,
    frame_interval: usize,
    on_progress: Option<ProgressFn>,
    channel_capacity: usize,
}

impl<'a> AnalyzeVideoUseCase<'a> {
    pub fn new(
        analyzer: &'a dyn FrameAnalyzer,
        reader: Box<dyn VideoReader>,
        frame_interval: usize,
        on_progress: Option<ProgressFn>,
    ) -> Result<Self, AnalysisError> {
        if frame_interval == 0 {
            return Err(AnalysisError::InvalidArgument(
                "frame interval must be at least 1".into(),
            ));
        }
        Ok(Self {
            analyzer,
            reader: Some(reader),
            frame_interval,
            on_progress,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        })
    }

    pub fn execute(&mut self, path: &Path) -> Result<VideoAnalysis, AnalysisError> {
        let mut reader = self
            .reader
            .take()
            .ok_or_else(|| AnalysisError::InvalidArgument("use case already executed".into()))?;
        let metadata = reader
            .open(path)
            .map_err(|e| AnalysisError::Source(format!("{}: {e}", path.display())))?;

        let interval = self.frame_interval;
        let expected = metadata.total_frames.div_ceil(interval);
        log::info!(
            "Analyzing {} (every {interval} frame(s), ~{expected} samples)",
            path.display()
        );

        let (tx, rx) = crossbeam_channel::bounded(self.channel_capacity);
        let cancelled = Arc::new(AtomicBool::new(false));
        let reader_handle = spawn_sampler(reader, interval, tx, cancelled.clone());

        let mut aggregator = StreamAggregator::new();
        let mut frames = Vec::new();
        let mut analyzed = 0;
        let mut skipped = 0;
        let mut completed = true;

        for item in &rx {
            let (frame_index, outcome) = match item {
                Ok(frame) => (frame.index(), self.analyze(&frame)),
                Err(e) => (e.index, Err(e.to_string())),
            };
            let outcome = match outcome {
                Ok(detections) => {
                    aggregator.extend(&detections);
                    analyzed += 1;
                    FrameOutcome::Analyzed { detections }
                }
                Err(reason) => {
                    log::warn!("Skipping frame {frame_index}: {reason}");
                    skipped += 1;
                    FrameOutcome::Skipped { reason }
                }
            };
            frames.push(FrameAnalysis {
                frame_index,
                time_secs: metadata.timestamp_secs(frame_index),
                outcome,
            });

            if let Some(cb) = &self.on_progress {
                if !cb(frames.len(), expected) {
                    log::info!("Video analysis stopped after {} samples", frames.len());
                    completed = false;
                    cancelled.store(true, Ordering::Relaxed);
                    break;
                }
            }
        }

        drop(rx);
        if reader_handle.join().is_err() {
            log::error!("Video reader thread panicked");
        }

        Ok(VideoAnalysis {
            duration_secs: metadata.duration_secs(),
            metadata,
            frame_interval: interval,
            analyzed_frames: analyzed,
            skipped_frames: skipped,
            completed,
            frames,
            summary: aggregator.finish(),
        })
    }

    fn analyze(&self, frame: &Frame) -> Result<Vec<Detection>, String> {
        self.analyzer.analyze_frame(frame).map_err(|e| e.to_string())
    }
}

/// Decodes on a dedicated thread and forwards only sampled frames.
fn spawn_sampler(
    mut reader: Box<dyn VideoReader>,
    interval: usize,
    tx: crossbeam_channel::Sender<Result<Frame, FrameReadError>>,
    cancelled: Arc<AtomicBool>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        for item in reader.frames() {
            if cancelled.load(Ordering::Relaxed) {
                break;
            }
            let index = match &item {
                Ok(frame) => frame.index(),
                Err(e) => e.index,
            };
            if index % interval != 0 {
                continue;
            }
            if tx.send(item).is_err() {
                break;
            }
        }
        reader.close();
    })
}
