use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::detection::domain::backend::{BackendError, BackendKind, BackendLoader};
use crate::detection::domain::detection::Detection;
use crate::detection::infrastructure::backend_loaders::standard_loaders;
use crate::emotion::domain::category_mapper::ThreatCategoryMapper;
use crate::shared::constants::DEFAULT_CONFIDENCE_THRESHOLD;
use crate::shared::frame::Frame;
use crate::shared::model_resolver::ModelResolver;
use crate::video::infrastructure::ffmpeg_reader::FfmpegReader;
use crate::video::infrastructure::image_file_reader::ImageFileReader;

use super::analysis_error::AnalysisError;
use super::analyze_image_use_case::{AnalyzeImageUseCase, ImageAnalysis};
use super::analyze_video_use_case::{AnalyzeVideoUseCase, ProgressFn, VideoAnalysis};
use super::backend_initializer::{AnalyzerState, BackendInitializer};
use super::emotion_stage::EmotionStage;
use super::face_locator::locate_faces;

/// Per-frame analysis entry point shared by the batch use cases.
pub trait FrameAnalyzer: Sync {
    fn analyze_frame(&self, frame: &Frame) -> Result<Vec<Detection>, AnalysisError>;
}

#[derive(Clone, Debug)]
pub struct AnalyzerConfig {
    /// Classified detections at or below this confidence are dropped.
    pub confidence_threshold: f64,
    pub category_mapping: ThreatCategoryMapper,
    /// Optional BlazeFace model; without it the fast backend is never loaded.
    pub fast_model_path: Option<PathBuf>,
    /// Directory searched for model files before downloading.
    pub bundled_models_dir: Option<PathBuf>,
    /// Face score threshold for the ONNX detectors; each uses its own default when unset.
    pub detector_confidence: Option<f64>,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            category_mapping: ThreatCategoryMapper::default(),
            fast_model_path: None,
            bundled_models_dir: None,
            detector_confidence: None,
        }
    }
}

/// Owns the backends and turns frames into categorized detections.
///
/// Backends load in the background after [`start_initialization`](Self::start_initialization);
/// analysis uses whatever has loaded so far. Calls are serialized: at most
/// one analysis runs at a time per analyzer.
pub struct Analyzer {
    initializer: BackendInitializer,
    stage: EmotionStage,
}

impl Analyzer {
    pub fn new(config: AnalyzerConfig) -> Result<Self, AnalysisError> {
        let resolver = match ModelResolver::new(config.bundled_models_dir.clone()) {
            Ok(resolver) => resolver,
            Err(e) => {
                let fallback = std::env::temp_dir().join("EmoSentry").join("models");
                log::warn!("{e}; caching models in {}", fallback.display());
                ModelResolver::with_cache_dir(fallback, config.bundled_models_dir.clone())
            }
        };
        let loaders = standard_loaders(config.fast_model_path, resolver, config.detector_confidence);
        Self::with_loaders(loaders, config.category_mapping, config.confidence_threshold)
    }

    /// Analyzer over custom loaders, tried in [`BackendKind`] priority order.
    pub fn with_loaders(
        loaders: Vec<Box<dyn BackendLoader>>,
        mapper: ThreatCategoryMapper,
        confidence_threshold: f64,
    ) -> Result<Self, AnalysisError> {
        if !(0.0..=1.0).contains(&confidence_threshold) {
            return Err(AnalysisError::InvalidArgument(format!(
                "confidence threshold must be within [0, 1], got {confidence_threshold}"
            )));
        }
        Ok(Self {
            initializer: BackendInitializer::new(loaders),
            stage: EmotionStage::new(mapper, confidence_threshold),
        })
    }

    /// Starts loading backends on a background thread. Returns immediately.
    pub fn start_initialization(&self) {
        self.initializer.start();
    }

    pub fn is_ready(&self) -> bool {
        self.initializer.is_ready()
    }

    pub fn state(&self) -> AnalyzerState {
        self.initializer.state()
    }

    pub fn wait_until_ready(&self, timeout: Duration) -> AnalyzerState {
        self.initializer.wait_until_ready(timeout)
    }

    /// Backends loaded so far, in priority order.
    pub fn available_backends(&self) -> Vec<BackendKind> {
        self.initializer.available()
    }

    /// Backends that failed to load, with the reason.
    pub fn unavailable_backends(&self) -> Vec<BackendError> {
        self.initializer.failures()
    }

    pub fn confidence_threshold(&self) -> f64 {
        self.stage.threshold()
    }

    pub fn analyze_image(&self, path: &Path) -> Result<ImageAnalysis, AnalysisError> {
        AnalyzeImageUseCase::new(self, Box::new(ImageFileReader::new())).execute(path)
    }

    /// Analyzes every `frame_interval`-th frame of a video file.
    pub fn analyze_video(
        &self,
        path: &Path,
        frame_interval: usize,
        on_progress: Option<ProgressFn>,
    ) -> Result<VideoAnalysis, AnalysisError> {
        AnalyzeVideoUseCase::new(self, Box::new(FfmpegReader::new()), frame_interval, on_progress)?
            .execute(path)
    }
}

impl FrameAnalyzer for Analyzer {
    fn analyze_frame(&self, frame: &Frame) -> Result<Vec<Detection>, AnalysisError> {
        frame.validate().map_err(AnalysisError::InvalidFrame)?;

        let mut backends = self.initializer.backends();
        let Some(hit) = locate_faces(&mut backends, frame) else {
            return Ok(Vec::new());
        };
        Ok(self.stage.run(frame, hit, &mut backends))
    }
}
