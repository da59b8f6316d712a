use std::path::Path;

use crate::detection::domain::backend::{
    Backend, BackendError, BackendKind, EmotionClassifier, LocatedFace,
};
use crate::emotion::domain::emotion::EmotionDistribution;
use crate::shared::frame::Frame;
use crate::shared::region::FaceRegion;

use super::onnx_emotion_classifier::OnnxEmotionClassifier;
use super::onnx_yolo_detector::OnnxYoloDetector;

/// Detection and emotion classification in one call: YOLO face detector
/// followed by the FER+ classifier on every located face.
///
/// The classifier is also exposed on its own so faces found by a
/// detection-only backend can still be classified.
pub struct UnifiedBackend {
    detector: OnnxYoloDetector,
    classifier: OnnxEmotionClassifier,
}

impl UnifiedBackend {
    pub fn new(
        detector_model: &Path,
        emotion_model: &Path,
        confidence: f64,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        Ok(Self {
            detector: OnnxYoloDetector::new(detector_model, confidence)?,
            classifier: OnnxEmotionClassifier::new(emotion_model)?,
        })
    }
}

impl Backend for UnifiedBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Unified
    }

    fn locate_faces(&mut self, frame: &Frame) -> Result<Vec<LocatedFace>, BackendError> {
        let regions = self
            .detector
            .detect(frame)
            .map_err(|e| BackendError::call(BackendKind::Unified, e))?;

        let mut faces = Vec::with_capacity(regions.len());
        for region in regions {
            // A face that fails classification is still a face
            let emotions = match self.classifier.classify(frame, &region) {
                Ok(dist) => Some(dist),
                Err(e) => {
                    log::warn!("Emotion classification failed for {region:?}: {e}");
                    None
                }
            };
            faces.push(LocatedFace { region, emotions });
        }
        Ok(faces)
    }

    fn classifier(&mut self) -> Option<&mut dyn EmotionClassifier> {
        Some(self)
    }
}

impl EmotionClassifier for UnifiedBackend {
    fn classify_emotions(
        &mut self,
        frame: &Frame,
        regions: &[FaceRegion],
    ) -> Result<Vec<EmotionDistribution>, BackendError> {
        regions
            .iter()
            .map(|region| {
                self.classifier
                    .classify(frame, region)
                    .map_err(|e| BackendError::call(BackendKind::Unified, e))
            })
            .collect()
    }
}
