use crate::detection::domain::backend::Backend;
use crate::detection::domain::detection::Detection;
use crate::emotion::domain::category_mapper::ThreatCategoryMapper;
use crate::emotion::domain::emotion::EmotionDistribution;
use crate::shared::frame::Frame;
use crate::shared::region::FaceRegion;

use super::face_locator::CascadeHit;

/// Turns located faces into categorized, confidence-filtered detections.
///
/// Emotions already produced by the locating backend are reused. The rest
/// go through the first backend that exposes a classifier; with none
/// available (or on a classifier failure) the face is reported unclassified.
///
/// Classified detections survive only when their confidence is strictly
/// above `threshold`. Unclassified detections carry confidence 0 and are
/// never filtered out.
#[derive(Clone, Debug)]
pub struct EmotionStage {
    mapper: ThreatCategoryMapper,
    threshold: f64,
}

impl EmotionStage {
    pub fn new(mapper: ThreatCategoryMapper, threshold: f64) -> Self {
        Self { mapper, threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn run(
        &self,
        frame: &Frame,
        hit: CascadeHit,
        backends: &mut [Box<dyn Backend>],
    ) -> Vec<Detection> {
        let pending: Vec<FaceRegion> = hit
            .faces
            .iter()
            .filter(|f| f.emotions.is_none())
            .map(|f| f.region)
            .collect();
        let mut classified = classify(frame, &pending, backends).into_iter();

        hit.faces
            .into_iter()
            .map(|face| {
                let emotions = face.emotions.or_else(|| classified.next().flatten());
                match emotions {
                    Some(dist) => Detection::classified(face.region, dist, &self.mapper),
                    None => Detection::unclassified(face.region),
                }
            })
            .filter(|d| !d.is_classified() || d.confidence() > self.threshold)
            .collect()
    }
}

/// One entry per region: `None` when no classifier could score it.
fn classify(
    frame: &Frame,
    regions: &[FaceRegion],
    backends: &mut [Box<dyn Backend>],
) -> Vec<Option<EmotionDistribution>> {
    if regions.is_empty() {
        return Vec::new();
    }
    let Some(classifier) = backends.iter_mut().find_map(|b| b.classifier()) else {
        log::debug!(
            "No emotion classifier loaded; {} face(s) left unclassified",
            regions.len()
        );
        return vec![None; regions.len()];
    };

    match classifier.classify_emotions(frame, regions) {
        Ok(dists) if dists.len() == regions.len() => dists.into_iter().map(Some).collect(),
        Ok(dists) => {
            log::warn!(
                "Classifier returned {} distributions for {} faces",
                dists.len(),
                regions.len()
            );
            vec![None; regions.len()]
        }
        Err(e) => {
            log::warn!("Frame {}: {e}", frame.index());
            vec![None; regions.len()]
        }
    }
}
