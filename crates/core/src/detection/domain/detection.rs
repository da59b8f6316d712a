use serde::{Serialize, Serializer};

use crate::emotion::domain::category_mapper::ThreatCategoryMapper;
use crate::emotion::domain::emotion::{Emotion, EmotionDistribution};
use crate::emotion::domain::threat_category::ThreatCategory;
use crate::shared::region::FaceRegion;

/// Label reported for faces that could not be classified.
pub const UNKNOWN_LABEL: &str = "Unknown";

/// One face's categorized emotion result for one frame. Immutable.
///
/// Unclassified faces (no emotion backend available) carry no emotion,
/// category `Safe`, confidence 0 and an all-zero distribution.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Detection {
    region: FaceRegion,
    #[serde(serialize_with = "serialize_label")]
    emotion: Option<Emotion>,
    category: ThreatCategory,
    confidence: f64,
    distribution: EmotionDistribution,
}

impl Detection {
    /// Builds a detection from a distribution; the dominant label is its argmax.
    pub fn classified(
        region: FaceRegion,
        distribution: EmotionDistribution,
        mapper: &ThreatCategoryMapper,
    ) -> Self {
        let (emotion, confidence) = distribution.dominant();
        Self {
            region,
            emotion: Some(emotion),
            category: mapper.category(emotion),
            confidence,
            distribution,
        }
    }

    pub fn unclassified(region: FaceRegion) -> Self {
        Self {
            region,
            emotion: None,
            category: ThreatCategory::Safe,
            confidence: 0.0,
            distribution: EmotionDistribution::default(),
        }
    }

    pub fn region(&self) -> FaceRegion {
        self.region
    }

    /// Dominant emotion, or `None` for unclassified faces.
    pub fn emotion(&self) -> Option<Emotion> {
        self.emotion
    }

    /// Dominant emotion label, or [`UNKNOWN_LABEL`].
    pub fn label(&self) -> &'static str {
        self.emotion.map_or(UNKNOWN_LABEL, Emotion::as_str)
    }

    pub fn category(&self) -> ThreatCategory {
        self.category
    }

    /// Score of the dominant emotion, in [0, 1].
    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    pub fn distribution(&self) -> &EmotionDistribution {
        &self.distribution
    }

    pub fn is_classified(&self) -> bool {
        self.emotion.is_some()
    }
}

fn serialize_label<S: Serializer>(emotion: &Option<Emotion>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(emotion.map_or(UNKNOWN_LABEL, Emotion::as_str))
}
