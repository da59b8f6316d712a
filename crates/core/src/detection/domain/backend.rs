use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::emotion::domain::emotion::EmotionDistribution;
use crate::shared::frame::Frame;
use crate::shared::region::FaceRegion;

/// The three detection/classification providers, ordered by cascade priority.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum BackendKind {
    /// Detection only, lowest latency, needs an optional model artifact.
    Fast,
    /// Detection and emotion classification in one call.
    Unified,
    /// Detection only, classical descriptor, no learned dependency.
    Classical,
}

impl BackendKind {
    /// Fixed cascade priority, highest first.
    pub const PRIORITY: [BackendKind; 3] =
        [BackendKind::Fast, BackendKind::Unified, BackendKind::Classical];

    pub fn as_str(self) -> &'static str {
        match self {
            BackendKind::Fast => "fast-detector",
            BackendKind::Unified => "unified",
            BackendKind::Classical => "classical-fallback",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum BackendError {
    /// Construction/load failure. Disables the backend for the process lifetime.
    #[error("{backend} backend unavailable: {reason}")]
    Unavailable { backend: BackendKind, reason: String },
    /// Transient per-call failure. Treated as "no faces" by the cascade.
    #[error("{backend} backend call failed: {reason}")]
    Call { backend: BackendKind, reason: String },
}

impl BackendError {
    pub fn unavailable(backend: BackendKind, reason: impl fmt::Display) -> Self {
        Self::Unavailable {
            backend,
            reason: reason.to_string(),
        }
    }

    pub fn call(backend: BackendKind, reason: impl fmt::Display) -> Self {
        Self::Call {
            backend,
            reason: reason.to_string(),
        }
    }
}

/// A face found by a backend.
///
/// `emotions` is filled only by backends that classify while detecting,
/// so the emotion stage can reuse it instead of running inference again.
#[derive(Clone, Debug, PartialEq)]
pub struct LocatedFace {
    pub region: FaceRegion,
    pub emotions: Option<EmotionDistribution>,
}

impl LocatedFace {
    pub fn region_only(region: FaceRegion) -> Self {
        Self {
            region,
            emotions: None,
        }
    }
}

/// Emotion classification over pre-located face regions.
pub trait EmotionClassifier: Send {
    /// Returns one distribution per region, positionally aligned.
    fn classify_emotions(
        &mut self,
        frame: &Frame,
        regions: &[FaceRegion],
    ) -> Result<Vec<EmotionDistribution>, BackendError>;
}

/// A loaded face-detection provider.
///
/// Model runtimes are generally not safe for concurrent inference on one
/// loaded instance, hence `&mut self`.
pub trait Backend: Send {
    fn kind(&self) -> BackendKind;

    /// Finds faces in `frame`. Regions are clamped to the frame bounds.
    fn locate_faces(&mut self, frame: &Frame) -> Result<Vec<LocatedFace>, BackendError>;

    /// The classification entry point, for backends that have one.
    fn classifier(&mut self) -> Option<&mut dyn EmotionClassifier> {
        None
    }
}

/// Constructs one backend. Loading may block (model download, warm-up).
pub trait BackendLoader: Send {
    fn kind(&self) -> BackendKind;

    /// Fails with [`BackendError::Unavailable`] when the backend cannot be built.
    fn load(&self) -> Result<Box<dyn Backend>, BackendError>;
}
