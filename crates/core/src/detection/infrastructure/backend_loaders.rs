//! Loaders for the three concrete backends.
//!
//! Each loader turns every construction problem (missing artifact, failed
//! download, unreadable model) into [`BackendError::Unavailable`].

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::detection::domain::backend::{Backend, BackendError, BackendKind, BackendLoader};
use crate::shared::constants::{EMOTION_MODEL, YOLO_FACE_MODEL};
use crate::shared::model_resolver::{ModelResolver, ModelSource, ProgressFn};

use super::onnx_blazeface_detector::OnnxBlazefaceDetector;
use super::rustface_detector::RustfaceDetector;
use super::unified_backend::UnifiedBackend;

/// Fast BlazeFace detector. Unavailable unless the user supplies its model.
pub struct BlazefaceLoader {
    pub model_path: Option<PathBuf>,
    pub confidence: f64,
}

impl BackendLoader for BlazefaceLoader {
    fn kind(&self) -> BackendKind {
        BackendKind::Fast
    }

    fn load(&self) -> Result<Box<dyn Backend>, BackendError> {
        let path = self
            .model_path
            .as_deref()
            .ok_or_else(|| BackendError::unavailable(self.kind(), "no model artifact configured"))?;
        if !path.exists() {
            return Err(BackendError::unavailable(
                self.kind(),
                format!("model artifact not found: {}", path.display()),
            ));
        }
        let detector = OnnxBlazefaceDetector::new(path, self.confidence)
            .map_err(|e| BackendError::unavailable(self.kind(), e))?;
        Ok(Box::new(detector))
    }
}

/// YOLO face + FER+ emotion backend. Downloads both models on first use.
pub struct UnifiedLoader {
    pub resolver: ModelResolver,
    pub confidence: f64,
}

impl BackendLoader for UnifiedLoader {
    fn kind(&self) -> BackendKind {
        BackendKind::Unified
    }

    fn load(&self) -> Result<Box<dyn Backend>, BackendError> {
        let detector_path = self
            .resolver
            .resolve(&YOLO_FACE_MODEL, Some(download_logger(&YOLO_FACE_MODEL)))
            .map_err(|e| BackendError::unavailable(self.kind(), e))?;
        let emotion_path = self
            .resolver
            .resolve(&EMOTION_MODEL, Some(download_logger(&EMOTION_MODEL)))
            .map_err(|e| BackendError::unavailable(self.kind(), e))?;
        let backend = UnifiedBackend::new(&detector_path, &emotion_path, self.confidence)
            .map_err(|e| BackendError::unavailable(self.kind(), e))?;
        Ok(Box::new(backend))
    }
}

/// Classical SeetaFace detector. Its model is compiled in.
pub struct RustfaceLoader;

impl BackendLoader for RustfaceLoader {
    fn kind(&self) -> BackendKind {
        BackendKind::Classical
    }

    fn load(&self) -> Result<Box<dyn Backend>, BackendError> {
        let detector =
            RustfaceDetector::new().map_err(|e| BackendError::unavailable(self.kind(), e))?;
        Ok(Box::new(detector))
    }
}

/// Bytes per progress step when the server sends no Content-Length.
const UNSIZED_PROGRESS_STEP: u64 = 5 * 1024 * 1024;

/// Logs download progress of `source` once per 10% (or per 5 MiB when the size is unknown).
fn download_logger(source: &ModelSource) -> ProgressFn {
    let name = source.name;
    let last_step = AtomicU64::new(0);
    Box::new(move |downloaded, total| {
        let step = progress_step(downloaded, total);
        if step > last_step.swap(step, Ordering::Relaxed) {
            if total > 0 {
                log::info!("Downloading {name}: {}%", step * 10);
            } else {
                log::info!("Downloading {name}: {} MiB", downloaded / (1024 * 1024));
            }
        }
    })
}

fn progress_step(downloaded: u64, total: u64) -> u64 {
    if total > 0 {
        downloaded.min(total) * 10 / total
    } else {
        downloaded / UNSIZED_PROGRESS_STEP
    }
}

/// The standard loaders, in cascade priority order.
pub fn standard_loaders(
    fast_model_path: Option<PathBuf>,
    resolver: ModelResolver,
    detector_confidence: Option<f64>,
) -> Vec<Box<dyn BackendLoader>> {
    use super::{onnx_blazeface_detector, onnx_yolo_detector};

    vec![
        Box::new(BlazefaceLoader {
            model_path: fast_model_path,
            confidence: detector_confidence.unwrap_or(onnx_blazeface_detector::DEFAULT_CONFIDENCE),
        }),
        Box::new(UnifiedLoader {
            resolver,
            confidence: detector_confidence.unwrap_or(onnx_yolo_detector::DEFAULT_CONFIDENCE),
        }),
        Box::new(RustfaceLoader),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fast_loader_without_artifact_is_unavailable() {
        let loader = BlazefaceLoader {
            model_path: None,
            confidence: 0.5,
        };
        match loader.load() {
            Err(BackendError::Unavailable { backend, .. }) => assert_eq!(backend, BackendKind::Fast),
            _ => panic!("expected Unavailable"),
        }
    }

    #[test]
    fn test_fast_loader_with_missing_file_is_unavailable() {
        let loader = BlazefaceLoader {
            model_path: Some(PathBuf::from("/nonexistent/blazeface.onnx")),
            confidence: 0.5,
        };
        let err = loader.load().err().unwrap();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn test_classical_loader_needs_no_network_or_files() {
        let backend = RustfaceLoader.load().unwrap();
        assert_eq!(backend.kind(), BackendKind::Classical);
    }

    #[test]
    fn test_progress_step_with_known_size() {
        assert_eq!(progress_step(0, 1000), 0);
        assert_eq!(progress_step(99, 1000), 0);
        assert_eq!(progress_step(100, 1000), 1);
        assert_eq!(progress_step(1000, 1000), 10);
        assert_eq!(progress_step(5000, 1000), 10);
    }

    #[test]
    fn test_progress_step_with_unknown_size() {
        assert_eq!(progress_step(UNSIZED_PROGRESS_STEP - 1, 0), 0);
        assert_eq!(progress_step(3 * UNSIZED_PROGRESS_STEP, 0), 3);
    }

    #[test]
    fn test_standard_loaders_follow_priority() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = ModelResolver::with_cache_dir(dir.path().to_path_buf(), None);
        let kinds: Vec<BackendKind> = standard_loaders(None, resolver, None)
            .iter()
            .map(|l| l.kind())
            .collect();
        assert_eq!(kinds, BackendKind::PRIORITY.to_vec());
    }
}
