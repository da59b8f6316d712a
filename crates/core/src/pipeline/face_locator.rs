use crate::detection::domain::backend::{Backend, BackendError, BackendKind, LocatedFace};
use crate::shared::frame::Frame;

/// Faces found by the first backend that found any.
#[derive(Clone, Debug, PartialEq)]
pub struct CascadeHit {
    pub source: BackendKind,
    pub faces: Vec<LocatedFace>,
}

/// Tries each backend in order and stops at the first that finds a face.
///
/// Regions are never merged across backends. A failing backend is logged
/// and counts as finding nothing. Regions outside the frame are discarded.
pub fn locate_faces(backends: &mut [Box<dyn Backend>], frame: &Frame) -> Option<CascadeHit> {
    for backend in backends.iter_mut() {
        let kind = backend.kind();
        let faces = match backend.locate_faces(frame) {
            Ok(faces) => faces,
            Err(e @ BackendError::Call { .. }) => {
                log::warn!("Frame {}: {e}", frame.index());
                continue;
            }
            Err(e) => {
                log::error!("Frame {}: {e}", frame.index());
                continue;
            }
        };

        let located: Vec<LocatedFace> = faces
            .into_iter()
            .filter(|f| f.region.fits_within(frame.width(), frame.height()))
            .collect();
        if located.is_empty() {
            log::trace!("Frame {}: {kind} found no faces", frame.index());
            continue;
        }

        log::debug!(
            "Frame {}: {kind} located {} face(s)",
            frame.index(),
            located.len()
        );
        return Some(CascadeHit {
            source: kind,
            faces: located,
        });
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::region::FaceRegion;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    enum Outcome {
        Faces(Vec<FaceRegion>),
        Fails,
    }

    struct ScriptedBackend {
        kind: BackendKind,
        outcome: Outcome,
        calls: Arc<AtomicUsize>,
    }

    impl Backend for ScriptedBackend {
        fn kind(&self) -> BackendKind {
            self.kind
        }

        fn locate_faces(&mut self, _frame: &Frame) -> Result<Vec<LocatedFace>, BackendError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.outcome {
                Outcome::Faces(regions) => {
                    Ok(regions.iter().copied().map(LocatedFace::region_only).collect())
                }
                Outcome::Fails => Err(BackendError::call(self.kind, "corrupted frame")),
            }
        }
    }

    fn region(x: u32) -> FaceRegion {
        FaceRegion {
            x,
            y: 10,
            width: 20,
            height: 20,
        }
    }

    fn backend(kind: BackendKind, outcome: Outcome) -> (Box<dyn Backend>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let b = ScriptedBackend {
            kind,
            outcome,
            calls: calls.clone(),
        };
        (Box::new(b), calls)
    }

    fn frame() -> Frame {
        Frame::rgb(vec![0u8; 100 * 100 * 3], 100, 100, 0)
    }

    #[test]
    fn test_first_backend_with_faces_wins() {
        let (fast, _) = backend(BackendKind::Fast, Outcome::Faces(vec![region(1)]));
        let (classical, classical_calls) =
            backend(BackendKind::Classical, Outcome::Faces(vec![region(50)]));
        let mut backends = vec![fast, classical];

        let hit = locate_faces(&mut backends, &frame()).unwrap();
        assert_eq!(hit.source, BackendKind::Fast);
        assert_eq!(hit.faces, vec![LocatedFace::region_only(region(1))]);
        assert_eq!(classical_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_empty_result_falls_through() {
        let (fast, _) = backend(BackendKind::Fast, Outcome::Faces(vec![]));
        let (classical, _) = backend(BackendKind::Classical, Outcome::Faces(vec![region(50)]));
        let mut backends = vec![fast, classical];

        let hit = locate_faces(&mut backends, &frame()).unwrap();
        assert_eq!(hit.source, BackendKind::Classical);
    }

    #[test]
    fn test_call_error_falls_through() {
        let (unified, _) = backend(BackendKind::Unified, Outcome::Fails);
        let (classical, _) = backend(BackendKind::Classical, Outcome::Faces(vec![region(5)]));
        let mut backends = vec![unified, classical];

        let hit = locate_faces(&mut backends, &frame()).unwrap();
        assert_eq!(hit.source, BackendKind::Classical);
    }

    #[test]
    fn test_nothing_found_is_none() {
        let (fast, _) = backend(BackendKind::Fast, Outcome::Fails);
        let (classical, _) = backend(BackendKind::Classical, Outcome::Faces(vec![]));
        let mut backends = vec![fast, classical];
        assert!(locate_faces(&mut backends, &frame()).is_none());
        assert!(locate_faces(&mut [], &frame()).is_none());
    }

    #[test]
    fn test_out_of_frame_regions_are_discarded() {
        let outside = FaceRegion {
            x: 90,
            y: 90,
            width: 20,
            height: 20,
        };
        let (fast, _) = backend(BackendKind::Fast, Outcome::Faces(vec![outside]));
        let (classical, _) = backend(BackendKind::Classical, Outcome::Faces(vec![region(5)]));
        let mut backends = vec![fast, classical];

        let hit = locate_faces(&mut backends, &frame()).unwrap();
        assert_eq!(hit.source, BackendKind::Classical);
    }
}
