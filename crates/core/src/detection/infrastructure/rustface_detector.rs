/// Classical face detector backed by the `rustface` crate (SeetaFace engine).
///
/// The lowest-priority backend: detection only, no learned runtime. The
/// SeetaFace model is embedded in the binary via `include_bytes!`, so the
/// backend needs no external files. A frame is swept with increasingly fine
/// scan presets, first on its luma plane and then on a histogram-equalized
/// copy, until some pass finds a face.
use std::io::Cursor;

use crate::detection::domain::backend::{Backend, BackendError, BackendKind, LocatedFace};
use crate::shared::frame::Frame;
use crate::shared::region::FaceRegion;

static BUNDLED_MODEL: &[u8] = include_bytes!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/model/seeta_fd_frontal_v1.0.bin"
));

/// How densely the image pyramid and sliding window are sampled.
#[derive(Clone, Copy, Debug, PartialEq)]
struct ScanPreset {
    pyramid_scale_factor: f32,
    slide_window_step: u32,
}

/// Ordered from coarsest (cheap) to finest.
const PRESETS: [ScanPreset; 2] = [
    ScanPreset {
        pyramid_scale_factor: 0.8,
        slide_window_step: 4,
    },
    ScanPreset {
        pyramid_scale_factor: 0.9,
        slide_window_step: 2,
    },
];

/// rustface rejects min face sizes below 20.
const MIN_FACE_SIZE: u32 = 20;
const SCORE_THRESH: f64 = 2.0;

pub struct RustfaceDetector {
    model: rustface::Model,
}

impl RustfaceDetector {
    /// Load the bundled SeetaFace model.
    pub fn new() -> Result<Self, Box<dyn std::error::Error>> {
        Self::from_bytes(BUNDLED_MODEL)
    }

    pub fn from_bytes(model_data: &[u8]) -> Result<Self, Box<dyn std::error::Error>> {
        let model = rustface::read_model(Cursor::new(model_data))?;
        Ok(Self { model })
    }

    fn detect_with(&self, gray: &[u8], width: u32, height: u32, preset: ScanPreset) -> Vec<FaceRegion> {
        let mut detector = rustface::create_detector_with_model(self.model.clone());
        detector.set_min_face_size(MIN_FACE_SIZE);
        detector.set_score_thresh(SCORE_THRESH);
        detector.set_pyramid_scale_factor(preset.pyramid_scale_factor);
        detector.set_slide_window_step(preset.slide_window_step, preset.slide_window_step);

        detector
            .detect(&rustface::ImageData::new(gray, width, height))
            .iter()
            .filter_map(|face| {
                let bbox = face.bbox();
                FaceRegion::clamped_xywh(
                    bbox.x() as f64,
                    bbox.y() as f64,
                    bbox.width() as f64,
                    bbox.height() as f64,
                    width,
                    height,
                )
            })
            .collect()
    }
}

impl Backend for RustfaceDetector {
    fn kind(&self) -> BackendKind {
        BackendKind::Classical
    }

    fn locate_faces(&mut self, frame: &Frame) -> Result<Vec<LocatedFace>, BackendError> {
        let (width, height) = (frame.width(), frame.height());
        let gray = frame.to_grayscale();
        if gray.len() != width as usize * height as usize {
            return Err(BackendError::call(
                BackendKind::Classical,
                "luma plane does not match frame size",
            ));
        }

        let equalized = equalize_histogram(&gray);
        for (pass, plane) in [&gray, &equalized].into_iter().enumerate() {
            for preset in PRESETS {
                let regions = self.detect_with(plane, width, height, preset);
                if !regions.is_empty() {
                    log::debug!(
                        "Classical pass {pass} preset {preset:?} found {} face(s)",
                        regions.len()
                    );
                    return Ok(regions.into_iter().map(LocatedFace::region_only).collect());
                }
            }
        }
        Ok(Vec::new())
    }
}

/// Global histogram equalization of an 8-bit luma plane.
pub fn equalize_histogram(gray: &[u8]) -> Vec<u8> {
    let mut hist = [0usize; 256];
    for &v in gray {
        hist[v as usize] += 1;
    }

    let mut cdf = [0usize; 256];
    let mut running = 0;
    for (i, count) in hist.iter().enumerate() {
        running += count;
        cdf[i] = running;
    }

    let total = gray.len();
    let cdf_min = cdf.iter().copied().find(|&c| c > 0).unwrap_or(0);
    if total == cdf_min {
        // Uniform plane: nothing to spread
        return gray.to_vec();
    }

    let scale = 255.0 / (total - cdf_min) as f64;
    let lut: Vec<u8> = cdf
        .iter()
        .map(|&c| ((c.saturating_sub(cdf_min)) as f64 * scale).round().min(255.0) as u8)
        .collect();
    gray.iter().map(|&v| lut[v as usize]).collect()
}
