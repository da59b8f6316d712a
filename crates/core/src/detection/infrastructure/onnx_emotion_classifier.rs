/// FER+ facial-expression classifier using ONNX Runtime via `ort`.
///
/// Each face crop is converted to grayscale, resized to 64×64 and fed as
/// raw 0–255 intensities (`[1, 1, 64, 64]`). The model emits 8 logits; the
/// contempt class has no counterpart in [`Emotion`] and is dropped after
/// the softmax, so the remaining scores may sum to slightly less than 1.
use std::path::Path;

use image::imageops::FilterType;
use image::GrayImage;

use crate::emotion::domain::emotion::{Emotion, EmotionDistribution};
use crate::shared::frame::Frame;
use crate::shared::region::FaceRegion;

use super::execution_provider::load_session;
use super::math::softmax;

/// FER+ input resolution.
const INPUT_SIZE: u32 = 64;

/// FER+ output order. `None` marks contempt.
const FERPLUS_LABELS: [Option<Emotion>; 8] = [
    Some(Emotion::Neutral),
    Some(Emotion::Happy),
    Some(Emotion::Surprise),
    Some(Emotion::Sad),
    Some(Emotion::Angry),
    Some(Emotion::Disgust),
    Some(Emotion::Fear),
    None,
];

pub struct OnnxEmotionClassifier {
    session: ort::session::Session,
}

impl OnnxEmotionClassifier {
    pub fn new(model_path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        Ok(Self {
            session: load_session(model_path)?,
        })
    }

    /// Classifies one face region of `frame`.
    pub fn classify(
        &mut self,
        frame: &Frame,
        region: &FaceRegion,
    ) -> Result<EmotionDistribution, Box<dyn std::error::Error>> {
        let input = preprocess(frame, region)?;
        let input_value = ort::value::Tensor::from_array(input)?;
        let outputs = self.session.run(ort::inputs![input_value])?;
        if outputs.len() == 0 {
            return Err("emotion model produced no outputs".into());
        }
        let tensor = outputs[0].try_extract_array::<f32>()?;
        let logits = tensor.as_slice().ok_or("Cannot get tensor slice")?;
        if logits.len() != FERPLUS_LABELS.len() {
            return Err(format!(
                "emotion model returned {} scores, expected {}",
                logits.len(),
                FERPLUS_LABELS.len()
            )
            .into());
        }
        Ok(to_distribution(&softmax(logits)))
    }
}

/// Maps FER+ probabilities onto the seven-label distribution.
fn to_distribution(probs: &[f64]) -> EmotionDistribution {
    EmotionDistribution::from_pairs(
        FERPLUS_LABELS
            .iter()
            .zip(probs)
            .filter_map(|(label, &p)| label.map(|emotion| (emotion, p))),
    )
}

/// Crops `region`, converts to luma and resizes to the model input.
fn preprocess(
    frame: &Frame,
    region: &FaceRegion,
) -> Result<ndarray::Array4<f32>, Box<dyn std::error::Error>> {
    if !region.fits_within(frame.width(), frame.height()) {
        return Err(format!("face region {region:?} outside frame").into());
    }
    let crop = GrayImage::from_raw(region.width, region.height, frame.crop_grayscale(region))
        .ok_or("face crop size mismatch")?;
    let resized = image::imageops::resize(&crop, INPUT_SIZE, INPUT_SIZE, FilterType::Triangle);

    let size = INPUT_SIZE as usize;
    let mut tensor = ndarray::Array4::<f32>::zeros((1, 1, size, size));
    for (x, y, pixel) in resized.enumerate_pixels() {
        tensor[[0, 0, y as usize, x as usize]] = pixel.0[0] as f32;
    }
    Ok(tensor)
}
