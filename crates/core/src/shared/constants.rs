use crate::shared::model_resolver::ModelSource;

/// Face detector of the unified backend (YOLO pose, WIDER FACE weights).
pub const YOLO_FACE_MODEL: ModelSource = ModelSource {
    name: "yolo11n-pose_widerface.onnx",
    url: "https://github.com/neutrinographics/faceguard/releases/download/v0.1.0/yolo11n-pose_widerface.onnx",
};

/// FER+ emotion classifier of the unified backend.
pub const EMOTION_MODEL: ModelSource = ModelSource {
    name: "emotion-ferplus-8.onnx",
    url: "https://github.com/onnx/models/raw/main/validated/vision/body_analysis/emotion_ferplus/model/emotion-ferplus-8.onnx",
};

/// Detections whose dominant-emotion confidence is at or below this are dropped.
pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.2;

/// Video sampling: analyze every Nth decoded frame.
pub const DEFAULT_FRAME_INTERVAL: usize = 30;

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "tif", "webp"];
