pub mod backend_loaders;
pub mod execution_provider;
pub mod math;
pub mod onnx_blazeface_detector;
pub mod onnx_emotion_classifier;
pub mod onnx_yolo_detector;
pub mod rustface_detector;
pub mod unified_backend;
