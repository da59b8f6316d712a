pub mod analysis_error;
pub mod analyze_image_use_case;
pub mod analyze_video_use_case;
pub mod analyzer;
pub mod backend_initializer;
pub mod emotion_stage;
pub mod face_locator;
pub mod stream_aggregator;
