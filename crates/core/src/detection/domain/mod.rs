pub mod backend_config;
pub mod face_detector;
