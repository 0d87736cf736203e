pub mod nokhwa_camera_source;
pub mod synthetic_source;
pub mod video_file_source;
