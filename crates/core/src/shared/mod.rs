pub mod constants;
pub mod draw;
pub mod face_rect;
pub mod frame;
pub mod rolling_average;
