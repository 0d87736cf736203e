//! Live face detection with side-by-side CPU and GPU backends.
//!
//! Frames come from a camera, a video file, or a synthetic generator,
//! pass through every enabled detection backend, and leave annotated
//! with per-backend rolling-average latency.

pub mod capture;
pub mod detection;
pub mod pipeline;
pub mod shared;
