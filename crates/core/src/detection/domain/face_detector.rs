use crate::shared::face_rect::FaceRect;
use crate::shared::frame::Frame;

/// Domain interface for one interchangeable face-detection backend.
///
/// Implementations may keep reusable scratch state between frames,
/// hence `&mut self`. A per-call `Err` means the backend could not
/// produce results this cycle; the caller decides what that costs
/// (the pipeline records the elapsed time and proceeds with zero
/// detections rather than aborting).
pub trait FaceDetector: Send {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<FaceRect>, Box<dyn std::error::Error>>;
}
