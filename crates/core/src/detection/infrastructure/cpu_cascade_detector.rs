use crate::detection::domain::backend_config::BackendConfig;
use crate::detection::domain::face_detector::FaceDetector;
use crate::detection::infrastructure::cascade_model::{CascadeModel, CascadeModelError};
use crate::detection::infrastructure::{preprocess, scan};
use crate::shared::face_rect::FaceRect;
use crate::shared::frame::Frame;

/// Baseline backend: the whole pipeline — grayscale, equalization,
/// multi-scale scan — runs synchronously on the caller's thread.
///
/// Per-frame calls cannot fail; anything that could go wrong (a bad model
/// path, an invalid cascade) is caught at construction and propagated to
/// the pipeline owner before capture starts.
pub struct CpuCascadeDetector {
    model: CascadeModel,
    config: BackendConfig,
    gray: Vec<u8>,
}

impl CpuCascadeDetector {
    pub fn new(config: BackendConfig) -> Result<Self, CascadeModelError> {
        let model = CascadeModel::load(&config.model_path)?;
        log::info!(
            "CPU cascade loaded from {} ({} stages, {}x{} window)",
            config.model_path.display(),
            model.stages.len(),
            model.window_width,
            model.window_height,
        );
        Ok(Self {
            model,
            config,
            gray: Vec::new(),
        })
    }
}

impl FaceDetector for CpuCascadeDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<FaceRect>, Box<dyn std::error::Error>> {
        preprocess::grayscale_into(frame, &mut self.gray);
        preprocess::equalize_in_place(&mut self.gray);

        Ok(scan::scan(
            &self.gray,
            frame.width(),
            frame.height(),
            &self.model,
            self.config.min_size,
            self.config.max_detections,
        ))
    }
}
