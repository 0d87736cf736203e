use thiserror::Error;

use crate::detection::domain::backend_config::BackendConfig;
use crate::detection::domain::face_detector::FaceDetector;
use crate::detection::infrastructure::cascade_model::{CascadeModel, CascadeModelError};
use crate::detection::infrastructure::gpu_context::{GpuContext, GpuError};
use crate::detection::infrastructure::scan;
use crate::shared::constants::DEFAULT_GPU_MAX_DETECTIONS;
use crate::shared::face_rect::FaceRect;
use crate::shared::frame::Frame;

#[derive(Error, Debug)]
pub enum GpuBackendError {
    #[error(transparent)]
    Gpu(#[from] GpuError),
    #[error(transparent)]
    Model(#[from] CascadeModelError),
}

/// Accelerated backend: stages each frame onto the GPU, runs grayscale
/// and histogram equalization there, marshals the plane back, and scans
/// it with the shared cascade machinery.
///
/// Construction fails fast when the compute device or the model asset is
/// unavailable. Per-frame device failures surface as `Err` from
/// `detect`; one bad cycle never stops the pipeline — the caller records
/// the wasted time and moves on to the next frame.
pub struct GpuCascadeDetector {
    context: GpuContext,
    model: CascadeModel,
    config: BackendConfig,
    gray: Vec<u8>,
}

impl GpuCascadeDetector {
    pub fn new(mut config: BackendConfig) -> Result<Self, GpuBackendError> {
        let context = GpuContext::new()?;
        let model = CascadeModel::load(&config.model_path)?;
        // The accelerated path always carries a result cap; unbounded
        // output is a baseline-only option.
        if config.max_detections.is_none() {
            config.max_detections = Some(DEFAULT_GPU_MAX_DETECTIONS);
        }
        log::info!(
            "GPU cascade loaded from {} ({} stages, {}x{} window)",
            config.model_path.display(),
            model.stages.len(),
            model.window_width,
            model.window_height,
        );
        Ok(Self {
            context,
            model,
            config,
            gray: Vec::new(),
        })
    }
}

impl FaceDetector for GpuCascadeDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<FaceRect>, Box<dyn std::error::Error>> {
        // Upload, both preprocessing passes, and readback all happen
        // inside this call so the timed region sees the true cost.
        self.context.preprocess(frame, &mut self.gray)?;

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
