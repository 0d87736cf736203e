use std::path::PathBuf;

use crate::shared::constants::DEFAULT_MIN_FACE_SIZE;

/// Per-backend construction parameters. Immutable once the backend exists;
/// changing any of them means building a new backend (model loading is the
/// expensive part, so backends live for the pipeline's lifetime).
#[derive(Clone, Debug)]
pub struct BackendConfig {
    /// Trained cascade asset on local disk. Missing or unparsable files
    /// fail construction, never a frame.
    pub model_path: PathBuf,
    /// Candidate windows below this (width, height) are rejected.
    pub min_size: (u32, u32),
    /// Cap on reported detections; `None` means unbounded.
    pub max_detections: Option<usize>,
}

impl BackendConfig {
    pub fn new(model_path: impl Into<PathBuf>) -> Self {
        Self {
            model_path: model_path.into(),
            min_size: DEFAULT_MIN_FACE_SIZE,
            max_detections: None,
        }
    }

    pub fn with_min_size(mut self, min_size: (u32, u32)) -> Self {
        self.min_size = min_size;
        self
    }

    pub fn with_max_detections(mut self, max: usize) -> Self {
        self.max_detections = Some(max);
        self
    }
}
