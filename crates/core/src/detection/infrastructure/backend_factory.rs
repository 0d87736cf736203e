use std::fmt;

use thiserror::Error;

use crate::detection::domain::backend_config::BackendConfig;
use crate::detection::domain::face_detector::FaceDetector;
use crate::detection::infrastructure::cascade_model::CascadeModelError;
use crate::detection::infrastructure::cpu_cascade_detector::CpuCascadeDetector;
use crate::detection::infrastructure::gpu_cascade_detector::{GpuBackendError, GpuCascadeDetector};

/// Which detection strategy a backend slot runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BackendKind {
    Cpu,
    Gpu,
}

impl BackendKind {
    pub fn label(&self) -> &'static str {
        match self {
            BackendKind::Cpu => "CPU",
            BackendKind::Gpu => "GPU",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Error, Debug)]
pub enum BackendBuildError {
    #[error("failed to build CPU backend: {0}")]
    Cpu(#[from] CascadeModelError),
    #[error("failed to build GPU backend: {0}")]
    Gpu(#[from] GpuBackendError),
}

/// Builds a boxed detector for the requested kind. Construction errors
/// (bad model asset, no compute device) propagate to the pipeline owner;
/// the pipeline must not start on a half-built backend.
pub fn create_backend(
    kind: BackendKind,
    config: BackendConfig,
) -> Result<Box<dyn FaceDetector>, BackendBuildError> {
    log::info!(
        "Building {kind} backend (model: {}, min size: {}x{}, max: {:?})",
        config.model_path.display(),
        config.min_size.0,
        config.min_size.1,
        config.max_detections,
    );
    match kind {
        BackendKind::Cpu => Ok(Box::new(CpuCascadeDetector::new(config)?)),
        BackendKind::Gpu => Ok(Box::new(GpuCascadeDetector::new(config)?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::infrastructure::cascade_model::test_support::permissive_model_json;
    use crate::shared::frame::Frame;
    use std::io::Write;

    #[test]
    fn test_kind_labels() {
        assert_eq!(BackendKind::Cpu.label(), "CPU");
        assert_eq!(BackendKind::Gpu.to_string(), "GPU");
    }

    #[test]
    fn test_cpu_backend_builds_and_detects() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(permissive_model_json(8).as_bytes()).unwrap();
        file.flush().unwrap();

        let config = BackendConfig::new(file.path()).with_min_size((8, 8));
        let mut det = create_backend(BackendKind::Cpu, config).unwrap();
        let frame = Frame::new(vec![128u8; 32 * 32 * 3], 32, 32, 3, 0);
        assert!(det.detect(&frame).is_ok());
    }

    #[test]
    fn test_cpu_backend_build_error_propagates() {
        let config = BackendConfig::new("/nonexistent/cascade.json");
        let Err(err) = create_backend(BackendKind::Cpu, config) else {
            panic!("expected backend build to fail");
        };
        assert!(matches!(err, BackendBuildError::Cpu(_)));
    }
}
