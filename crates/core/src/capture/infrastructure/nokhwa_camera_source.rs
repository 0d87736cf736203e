use nokhwa::{
    pixel_format::RgbFormat,
    utils::{CameraIndex, RequestedFormat, RequestedFormatType},
    Camera,
};

use crate::capture::domain::frame_source::FrameSource;
use crate::shared::frame::Frame;

/// Webcam capture via nokhwa. The device is acquired in `start` and the
/// stream paces delivery: `next_frame` blocks until the camera has a new
/// frame, so the pipeline runs exactly one cycle per camera frame.
pub struct NokhwaCameraSource {
    index: u32,
    camera: Option<Camera>,
    frame_index: usize,
}

// SAFETY: nokhwa's `Camera` stores its backend as `Box<dyn CaptureBackendTrait>`
// without a `Send` bound, but the v4l2 handle is safe to move between threads.
// The pipeline moves the source into the capture thread once and never shares it.
unsafe impl Send for NokhwaCameraSource {}

impl NokhwaCameraSource {
    pub fn new(index: u32) -> Self {
        Self {
            index,
            camera: None,
            frame_index: 0,
        }
    }
}

impl FrameSource for NokhwaCameraSource {
    fn start(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        if self.camera.is_some() {
            return Ok(());
        }
        let requested =
            RequestedFormat::new::<RgbFormat>(RequestedFormatType::AbsoluteHighestFrameRate);
        let mut camera = Camera::new(CameraIndex::Index(self.index), requested)?;
        camera.open_stream()?;
        log::info!(
            "Opened camera {} ({}) at {}",
            self.index,
            camera.info().human_name(),
            camera.camera_format(),
        );
        self.camera = Some(camera);
        self.frame_index = 0;
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Option<Frame>, Box<dyn std::error::Error>> {
        let Some(camera) = self.camera.as_mut() else {
            return Ok(None);
        };

        let buffer = camera.frame()?;
        let decoded = buffer.decode_image::<RgbFormat>()?;
        let (width, height) = decoded.dimensions();
        let frame = Frame::new(decoded.into_raw(), width, height, 3, self.frame_index);
        self.frame_index += 1;
        Ok(Some(frame))
    }

    fn stop(&mut self) {
        if let Some(mut camera) = self.camera.take() {
            if let Err(e) = camera.stop_stream() {
                log::warn!("Failed to stop camera stream cleanly: {e}");
            }
        }
    }
}
