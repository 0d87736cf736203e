use std::time::Duration;

use crate::capture::domain::frame_source::FrameSource;
use crate::shared::frame::Frame;

/// Generates frames procedurally: a dark square drifting across a light
/// background. Deterministic, so pipeline behavior can be exercised without
/// a camera or a video file.
pub struct SyntheticSource {
    width: u32,
    height: u32,
    square_size: u32,
    frame_limit: Option<usize>,
    interval: Option<Duration>,
    frame_index: usize,
    started: bool,
}

impl SyntheticSource {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
            square_size: (width.min(height) / 4).max(1),
            frame_limit: None,
            interval: None,
            frame_index: 0,
            started: false,
        }
    }

    /// Stop producing frames after `limit` frames; `next_frame` then
    /// returns `Ok(None)` forever.
    pub fn with_frame_limit(mut self, limit: usize) -> Self {
        self.frame_limit = Some(limit);
        self
    }

    /// Sleep between frames to mimic a fixed-rate camera.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = Some(interval);
        self
    }

    fn render(&self, index: usize) -> Frame {
        let w = self.width as usize;
        let h = self.height as usize;
        let data = vec![220u8; w * h * 3];
        let mut frame = Frame::new(data, self.width, self.height, 3, index);
        let mut pixels = frame.as_ndarray_mut();

        // The square drifts one pixel per frame and wraps around.
        let size = self.square_size as usize;
        let x0 = index % w;
        let y0 = (index / 2) % h;

        for dy in 0..size {
            let y = (y0 + dy) % h;
            for dx in 0..size {
                let x = (x0 + dx) % w;
                pixels.slice_mut(ndarray::s![y, x, ..]).fill(30);
            }
        }

        drop(pixels);
        frame
    }
}

impl FrameSource for SyntheticSource {
    fn start(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.started = true;
        self.frame_index = 0;
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Option<Frame>, Box<dyn std::error::Error>> {
        if !self.started {
            return Err("SyntheticSource: not started".into());
        }

        if let Some(limit) = self.frame_limit {
            if self.frame_index >= limit {
                return Ok(None);
            }
        }

        if let Some(interval) = self.interval {
            std::thread::sleep(interval);
        }

        let frame = self.render(self.frame_index);
        self.frame_index += 1;
        Ok(Some(frame))
    }

    fn stop(&mut self) {
        self.started = false;
    }
}
