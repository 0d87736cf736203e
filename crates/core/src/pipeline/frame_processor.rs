use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::detection::domain::face_detector::FaceDetector;
use crate::detection::infrastructure::backend_factory::BackendKind;
use crate::pipeline::display_sink::{BackendReading, DisplaySink, DisplayUpdate};
use crate::shared::constants::{
    CPU_COLOR, DEFAULT_DOWNSCALE_FACTOR, DEFAULT_WINDOW_CAPACITY, GPU_COLOR, OUTLINE_THICKNESS,
};
use crate::shared::draw;
use crate::shared::face_rect::FaceRect;
use crate::shared::frame::Frame;
use crate::shared::rolling_average::RollingAverage;

/// One detection backend wired into the processing loop: the detector
/// itself, its rolling latency window, and a flag that toggles it at
/// runtime.
pub struct BackendSlot {
    kind: BackendKind,
    detector: Box<dyn FaceDetector>,
    monitor: RollingAverage,
    enabled: Arc<AtomicBool>,
    color: [u8; 3],
}

impl BackendSlot {
    pub fn new(kind: BackendKind, detector: Box<dyn FaceDetector>) -> Self {
        let color = match kind {
            BackendKind::Cpu => CPU_COLOR,
            BackendKind::Gpu => GPU_COLOR,
        };
        Self {
            kind,
            detector,
            monitor: RollingAverage::new(DEFAULT_WINDOW_CAPACITY),
            enabled: Arc::new(AtomicBool::new(true)),
            color,
        }
    }

    pub fn with_window_capacity(mut self, capacity: usize) -> Self {
        self.monitor = RollingAverage::new(capacity);
        self
    }

    /// Shared handle for enabling or disabling this backend from another
    /// thread. A disabled backend is not invoked and its average freezes.
    pub fn enabled_flag(&self) -> Arc<AtomicBool> {
        self.enabled.clone()
    }

    pub fn kind(&self) -> BackendKind {
        self.kind
    }

    fn reading(&self, enabled: bool) -> BackendReading {
        BackendReading {
            kind: self.kind,
            average_ms: self.monitor.average(),
            sample_count: self.monitor.len(),
            enabled,
        }
    }
}

/// Runs every enabled backend against each frame, tracks per-backend
/// latency, annotates the frame, and hands it to the display sink.
///
/// A backend error on one frame never stops the loop: the failing cycle
/// contributes zero detections, the elapsed time still enters that
/// backend's window, and the next frame proceeds normally.
pub struct FrameProcessor {
    slots: Vec<BackendSlot>,
    sink: Box<dyn DisplaySink>,
    downscale_factor: u32,
    label_scale: u32,
}

impl FrameProcessor {
    pub fn new(slots: Vec<BackendSlot>, sink: Box<dyn DisplaySink>) -> Self {
        Self {
            slots,
            sink,
            downscale_factor: DEFAULT_DOWNSCALE_FACTOR,
            label_scale: 2,
        }
    }

    pub fn with_downscale_factor(mut self, factor: u32) -> Self {
        self.downscale_factor = factor.max(1);
        self
    }

    /// Processes one captured frame end to end and presents the result.
    pub fn process(&mut self, mut frame: Frame) {
        frame.downscale(self.downscale_factor);

        let mut annotations: Vec<(BackendKind, [u8; 3], f64, Vec<FaceRect>)> = Vec::new();
        let mut readings = Vec::with_capacity(self.slots.len());

        for slot in &mut self.slots {
            let enabled = slot.enabled.load(Ordering::Relaxed);
            if !enabled {
                readings.push(slot.reading(false));
                continue;
            }

            let started = Instant::now();
            let rects = match slot.detector.detect(&frame) {
                Ok(rects) => rects,
                Err(e) => {
                    log::warn!("{} backend failed on frame {}: {e}", slot.kind, frame.index());
                    Vec::new()
                }
            };
            // Samples are whole milliseconds: coarse, but stable across
            // both backends and cheap to compare.
            let elapsed_ms = started.elapsed().as_millis() as f64;
            slot.monitor.add_sample(elapsed_ms);

            readings.push(slot.reading(true));
            annotations.push((slot.kind, slot.color, slot.monitor.average(), rects));
        }

        for (kind, color, average_ms, rects) in &annotations {
            for rect in rects {
                draw::draw_rect(&mut frame, rect, *color, OUTLINE_THICKNESS);
                self.draw_label(&mut frame, rect, *kind, *color, *average_ms);
            }
        }

        self.sink.present(DisplayUpdate { frame, readings });
    }

    fn draw_label(
        &self,
        frame: &mut Frame,
        rect: &FaceRect,
        kind: BackendKind,
        color: [u8; 3],
        average_ms: f64,
    ) {
        let text = format!("{} avg: {:.1} ms", kind.label(), average_ms);
        // CPU labels sit under the rectangle, GPU labels above it, so the
        // two never overwrite each other when both backends find the same
        // face.
        let y = match kind {
            BackendKind::Cpu => rect.y + rect.height as i32 + 2,
            BackendKind::Gpu => rect.y - draw::text_height(self.label_scale) as i32 - 2,
        };
        draw::draw_text(frame, rect.x, y, &text, color, self.label_scale);
    }
}
