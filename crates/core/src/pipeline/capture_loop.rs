use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::capture::domain::frame_source::FrameSource;
use crate::pipeline::frame_processor::FrameProcessor;

/// How long the worker sleeps when the source has no frame ready.
const IDLE_POLL_INTERVAL: Duration = Duration::from_millis(5);

type LoopResources = (Box<dyn FrameSource>, FrameProcessor);

/// Owns the capture thread: grabs frames from the source and feeds them
/// through the processor until stopped.
///
/// The worker thread takes ownership of the source and processor and
/// returns them when it exits, so `stop` followed by `start` resumes with
/// the same detectors and latency windows.
pub struct CaptureLoop {
    resources: Option<LoopResources>,
    worker: Option<std::thread::JoinHandle<LoopResources>>,
    cancelled: Arc<AtomicBool>,
}

impl CaptureLoop {
    pub fn new(source: Box<dyn FrameSource>, processor: FrameProcessor) -> Self {
        Self {
            resources: Some((source, processor)),
            worker: None,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Opens the source and spawns the capture thread. Source startup
    /// errors surface here, on the caller's thread; a second call while
    /// running is a no-op.
    pub fn start(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        if self.worker.is_some() {
            return Ok(());
        }

        let (mut source, mut processor) = self
            .resources
            .take()
            .ok_or("capture loop resources unavailable")?;

        if let Err(e) = source.start() {
            self.resources = Some((source, processor));
            return Err(e);
        }

        self.cancelled.store(false, Ordering::Relaxed);
        let cancelled = self.cancelled.clone();

        self.worker = Some(std::thread::spawn(move || {
            loop {
                if cancelled.load(Ordering::Relaxed) {
                    break;
                }

                match source.next_frame() {
                    Ok(Some(frame)) => processor.process(frame),
                    Ok(None) => std::thread::sleep(IDLE_POLL_INTERVAL),
                    Err(e) => {
                        // Transient grab failure: skip this tick.
                        log::warn!("frame grab failed: {e}");
                        std::thread::sleep(IDLE_POLL_INTERVAL);
                    }
                }
            }
            source.stop();
            (source, processor)
        }));

        log::info!("capture loop started");
        Ok(())
    }

    /// Signals the worker to exit and waits for it. Safe to call at any
    /// time, any number of times.
    pub fn stop(&mut self) {
        self.cancelled.store(true, Ordering::Relaxed);

        if let Some(handle) = self.worker.take() {
            match handle.join() {
                Ok(resources) => self.resources = Some(resources),
                Err(_) => log::error!("capture worker panicked"),
            }
            log::info!("capture loop stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.worker.is_some()
    }
}

impl Drop for CaptureLoop {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use crate::capture::infrastructure::synthetic_source::SyntheticSource;
    use crate::detection::domain::face_detector::FaceDetector;
    use crate::detection::infrastructure::backend_factory::BackendKind;
    use crate::pipeline::display_sink::{DisplaySink, DisplayUpdate};
    use crate::pipeline::frame_processor::BackendSlot;
    use crate::shared::face_rect::FaceRect;
    use crate::shared::frame::Frame;

    struct NoopDetector;

    impl FaceDetector for NoopDetector {
        fn detect(&mut self, _frame: &Frame) -> Result<Vec<FaceRect>, Box<dyn std::error::Error>> {
            Ok(Vec::new())
        }
    }

    struct CountingSink {
        updates: Arc<Mutex<Vec<usize>>>,
    }

    impl DisplaySink for CountingSink {
        fn present(&mut self, update: DisplayUpdate) {
            self.updates.lock().unwrap().push(update.frame.index());
        }
    }

    struct FailingSource;

    impl crate::capture::domain::frame_source::FrameSource for FailingSource {
        fn start(&mut self) -> Result<(), Box<dyn std::error::Error>> {
            Err("no such device".into())
        }

        fn next_frame(&mut self) -> Result<Option<Frame>, Box<dyn std::error::Error>> {
            Ok(None)
        }

        fn stop(&mut self) {}
    }

    fn make_loop(frame_limit: usize) -> (CaptureLoop, Arc<Mutex<Vec<usize>>>) {
        let updates = Arc::new(Mutex::new(Vec::new()));
        let sink = CountingSink {
            updates: updates.clone(),
        };
        let processor = FrameProcessor::new(
            vec![BackendSlot::new(BackendKind::Cpu, Box::new(NoopDetector))],
            Box::new(sink),
        );
        let source = SyntheticSource::new(32, 32).with_frame_limit(frame_limit);
        (CaptureLoop::new(Box::new(source), processor), updates)
    }

    fn wait_for_updates(updates: &Arc<Mutex<Vec<usize>>>, count: usize) {
        for _ in 0..200 {
            if updates.lock().unwrap().len() >= count {
                return;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        panic!("timed out waiting for {count} updates");
    }

    #[test]
    fn test_processes_frames_until_stopped() {
        let (mut capture, updates) = make_loop(10);
        capture.start().unwrap();
        wait_for_updates(&updates, 10);
        capture.stop();

        let indices = updates.lock().unwrap();
        assert_eq!(*indices, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn test_stop_is_idempotent() {
        let (mut capture, updates) = make_loop(3);
        capture.start().unwrap();
        wait_for_updates(&updates, 3);
        capture.stop();
        capture.stop();
        assert!(!capture.is_running());
    }

    #[test]
    fn test_stop_before_start_is_a_no_op() {
        let (mut capture, _updates) = make_loop(1);
        capture.stop();
        assert!(!capture.is_running());
    }

    #[test]
    fn test_start_while_running_is_a_no_op() {
        let (mut capture, updates) = make_loop(5);
        capture.start().unwrap();
        capture.start().unwrap();
        wait_for_updates(&updates, 5);
        capture.stop();

        // No duplicate worker: indices stay strictly sequential.
        let indices = updates.lock().unwrap();
        assert_eq!(*indices, (0..5).collect::<Vec<_>>());
    }

    #[test]
    fn test_restart_after_stop_resumes() {
        let (mut capture, updates) = make_loop(4);
        capture.start().unwrap();
        wait_for_updates(&updates, 4);
        capture.stop();

        // The synthetic source resets on start; the loop must come back up.
        capture.start().unwrap();
        wait_for_updates(&updates, 8);
        capture.stop();

        assert_eq!(updates.lock().unwrap().len(), 8);
    }

    #[test]
    fn test_source_start_failure_propagates_and_loop_stays_stopped() {
        let updates = Arc::new(Mutex::new(Vec::new()));
        let sink = CountingSink {
            updates: updates.clone(),
        };
        let processor = FrameProcessor::new(
            vec![BackendSlot::new(BackendKind::Cpu, Box::new(NoopDetector))],
            Box::new(sink),
        );
        let mut capture = CaptureLoop::new(Box::new(FailingSource), processor);

        assert!(capture.start().is_err());
        assert!(!capture.is_running());
        // Resources were handed back, so a retry is possible.
        assert!(capture.start().is_err());
    }

    #[test]
    fn test_dropping_a_running_loop_shuts_it_down() {
        let (mut capture, updates) = make_loop(100);
        capture.start().unwrap();
        wait_for_updates(&updates, 1);
        drop(capture);
        // Join happened in Drop; no thread is left writing.
        let count = updates.lock().unwrap().len();
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(updates.lock().unwrap().len(), count);
    }
}
