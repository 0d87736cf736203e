use crate::detection::infrastructure::backend_factory::BackendKind;
use crate::shared::frame::Frame;

/// Latency summary for one backend, taken at the moment a frame was
/// finished.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackendReading {
    pub kind: BackendKind,
    pub average_ms: f64,
    pub sample_count: usize,
    pub enabled: bool,
}

/// An annotated frame plus the per-backend readings that produced it.
#[derive(Debug, Clone)]
pub struct DisplayUpdate {
    pub frame: Frame,
    pub readings: Vec<BackendReading>,
}

/// Receives finished frames from the processing loop.
///
/// `present` must not block: the processing thread calls it inline, so a
/// slow sink would stall capture. Implementations that hand off to another
/// thread should drop updates rather than wait.
pub trait DisplaySink: Send {
    fn present(&mut self, update: DisplayUpdate);
}

/// Discards every update. Useful for benchmarking the pipeline itself.
pub struct NullDisplaySink;

impl DisplaySink for NullDisplaySink {
    fn present(&mut self, _update: DisplayUpdate) {}
}

/// Hands updates to another thread over a bounded channel of capacity 1.
///
/// If the consumer has not taken the previous update yet, the new one is
/// dropped. The display always shows the most recent frame it managed to
/// take, and the processing thread never waits on the display.
pub struct ChannelDisplaySink {
    tx: crossbeam_channel::Sender<DisplayUpdate>,
}

impl ChannelDisplaySink {
    /// Creates a sink and the receiver the presenting thread reads from.
    pub fn pair() -> (Self, crossbeam_channel::Receiver<DisplayUpdate>) {
        let (tx, rx) = crossbeam_channel::bounded(1);
        (Self { tx }, rx)
    }
}

impl DisplaySink for ChannelDisplaySink {
    fn present(&mut self, update: DisplayUpdate) {
        // Full channel or disconnected receiver both mean the frame is
        // simply not shown.
        let _ = self.tx.try_send(update);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn update(index: usize) -> DisplayUpdate {
        DisplayUpdate {
            frame: Frame::new(vec![0; 12], 2, 2, 3, index),
            readings: Vec::new(),
        }
    }

    #[test]
    fn test_channel_sink_delivers_an_update() {
        let (mut sink, rx) = ChannelDisplaySink::pair();
        sink.present(update(0));

        let received = rx.try_recv().unwrap();
        assert_eq!(received.frame.index(), 0);
    }

    #[test]
    fn test_channel_sink_drops_when_consumer_lags() {
        let (mut sink, rx) = ChannelDisplaySink::pair();
        sink.present(update(0));
        sink.present(update(1));
        sink.present(update(2));

        assert_eq!(rx.try_recv().unwrap().frame.index(), 0);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_channel_sink_survives_a_dropped_receiver() {
        let (mut sink, rx) = ChannelDisplaySink::pair();
        drop(rx);
        sink.present(update(0));
    }

    #[test]
    fn test_null_sink_accepts_updates() {
        let mut sink = NullDisplaySink;
        sink.present(update(0));
    }
}
