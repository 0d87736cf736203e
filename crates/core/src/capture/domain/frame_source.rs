use crate::shared::frame::Frame;

/// Domain interface for a push-paced frame supplier.
///
/// The pipeline never manages device discovery or format negotiation; a
/// source owns its handle and delivers in-memory RGB frames at its own
/// cadence (`next_frame` is expected to block until the source's next
/// frame is due).
pub trait FrameSource: Send {
    /// Acquires the device / opens the stream. Failure here is fatal to
    /// the pipeline and propagates to its owner.
    fn start(&mut self) -> Result<(), Box<dyn std::error::Error>>;

    /// Delivers the next frame. `Ok(None)` means nothing is available
    /// this tick — the pipeline skips the cycle without recording
    /// anything. `Err` is a transient read failure; the next tick is a
    /// fresh attempt.
    fn next_frame(&mut self) -> Result<Option<Frame>, Box<dyn std::error::Error>>;

    /// Releases the device handle. Safe to call repeatedly or before
    /// `start`.
    fn stop(&mut self);
}
