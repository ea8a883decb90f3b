use std::sync::Arc;

/// Identifies one scheduled buffer on an output device, from `begin` until
/// natural completion or cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SourceId(pub u64);

/// An audio output device with a sample-accurate clock.
///
/// The scheduler decides *when* buffers play; the device executes the
/// timeline. Natural completions are reported through the channel the
/// device was created with, so the scheduler can retire handles without
/// polling.
///
/// Implementations:
/// - `SpeakerOutput`: cpal output stream mixing scheduled buffers
/// - a manual-clock fake in the test suite
pub trait OutputDevice: Send + Sync {
    /// Current position of the output clock, in seconds since the device
    /// opened. Monotonic.
    fn clock(&self) -> f64;

    /// Schedule a mono sample buffer to start playing at `start_at`
    /// seconds on the device clock.
    fn begin(&self, samples: Arc<Vec<f32>>, start_at: f64) -> SourceId;

    /// Stop a scheduled or playing buffer immediately. No completion is
    /// reported for a cancelled source.
    fn cancel(&self, id: SourceId);

    /// Silence the device and release it. Idempotent; every teardown path
    /// calls this.
    fn close(&self);
}
