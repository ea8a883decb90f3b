//! Microphone capture
//!
//! The `CaptureBackend` trait owns device acquisition; `CapturePipeline`
//! turns the raw frame stream into fixed-size PCM16 chunks for the
//! transport, honoring mute and dropping frames under backpressure.

pub mod backend;
pub mod mic;
pub mod pipeline;

pub use backend::{AudioFrame, CaptureBackend, CaptureConfig};
pub use mic::MicrophoneBackend;
pub use pipeline::CapturePipeline;
