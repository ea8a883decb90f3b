use anyhow::Result;
use tokio::sync::mpsc;

use crate::error::VoiceError;

/// A slice of mono-or-interleaved audio samples as delivered by a device.
///
/// Frames are ephemeral: produced by a capture backend, conditioned and
/// encoded by the pipeline, never stored.
#[derive(Debug, Clone)]
pub struct AudioFrame {
    /// Normalized samples in [-1, 1], interleaved when `channels > 1`
    pub samples: Vec<f32>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of channels
    pub channels: u16,
}

/// Configuration for the capture side of a session
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Sample rate the transport expects (frames are decimated down to this)
    pub target_sample_rate: u32,
    /// Samples per outbound frame
    pub frame_samples: usize,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            target_sample_rate: 16000, // what the tutor endpoint ingests
            frame_samples: 4096,
        }
    }
}

/// Microphone capture backend trait
///
/// Implementations:
/// - `MicrophoneBackend`: cpal input stream on a dedicated audio thread
/// - test fakes that feed scripted frames through the same channel
#[async_trait::async_trait]
pub trait CaptureBackend: Send + Sync {
    /// Acquire the input device and start capturing.
    ///
    /// Returns a channel receiver that will receive raw frames. Failure to
    /// acquire the device is `VoiceError::CaptureUnavailable` and aborts
    /// session initialization.
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>, VoiceError>;

    /// Stop capturing and release the device.
    async fn stop(&mut self) -> Result<()>;

    /// Check if the backend is currently capturing
    fn is_capturing(&self) -> bool;

    /// Get backend name for logging
    fn name(&self) -> &str;
}
