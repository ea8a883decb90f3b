use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::backend::{AudioFrame, CaptureBackend, CaptureConfig};
use crate::codec::{self, EncodedChunk};
use crate::error::VoiceError;

/// Segments the microphone stream into fixed-size frames and encodes each
/// one for the transport.
///
/// Frames arrive from the backend at whatever size and rate the device
/// produces; the pipeline conditions them down to the target rate,
/// accumulates exactly `frame_samples` samples per outbound chunk, and
/// hands chunks off without ever blocking on the consumer. While muted,
/// incoming frames are dropped on the floor: nothing is sent and nothing
/// is buffered, but the device keeps running.
pub struct CapturePipeline {
    config: CaptureConfig,

    /// When set, raw frames are discarded before encoding
    muted: Arc<AtomicBool>,

    /// Cleared on stop to end the pump task
    running: Arc<AtomicBool>,

    /// The backend currently holding the device, if started
    backend: Mutex<Option<Box<dyn CaptureBackend>>>,

    /// Handle for the frame pump task
    pump_task: Mutex<Option<JoinHandle<()>>>,

    /// Chunks handed to the transport channel
    frames_sent: Arc<AtomicU64>,

    /// Chunks discarded because the transport channel was full
    frames_dropped: Arc<AtomicU64>,
}

impl CapturePipeline {
    pub fn new(config: CaptureConfig) -> Self {
        Self {
            config,
            muted: Arc::new(AtomicBool::new(false)),
            running: Arc::new(AtomicBool::new(false)),
            backend: Mutex::new(None),
            pump_task: Mutex::new(None),
            frames_sent: Arc::new(AtomicU64::new(0)),
            frames_dropped: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Acquire the microphone through `backend` and start producing
    /// encoded chunks.
    ///
    /// Device acquisition failure propagates as `CaptureUnavailable` and
    /// leaves the pipeline stopped.
    pub async fn start(
        &self,
        mut backend: Box<dyn CaptureBackend>,
    ) -> Result<mpsc::Receiver<EncodedChunk>, VoiceError> {
        let mut frame_rx = backend.start().await?;

        info!(
            "Capture pipeline started: backend={}, {} samples/frame at {}Hz",
            backend.name(),
            self.config.frame_samples,
            self.config.target_sample_rate
        );

        self.running.store(true, Ordering::SeqCst);
        {
            let mut slot = self.backend.lock().await;
            *slot = Some(backend);
        }

        let (chunk_tx, chunk_rx) = mpsc::channel::<EncodedChunk>(16);

        let muted = Arc::clone(&self.muted);
        let running = Arc::clone(&self.running);
        let frames_sent = Arc::clone(&self.frames_sent);
        let frames_dropped = Arc::clone(&self.frames_dropped);
        let target_rate = self.config.target_sample_rate;
        let frame_samples = self.config.frame_samples;

        let pump = tokio::spawn(async move {
            let mut pending: Vec<f32> = Vec::with_capacity(frame_samples * 2);

            while let Some(frame) = frame_rx.recv().await {
                if !running.load(Ordering::SeqCst) {
                    break;
                }

                if muted.load(Ordering::SeqCst) {
                    // Muted frames are not queued for later; partial
                    // accumulation is discarded with them.
                    pending.clear();
                    continue;
                }

                let frame = condition_frame(frame, target_rate);
                pending.extend_from_slice(&frame.samples);

                while pending.len() >= frame_samples {
                    let samples: Vec<f32> = pending.drain(..frame_samples).collect();
                    let bytes = codec::encode_f32_to_pcm16(&samples);
                    let chunk = EncodedChunk::pcm(bytes, target_rate);

                    match chunk_tx.try_send(chunk) {
                        Ok(()) => {
                            frames_sent.fetch_add(1, Ordering::SeqCst);
                        }
                        Err(TrySendError::Full(_)) => {
                            // Backpressure: stale voice is worthless, drop it.
                            frames_dropped.fetch_add(1, Ordering::SeqCst);
                            debug!("Transport send queue full, dropped a capture frame");
                        }
                        Err(TrySendError::Closed(_)) => {
                            debug!("Chunk consumer gone, stopping frame pump");
                            return;
                        }
                    }
                }
            }

            debug!("Frame pump finished");
        });

        {
            let mut slot = self.pump_task.lock().await;
            *slot = Some(pump);
        }

        Ok(chunk_rx)
    }

    /// Stop the pump and release the microphone. Safe to call more than
    /// once; later calls find nothing left to release.
    pub async fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);

        if let Some(mut backend) = self.backend.lock().await.take() {
            if let Err(e) = backend.stop().await {
                warn!("Failed to stop capture backend: {}", e);
            }
        }

        if let Some(task) = self.pump_task.lock().await.take() {
            // A stopped backend closes its channel and the pump drains on
            // its own; abort covers feeds that outlive their backend.
            task.abort();
            if let Err(e) = task.await {
                if !e.is_cancelled() {
                    warn!("Frame pump task panicked: {}", e);
                }
            }
        }
    }

    pub fn set_muted(&self, muted: bool) {
        self.muted.store(muted, Ordering::SeqCst);
        info!("Capture {}", if muted { "muted" } else { "unmuted" });
    }

    pub fn is_muted(&self) -> bool {
        self.muted.load(Ordering::SeqCst)
    }

    pub fn frames_sent(&self) -> u64 {
        self.frames_sent.load(Ordering::SeqCst)
    }

    pub fn frames_dropped(&self) -> u64 {
        self.frames_dropped.load(Ordering::SeqCst)
    }
}

/// Condition a device frame to mono at the target rate.
fn condition_frame(frame: AudioFrame, target_sample_rate: u32) -> AudioFrame {
    let mut conditioned = frame;

    if conditioned.channels > 1 {
        conditioned = fold_to_mono(conditioned);
    }

    if conditioned.sample_rate != target_sample_rate {
        conditioned = decimate(conditioned, target_sample_rate);
    }

    conditioned
}

/// Collapse interleaved channels to mono by averaging each sample group.
fn fold_to_mono(frame: AudioFrame) -> AudioFrame {
    let channels = frame.channels as usize;
    let mono: Vec<f32> = frame
        .samples
        .chunks_exact(channels)
        .map(|group| group.iter().sum::<f32>() / channels as f32)
        .collect();

    AudioFrame {
        samples: mono,
        sample_rate: frame.sample_rate,
        channels: 1,
    }
}

/// Downsample by decimation: keep every Nth sample for integer ratios.
/// Upsampling is not supported; slower-than-target frames pass through.
fn decimate(frame: AudioFrame, target_rate: u32) -> AudioFrame {
    let ratio = frame.sample_rate / target_rate;
    if ratio <= 1 {
        return frame;
    }

    let downsampled: Vec<f32> = frame
        .samples
        .iter()
        .step_by(ratio as usize)
        .copied()
        .collect();

    AudioFrame {
        samples: downsampled,
        sample_rate: frame.sample_rate / ratio,
        channels: frame.channels,
    }
}
