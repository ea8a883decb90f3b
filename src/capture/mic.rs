// cpal microphone backend
//
// cpal streams are not Send, so the stream lives on a dedicated thread for
// the whole capture. The thread reports device acquisition success or
// failure through a oneshot before settling into its hold loop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use tokio::sync::{mpsc, oneshot};
use tracing::{info, warn};

use super::backend::{AudioFrame, CaptureBackend};
use crate::error::VoiceError;

/// Capture backend over the platform's default input device.
pub struct MicrophoneBackend {
    running: Arc<AtomicBool>,
    thread: Option<std::thread::JoinHandle<()>>,
}

impl MicrophoneBackend {
    pub fn new() -> Self {
        Self {
            running: Arc::new(AtomicBool::new(false)),
            thread: None,
        }
    }
}

impl Default for MicrophoneBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl CaptureBackend for MicrophoneBackend {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>, VoiceError> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(VoiceError::CaptureUnavailable(
                "microphone already in use by this session".to_string(),
            ));
        }

        let (frame_tx, frame_rx) = mpsc::channel::<AudioFrame>(64);
        let (ready_tx, ready_rx) = oneshot::channel::<Result<String, String>>();
        let running = Arc::clone(&self.running);

        let thread = std::thread::Builder::new()
            .name("mic-capture".to_string())
            .spawn(move || run_capture_thread(frame_tx, ready_tx, running))
            .map_err(|e| VoiceError::CaptureUnavailable(e.to_string()))?;

        self.thread = Some(thread);

        match ready_rx.await {
            Ok(Ok(device_name)) => {
                info!("Microphone capture started on {}", device_name);
                Ok(frame_rx)
            }
            Ok(Err(reason)) => {
                self.running.store(false, Ordering::SeqCst);
                Err(VoiceError::CaptureUnavailable(reason))
            }
            Err(_) => {
                self.running.store(false, Ordering::SeqCst);
                Err(VoiceError::CaptureUnavailable(
                    "capture thread exited before the device opened".to_string(),
                ))
            }
        }
    }

    async fn stop(&mut self) -> Result<()> {
        self.running.store(false, Ordering::SeqCst);

        if let Some(handle) = self.thread.take() {
            // Join off the async runtime; the hold loop wakes within ~50ms.
            let _ = tokio::task::spawn_blocking(move || handle.join()).await;
        }

        info!("Microphone capture stopped");
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn name(&self) -> &str {
        "cpal-microphone"
    }
}

fn run_capture_thread(
    frame_tx: mpsc::Sender<AudioFrame>,
    ready_tx: oneshot::Sender<Result<String, String>>,
    running: Arc<AtomicBool>,
) {
    let host = cpal::default_host();

    let device = match host.default_input_device() {
        Some(d) => d,
        None => {
            let _ = ready_tx.send(Err("no default input device".to_string()));
            return;
        }
    };
    let device_name = device.name().unwrap_or_else(|_| "unknown".to_string());

    let supported = match device.default_input_config() {
        Ok(c) => c,
        Err(e) => {
            let _ = ready_tx.send(Err(format!("no usable input config: {}", e)));
            return;
        }
    };

    let sample_rate = supported.sample_rate().0;
    let channels = supported.channels();
    let config: cpal::StreamConfig = supported.config();

    let err_fn = |err: cpal::StreamError| warn!("Input stream error: {}", err);

    // A full channel means the pipeline is behind; voice frames have no
    // replay value, so try_send and let the frame go.
    let stream = match supported.sample_format() {
        cpal::SampleFormat::F32 => device.build_input_stream(
            &config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                let _ = frame_tx.try_send(AudioFrame {
                    samples: data.to_vec(),
                    sample_rate,
                    channels,
                });
            },
            err_fn,
            None,
        ),
        cpal::SampleFormat::I16 => device.build_input_stream(
            &config,
            move |data: &[i16], _: &cpal::InputCallbackInfo| {
                let samples = data.iter().map(|&s| s as f32 / 32768.0).collect();
                let _ = frame_tx.try_send(AudioFrame {
                    samples,
                    sample_rate,
                    channels,
                });
            },
            err_fn,
            None,
        ),
        other => {
            let _ = ready_tx.send(Err(format!("unsupported input sample format {:?}", other)));
            return;
        }
    };

    let stream = match stream {
        Ok(s) => s,
        Err(e) => {
            let _ = ready_tx.send(Err(format!("failed to open input stream: {}", e)));
            return;
        }
    };

    if let Err(e) = stream.play() {
        let _ = ready_tx.send(Err(format!("failed to start input stream: {}", e)));
        return;
    }

    let _ = ready_tx.send(Ok(device_name));

    // Hold the stream alive until stop() clears the flag.
    while running.load(Ordering::SeqCst) {
        std::thread::sleep(Duration::from_millis(50));
    }

    drop(stream);
}
