// cpal speaker output
//
// Mirrors the microphone backend's threading: the cpal stream is not Send,
// so a dedicated thread owns it. Scheduled buffers live in a shared
// timeline measured in absolute sample positions; the output callback
// mixes whatever overlaps the frame being rendered and reports buffers
// that finished inside it.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use tokio::sync::{mpsc, oneshot};
use tracing::{info, warn};

use super::output::{OutputDevice, SourceId};
use crate::error::VoiceError;

struct ScheduledBuffer {
    id: SourceId,
    /// Absolute sample position on the device timeline
    start: u64,
    samples: Arc<Vec<f32>>,
}

struct Timeline {
    /// Samples rendered since the device opened
    rendered: AtomicU64,
    pending: Mutex<Vec<ScheduledBuffer>>,
    completed_tx: mpsc::UnboundedSender<SourceId>,
}

/// Output device over the platform's default speaker, mono at the
/// session's playback rate.
pub struct SpeakerOutput {
    timeline: Arc<Timeline>,
    sample_rate: u32,
    next_id: AtomicU64,
    running: Arc<AtomicBool>,
    thread: Mutex<Option<std::thread::JoinHandle<()>>>,
}

impl SpeakerOutput {
    /// Open the default output device at `sample_rate` (mono).
    ///
    /// Returns the device plus the completion stream the scheduler
    /// consumes.
    pub async fn open(
        sample_rate: u32,
    ) -> Result<(Arc<Self>, mpsc::UnboundedReceiver<SourceId>), VoiceError> {
        let (completed_tx, completed_rx) = mpsc::unbounded_channel();

        let timeline = Arc::new(Timeline {
            rendered: AtomicU64::new(0),
            pending: Mutex::new(Vec::new()),
            completed_tx,
        });

        let running = Arc::new(AtomicBool::new(true));
        let (ready_tx, ready_rx) = oneshot::channel::<Result<String, String>>();

        let thread_timeline = Arc::clone(&timeline);
        let thread_running = Arc::clone(&running);
        let thread = std::thread::Builder::new()
            .name("speaker-output".to_string())
            .spawn(move || run_output_thread(thread_timeline, thread_running, sample_rate, ready_tx))
            .map_err(|e| VoiceError::OutputUnavailable(e.to_string()))?;

        match ready_rx.await {
            Ok(Ok(device_name)) => {
                info!("Speaker output opened on {} at {}Hz", device_name, sample_rate);
            }
            Ok(Err(reason)) => return Err(VoiceError::OutputUnavailable(reason)),
            Err(_) => {
                return Err(VoiceError::OutputUnavailable(
                    "output thread exited before the device opened".to_string(),
                ))
            }
        }

        Ok((
            Arc::new(Self {
                timeline,
                sample_rate,
                next_id: AtomicU64::new(0),
                running,
                thread: Mutex::new(Some(thread)),
            }),
            completed_rx,
        ))
    }
}

impl OutputDevice for SpeakerOutput {
    fn clock(&self) -> f64 {
        self.timeline.rendered.load(Ordering::SeqCst) as f64 / self.sample_rate as f64
    }

    fn begin(&self, samples: Arc<Vec<f32>>, start_at: f64) -> SourceId {
        let id = SourceId(self.next_id.fetch_add(1, Ordering::SeqCst));
        let start = (start_at * self.sample_rate as f64).round() as u64;

        if let Ok(mut pending) = self.timeline.pending.lock() {
            pending.push(ScheduledBuffer { id, start, samples });
        }

        id
    }

    fn cancel(&self, id: SourceId) {
        if let Ok(mut pending) = self.timeline.pending.lock() {
            pending.retain(|buffer| buffer.id != id);
        }
    }

    fn close(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }

        if let Ok(mut pending) = self.timeline.pending.lock() {
            pending.clear();
        }

        // The thread notices the flag within its hold interval and drops
        // the stream; detaching keeps close() non-blocking.
        if let Ok(mut slot) = self.thread.lock() {
            slot.take();
        }

        info!("Speaker output closed");
    }
}

fn run_output_thread(
    timeline: Arc<Timeline>,
    running: Arc<AtomicBool>,
    sample_rate: u32,
    ready_tx: oneshot::Sender<Result<String, String>>,
) {
    let host = cpal::default_host();

    let device = match host.default_output_device() {
        Some(d) => d,
        None => {
            let _ = ready_tx.send(Err("no default output device".to_string()));
            return;
        }
    };
    let device_name = device.name().unwrap_or_else(|_| "unknown".to_string());

    let config = cpal::StreamConfig {
        channels: 1,
        sample_rate: cpal::SampleRate(sample_rate),
        buffer_size: cpal::BufferSize::Default,
    };

    let callback_timeline = Arc::clone(&timeline);
    let stream = device.build_output_stream(
        &config,
        move |out: &mut [f32], _: &cpal::OutputCallbackInfo| {
            render_frame(&callback_timeline, out);
        },
        |err| warn!("Output stream error: {}", err),
        None,
    );

    let stream = match stream {
        Ok(s) => s,
        Err(e) => {
            let _ = ready_tx.send(Err(format!("failed to open output stream: {}", e)));
            return;
        }
    };

    if let Err(e) = stream.play() {
        let _ = ready_tx.send(Err(format!("failed to start output stream: {}", e)));
        return;
    }

    let _ = ready_tx.send(Ok(device_name));

    while running.load(Ordering::SeqCst) {
        std::thread::sleep(Duration::from_millis(50));
    }

    drop(stream);
}

/// Mix every scheduled buffer that overlaps this output frame, retire the
/// ones that end inside it, and advance the render clock.
fn render_frame(timeline: &Timeline, out: &mut [f32]) {
    let base = timeline.rendered.load(Ordering::SeqCst);
    let frame_end = base + out.len() as u64;

    out.fill(0.0);

    if let Ok(mut pending) = timeline.pending.lock() {
        pending.retain(|buffer| {
            let end = buffer.start + buffer.samples.len() as u64;

            if buffer.start < frame_end && end > base {
                let from = buffer.start.max(base);
                let to = end.min(frame_end);
                for position in from..to {
                    out[(position - base) as usize] +=
                        buffer.samples[(position - buffer.start) as usize];
                }
            }

            if end <= frame_end {
                let _ = timeline.completed_tx.send(buffer.id);
                false
            } else {
                true
            }
        });
    }

    timeline.rendered.store(frame_end, Ordering::SeqCst);
}
