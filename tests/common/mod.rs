// Shared in-memory fakes for the integration tests: a hand-clocked output
// device, channel-fed capture backends, and a transport that records what
// it is asked to send.

#![allow(dead_code)]

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::mpsc;

use lingo_voice::{
    AudioFrame, CaptureBackend, EncodedChunk, OutputDevice, SourceId, TutorTransport, VoiceError,
};

/// One `begin` call as seen by `ManualOutput`.
#[derive(Debug, Clone)]
pub struct StartedBuffer {
    pub id: SourceId,
    pub start_at: f64,
    pub samples: usize,
}

/// Output device with a clock the test advances by hand.
pub struct ManualOutput {
    clock: Mutex<f64>,
    next_id: AtomicU64,
    pub started: Mutex<Vec<StartedBuffer>>,
    pub cancelled: Mutex<Vec<SourceId>>,
    pub close_count: AtomicUsize,
}

impl ManualOutput {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            clock: Mutex::new(0.0),
            next_id: AtomicU64::new(0),
            started: Mutex::new(Vec::new()),
            cancelled: Mutex::new(Vec::new()),
            close_count: AtomicUsize::new(0),
        })
    }

    pub fn advance(&self, secs: f64) {
        *self.clock.lock().unwrap() += secs;
    }

    pub fn set_clock(&self, secs: f64) {
        *self.clock.lock().unwrap() = secs;
    }

    pub fn started_ids(&self) -> Vec<SourceId> {
        self.started.lock().unwrap().iter().map(|b| b.id).collect()
    }

    pub fn starts(&self) -> Vec<f64> {
        self.started.lock().unwrap().iter().map(|b| b.start_at).collect()
    }

    pub fn cancelled_ids(&self) -> Vec<SourceId> {
        self.cancelled.lock().unwrap().clone()
    }

    pub fn closes(&self) -> usize {
        self.close_count.load(Ordering::SeqCst)
    }
}

impl OutputDevice for ManualOutput {
    fn clock(&self) -> f64 {
        *self.clock.lock().unwrap()
    }

    fn begin(&self, samples: Arc<Vec<f32>>, start_at: f64) -> SourceId {
        let id = SourceId(self.next_id.fetch_add(1, Ordering::SeqCst));
        self.started.lock().unwrap().push(StartedBuffer {
            id,
            start_at,
            samples: samples.len(),
        });
        id
    }

    fn cancel(&self, id: SourceId) {
        self.cancelled.lock().unwrap().push(id);
    }

    fn close(&self) {
        self.close_count.fetch_add(1, Ordering::SeqCst);
    }
}

/// Capture backend the test feeds frames into through a channel.
pub struct PushCapture {
    rx: Option<mpsc::Receiver<AudioFrame>>,
    capturing: bool,
}

impl PushCapture {
    pub fn new() -> (Self, mpsc::Sender<AudioFrame>) {
        let (tx, rx) = mpsc::channel(64);
        (
            Self {
                rx: Some(rx),
                capturing: false,
            },
            tx,
        )
    }
}

#[async_trait]
impl CaptureBackend for PushCapture {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>, VoiceError> {
        self.capturing = true;
        self.rx
            .take()
            .ok_or_else(|| VoiceError::CaptureUnavailable("already started".to_string()))
    }

    async fn stop(&mut self) -> Result<()> {
        self.capturing = false;
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.capturing
    }

    fn name(&self) -> &str {
        "push-capture"
    }
}

/// Capture backend whose device can never be acquired.
pub struct DeniedCapture;

#[async_trait]
impl CaptureBackend for DeniedCapture {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>, VoiceError> {
        Err(VoiceError::CaptureUnavailable(
            "microphone permission denied".to_string(),
        ))
    }

    async fn stop(&mut self) -> Result<()> {
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        false
    }

    fn name(&self) -> &str {
        "denied-capture"
    }
}

/// Transport that records outbound chunks and counts close calls.
pub struct RecordingTransport {
    pub sent: Mutex<Vec<EncodedChunk>>,
    pub close_count: AtomicUsize,
}

impl RecordingTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            sent: Mutex::new(Vec::new()),
            close_count: AtomicUsize::new(0),
        })
    }

    pub fn sent_chunks(&self) -> Vec<EncodedChunk> {
        self.sent.lock().unwrap().clone()
    }

    pub fn closes(&self) -> usize {
        self.close_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TutorTransport for RecordingTransport {
    async fn send(&self, chunk: EncodedChunk) -> Result<(), VoiceError> {
        self.sent.lock().unwrap().push(chunk);
        Ok(())
    }

    async fn close(&self) {
        self.close_count.fetch_add(1, Ordering::SeqCst);
    }
}
