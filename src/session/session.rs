use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use chrono::Utc;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::config::SessionConfig;
use super::state::{SessionState, SessionStatus, TranscriptBoard};
use super::stats::SessionStats;
use crate::capture::{CaptureBackend, CaptureConfig, CapturePipeline, MicrophoneBackend};
use crate::error::VoiceError;
use crate::playback::{OutputDevice, PlaybackScheduler, SourceId, SpeakerOutput};
use crate::transport::{ConnectConfig, LiveTransport, ServerEvent, TutorTransport};

/// The collaborators a session runs on top of. `connect` assembles the
/// real ones; tests inject fakes through the same seam.
pub struct SessionParts {
    pub transport: Arc<dyn TutorTransport>,
    pub events: mpsc::Receiver<ServerEvent>,
    pub capture: Box<dyn CaptureBackend>,
    pub output: Arc<dyn OutputDevice>,
    pub completions: mpsc::UnboundedReceiver<SourceId>,
}

/// State and counters shared between the session handle and its tasks.
struct SessionShared {
    state: RwLock<SessionState>,
    status_tx: watch::Sender<SessionStatus>,
    /// Serializes teardown: the winner releases, racing callers wait for
    /// it to finish and then see the flag
    torn_down: Mutex<bool>,
    started_at: chrono::DateTime<Utc>,
    chunks_scheduled: AtomicU64,
    interruptions: AtomicU64,
}

impl SessionShared {
    fn update(&self, apply: impl FnOnce(&mut SessionState)) {
        let mut state = self.state.write().expect("session state lock poisoned");
        apply(&mut state);
        self.status_tx.send_replace(state.status);
    }

    fn snapshot(&self) -> SessionState {
        self.state.read().expect("session state lock poisoned").clone()
    }
}

/// A live voice-practice session: microphone in, tutor speech out.
///
/// Owns the capture pipeline, the transport connection, and the playback
/// device for its whole lifetime. Only one session may run per client
/// instance; the host UI enforces that and this type assumes it.
pub struct VoiceTutorSession {
    config: SessionConfig,
    shared: Arc<SessionShared>,
    transport: Arc<dyn TutorTransport>,
    pipeline: Arc<CapturePipeline>,
    output: Arc<dyn OutputDevice>,
    event_task: Mutex<Option<JoinHandle<()>>>,
    forward_task: Mutex<Option<JoinHandle<()>>>,
    status_rx: watch::Receiver<SessionStatus>,
}

impl VoiceTutorSession {
    /// Connect to the live endpoint with real audio devices.
    ///
    /// Establishment failure of any resource releases the ones already
    /// acquired and aborts; the caller decides whether to try again.
    pub async fn connect(
        config: SessionConfig,
        connect_config: ConnectConfig,
    ) -> Result<Self, VoiceError> {
        let (transport, events) = LiveTransport::connect(&connect_config).await?;

        let (output, completions) = match SpeakerOutput::open(config.playback_sample_rate).await {
            Ok(pair) => pair,
            Err(e) => {
                transport.close().await;
                return Err(e);
            }
        };

        let parts = SessionParts {
            transport: Arc::new(transport),
            events,
            capture: Box::new(MicrophoneBackend::new()),
            output,
            completions,
        };

        Self::start(parts, config).await
    }

    /// Start a session over already-connected collaborators.
    ///
    /// The transport in `parts` is ready, so this is the point where the
    /// microphone comes up, never before. A capture failure here is
    /// fatal and releases the transport and output device on the way out.
    pub async fn start(parts: SessionParts, config: SessionConfig) -> Result<Self, VoiceError> {
        let SessionParts {
            transport,
            mut events,
            capture,
            output,
            mut completions,
        } = parts;

        let (status_tx, status_rx) = watch::channel(SessionStatus::Connecting);
        let shared = Arc::new(SessionShared {
            state: RwLock::new(SessionState::new()),
            status_tx,
            torn_down: Mutex::new(false),
            started_at: Utc::now(),
            chunks_scheduled: AtomicU64::new(0),
            interruptions: AtomicU64::new(0),
        });

        let pipeline = Arc::new(CapturePipeline::new(CaptureConfig {
            target_sample_rate: config.capture_sample_rate,
            frame_samples: config.frame_samples,
        }));

        let mut chunk_rx = match pipeline.start(capture).await {
            Ok(rx) => rx,
            Err(e) => {
                transport.close().await;
                output.close();
                return Err(e);
            }
        };

        shared.update(|s| s.on_ready());
        info!(
            "Voice session {} started: capture {}Hz/{} samples, playback {}Hz",
            config.session_id,
            config.capture_sample_rate,
            config.frame_samples,
            config.playback_sample_rate
        );

        // Outbound leg: encoded capture frames to the endpoint.
        let forward_transport = Arc::clone(&transport);
        let forward_task = tokio::spawn(async move {
            while let Some(chunk) = chunk_rx.recv().await {
                if let Err(e) = forward_transport.send(chunk).await {
                    warn!("Stopping outbound audio: {}", e);
                    break;
                }
            }
            debug!("Outbound forwarder finished");
        });

        // Inbound leg: server events drive playback and the state machine.
        let mut scheduler = PlaybackScheduler::new(Arc::clone(&output), config.playback_sample_rate);
        let loop_shared = Arc::clone(&shared);
        let loop_transport = Arc::clone(&transport);
        let loop_pipeline = Arc::clone(&pipeline);
        let loop_output = Arc::clone(&output);

        let event_task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    event = events.recv() => match event {
                        Some(ServerEvent::OutputTranscriptDelta(text)) => {
                            loop_shared.update(|s| s.on_tutor_text(&text));
                        }
                        Some(ServerEvent::InputTranscriptDelta(text)) => {
                            loop_shared.update(|s| s.on_student_text(&text));
                        }
                        Some(ServerEvent::AudioChunk(chunk)) => match scheduler.enqueue(&chunk) {
                            Ok(_) => {
                                loop_shared.chunks_scheduled.fetch_add(1, Ordering::SeqCst);
                                loop_shared.update(|s| s.on_audio_chunk());
                            }
                            Err(e) => warn!("Dropping undecodable audio chunk: {}", e),
                        },
                        Some(ServerEvent::Interrupted) => {
                            scheduler.flush();
                            loop_shared.interruptions.fetch_add(1, Ordering::SeqCst);
                            loop_shared.update(|s| s.on_interrupted());
                        }
                        Some(ServerEvent::Error(reason)) => {
                            error!("Transport error: {}", reason);
                            loop_shared.update(|s| s.on_error());
                            teardown(&loop_shared, &loop_transport, &loop_pipeline, &loop_output)
                                .await;
                            // The trailing Closed still arrives; error is absorbing.
                        }
                        Some(ServerEvent::Closed) | None => {
                            teardown(&loop_shared, &loop_transport, &loop_pipeline, &loop_output)
                                .await;
                            break;
                        }
                    },
                    Some(id) = completions.recv() => {
                        if scheduler.on_completed(id) {
                            loop_shared.update(|s| s.on_drained());
                        }
                    }
                }
            }
            debug!("Event loop finished");
        });

        Ok(Self {
            config,
            shared,
            transport,
            pipeline,
            output,
            event_task: Mutex::new(Some(event_task)),
            forward_task: Mutex::new(Some(forward_task)),
            status_rx,
        })
    }

    pub fn status(&self) -> SessionStatus {
        self.shared.snapshot().status
    }

    /// Watch channel the host UI can await status changes on.
    pub fn subscribe_status(&self) -> watch::Receiver<SessionStatus> {
        self.status_rx.clone()
    }

    /// Current transcript lines (tutor and student).
    pub fn transcript(&self) -> TranscriptBoard {
        self.shared.snapshot().transcript
    }

    /// Mute or unmute the microphone leg. Muted frames are dropped, not
    /// buffered; the capture stream itself stays open.
    pub fn set_muted(&self, muted: bool) {
        self.pipeline.set_muted(muted);
    }

    pub fn is_muted(&self) -> bool {
        self.pipeline.is_muted()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn stats(&self) -> SessionStats {
        let duration = Utc::now().signed_duration_since(self.shared.started_at);

        SessionStats {
            status: self.status(),
            started_at: self.shared.started_at,
            duration_secs: duration.num_milliseconds() as f64 / 1000.0,
            frames_sent: self.pipeline.frames_sent(),
            frames_dropped: self.pipeline.frames_dropped(),
            chunks_scheduled: self.shared.chunks_scheduled.load(Ordering::SeqCst),
            interruptions: self.shared.interruptions.load(Ordering::SeqCst),
        }
    }

    /// End the session: release the microphone, close the transport, and
    /// silence the output device.
    ///
    /// Covers both the explicit exit control and finish-practice. Safe to
    /// call any number of times and safe to race against a
    /// transport-initiated close; the release itself happens once.
    pub async fn shutdown(&self) {
        teardown(&self.shared, &self.transport, &self.pipeline, &self.output).await;

        if let Some(task) = self.forward_task.lock().await.take() {
            task.abort();
        }
        if let Some(task) = self.event_task.lock().await.take() {
            task.abort();
        }
    }
}

/// Release every session resource exactly once, whichever trigger gets
/// here first: explicit exit, transport close, or transport error.
async fn teardown(
    shared: &Arc<SessionShared>,
    transport: &Arc<dyn TutorTransport>,
    pipeline: &Arc<CapturePipeline>,
    output: &Arc<dyn OutputDevice>,
) {
    let mut torn_down = shared.torn_down.lock().await;
    if *torn_down {
        return;
    }

    info!("Tearing down voice session");

    pipeline.stop().await;
    transport.close().await;
    output.close();

    shared.update(|s| s.on_closed());
    *torn_down = true;
}
