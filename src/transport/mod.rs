//! Transport session to the conversational tutor endpoint
//!
//! One bidirectional streaming connection per session: PCM16 chunks go
//! out, an ordered stream of `ServerEvent`s comes back. The transport
//! never retries on its own; reconnection is the caller's decision.

pub mod live;
pub mod messages;

pub use live::LiveTransport;

use async_trait::async_trait;

use crate::codec::EncodedChunk;
use crate::error::VoiceError;

/// One event from the remote tutor, delivered in arrival order, never
/// reordered or duplicated by the transport itself.
#[derive(Debug, Clone)]
pub enum ServerEvent {
    /// Text delta of what the tutor is saying
    OutputTranscriptDelta(String),
    /// Text delta of what the service heard the student say
    InputTranscriptDelta(String),
    /// One chunk of tutor speech, PCM16 at the playback rate
    AudioChunk(EncodedChunk),
    /// The student barged in; all queued playback is stale
    Interrupted,
    /// The connection ended. Sent exactly once, last.
    Closed,
    /// Connection-level failure; `Closed` follows
    Error(String),
}

/// Connect-time configuration for the tutor endpoint.
#[derive(Debug, Clone)]
pub struct ConnectConfig {
    /// WebSocket endpoint, without credentials
    pub endpoint: String,
    /// API key appended to the connect URL; never logged
    pub api_key: String,
    /// Model identifier understood by the endpoint
    pub model: String,
    /// Prebuilt voice persona for synthesized speech
    pub voice: String,
    /// Tutor behavior and lesson grounding, composed by the session layer
    pub system_instruction: String,
}

/// Outbound half of a live tutor connection.
///
/// Events arrive through the receiver returned at connect time, so the
/// trait itself only carries send and close.
#[async_trait]
pub trait TutorTransport: Send + Sync {
    /// Queue one encoded audio chunk for the server. Best-effort and
    /// non-blocking: a saturated outbound queue drops the chunk. Errors
    /// only when the connection is already gone.
    async fn send(&self, chunk: EncodedChunk) -> Result<(), VoiceError>;

    /// Terminate the connection. Triggers a single `Closed` event on the
    /// event stream; repeated calls are no-ops.
    async fn close(&self);
}
