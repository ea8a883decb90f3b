use thiserror::Error;

/// Errors produced by the voice session core.
///
/// Capture and playback problems that only affect a single frame or chunk
/// are contained where they occur; the variants here are the ones callers
/// see at component boundaries.
#[derive(Debug, Error)]
pub enum VoiceError {
    /// Microphone denied or missing. Fatal to session start.
    #[error("microphone unavailable: {0}")]
    CaptureUnavailable(String),

    /// Speaker device denied or missing. Fatal to session start.
    #[error("audio output unavailable: {0}")]
    OutputUnavailable(String),

    /// Odd-length or otherwise corrupt PCM chunk. The offending chunk is
    /// dropped and the session continues.
    #[error("malformed audio chunk: {0}")]
    MalformedAudio(String),

    /// Connection-level failure. Moves the session to the error state.
    #[error("transport failure: {0}")]
    Transport(String),

    /// Transport text that does not decode back to bytes. Unreachable for
    /// data we encoded ourselves.
    #[error("transport text encoding violated: {0}")]
    Encoding(#[from] base64::DecodeError),
}
