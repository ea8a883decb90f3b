pub mod capture;
pub mod codec;
pub mod config;
pub mod error;
pub mod lesson;
pub mod playback;
pub mod session;
pub mod transport;

pub use capture::{AudioFrame, CaptureBackend, CaptureConfig, CapturePipeline, MicrophoneBackend};
pub use codec::EncodedChunk;
pub use config::Config;
pub use error::VoiceError;
pub use lesson::{Lesson, LessonContent, VocabEntry};
pub use playback::{OutputDevice, PlaybackHandle, PlaybackScheduler, SourceId, SpeakerOutput};
pub use session::{
    SessionConfig, SessionParts, SessionState, SessionStats, SessionStatus, TranscriptBoard,
    VoiceTutorSession,
};
pub use transport::{ConnectConfig, LiveTransport, ServerEvent, TutorTransport};
