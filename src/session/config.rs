use serde::{Deserialize, Serialize};

/// Configuration for one voice-tutor session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Unique session identifier
    pub session_id: String,

    /// Language the student is practicing
    pub target_language: String,

    /// Prebuilt voice persona the tutor speaks with
    pub voice: String,

    /// Microphone leg sample rate (what the endpoint ingests)
    pub capture_sample_rate: u32,

    /// Tutor speech sample rate (what the endpoint emits)
    pub playback_sample_rate: u32,

    /// Samples per outbound capture frame
    pub frame_samples: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            session_id: format!("practice-{}", uuid::Uuid::new_v4()),
            target_language: "Spanish".to_string(),
            voice: "Zephyr".to_string(),
            capture_sample_rate: 16000,
            playback_sample_rate: 24000,
            frame_samples: 4096,
        }
    }
}
