use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::state::SessionStatus;

/// Point-in-time statistics for a voice session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStats {
    /// Where the session is in its lifecycle
    pub status: SessionStatus,

    /// When the session started
    pub started_at: DateTime<Utc>,

    /// Elapsed time in seconds
    pub duration_secs: f64,

    /// Capture frames handed to the transport
    pub frames_sent: u64,

    /// Capture frames discarded under backpressure
    pub frames_dropped: u64,

    /// Tutor audio chunks scheduled for playback
    pub chunks_scheduled: u64,

    /// Barge-in flushes performed
    pub interruptions: u64,
}
