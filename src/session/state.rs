use serde::{Deserialize, Serialize};

/// Where the session is in its lifecycle.
///
/// `Error` is absorbing: once a transport failure lands, later events
/// (including the trailing `Closed`) leave it in place. `Closed` is
/// terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Connection being established; capture not yet running
    Connecting,
    /// Waiting on the student; nothing queued for playback
    Listening,
    /// Tutor speech is queued or playing
    Speaking,
    /// Session ended normally
    Closed,
    /// Transport failed; teardown has run
    Error,
}

impl SessionStatus {
    pub fn as_str(&self) -> &str {
        match self {
            SessionStatus::Connecting => "connecting",
            SessionStatus::Listening => "listening",
            SessionStatus::Speaking => "speaking",
            SessionStatus::Closed => "closed",
            SessionStatus::Error => "error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionStatus::Closed | SessionStatus::Error)
    }
}

/// The two running transcript lines shown to the student.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptBoard {
    /// What the tutor is saying, accumulated delta by delta
    pub tutor: String,
    /// What the service heard the student say
    pub student: String,
}

impl TranscriptBoard {
    pub fn clear(&mut self) {
        self.tutor.clear();
        self.student.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.tutor.is_empty() && self.student.is_empty()
    }
}

/// Session state as a plain value: every transition is a method from
/// (state, event) to new state, with no I/O attached, so the machine is
/// testable without a microphone or a network.
#[derive(Debug, Clone)]
pub struct SessionState {
    pub status: SessionStatus,
    pub transcript: TranscriptBoard,
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            status: SessionStatus::Connecting,
            transcript: TranscriptBoard::default(),
        }
    }

    /// Transport is open and capture is running: connecting -> listening.
    pub fn on_ready(&mut self) {
        if self.status == SessionStatus::Connecting {
            self.status = SessionStatus::Listening;
        }
    }

    /// First audio chunk of a response turn: listening -> speaking, and
    /// both transcript lines reset for the new turn.
    pub fn on_audio_chunk(&mut self) {
        if self.status == SessionStatus::Listening {
            self.transcript.clear();
            self.status = SessionStatus::Speaking;
        }
    }

    /// Playback drained: speaking -> listening.
    pub fn on_drained(&mut self) {
        if self.status == SessionStatus::Speaking {
            self.status = SessionStatus::Listening;
        }
    }

    /// Barge-in: stale transcript goes with the stale audio, and with
    /// nothing left queued the session is listening again.
    pub fn on_interrupted(&mut self) {
        self.transcript.clear();
        if self.status == SessionStatus::Speaking {
            self.status = SessionStatus::Listening;
        }
    }

    pub fn on_tutor_text(&mut self, delta: &str) {
        if !self.status.is_terminal() {
            self.transcript.tutor.push_str(delta);
        }
    }

    pub fn on_student_text(&mut self, delta: &str) {
        if !self.status.is_terminal() {
            self.transcript.student.push_str(delta);
        }
    }

    /// Transport failure: any live state -> error, exactly once.
    pub fn on_error(&mut self) {
        if !self.status.is_terminal() {
            self.status = SessionStatus::Error;
        }
    }

    /// Connection ended. A session already in error stays there.
    pub fn on_closed(&mut self) {
        if self.status != SessionStatus::Error {
            self.status = SessionStatus::Closed;
        }
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}
