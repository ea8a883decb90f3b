//! Playback scheduling
//!
//! Incoming tutor speech is decoded and scheduled against a monotonic
//! cursor so chunks play back-to-back whatever their arrival timing. The
//! `OutputDevice` trait hides the actual speaker; `PlaybackScheduler`
//! owns the cursor, the live set, and the barge-in flush.

pub mod output;
pub mod scheduler;
pub mod speaker;

pub use output::{OutputDevice, SourceId};
pub use scheduler::{PlaybackHandle, PlaybackScheduler};
pub use speaker::SpeakerOutput;
