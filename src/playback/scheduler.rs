use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, info};

use super::output::{OutputDevice, SourceId};
use crate::codec::{self, EncodedChunk};
use crate::error::VoiceError;

/// One scheduled, queued-or-playing buffer.
#[derive(Debug, Clone, Copy)]
pub struct PlaybackHandle {
    pub id: SourceId,
    /// Device-clock time the buffer starts at, in seconds
    pub started_at: f64,
    /// Buffer length in seconds
    pub duration: f64,
}

/// Schedules decoded tutor speech back-to-back on the output device.
///
/// Chunks arrive at irregular intervals; the `next_start` cursor, not
/// arrival time, decides where each one lands on the timeline. Each chunk
/// starts at `max(next_start, clock)`, and the cursor advances by the
/// chunk's duration, which makes consecutive chunks contiguous: no gaps,
/// no overlaps, regardless of inbound jitter.
///
/// The live set tracks every in-flight buffer so that barge-in can stop
/// them all at once.
pub struct PlaybackScheduler {
    device: Arc<dyn OutputDevice>,
    /// Rate assumed for chunks whose MIME tag carries none
    default_sample_rate: u32,
    /// Earliest time the next buffer may start
    next_start: f64,
    live: BTreeMap<SourceId, PlaybackHandle>,
}

impl PlaybackScheduler {
    pub fn new(device: Arc<dyn OutputDevice>, default_sample_rate: u32) -> Self {
        Self {
            device,
            default_sample_rate,
            next_start: 0.0,
            live: BTreeMap::new(),
        }
    }

    /// Decode one chunk and schedule it right after everything already
    /// queued. A malformed chunk is an error for the caller to log and
    /// drop; scheduler state is untouched by it.
    pub fn enqueue(&mut self, chunk: &EncodedChunk) -> Result<PlaybackHandle, VoiceError> {
        let samples = codec::decode_pcm16_to_f32(&chunk.bytes)?;
        let sample_rate = chunk.sample_rate().unwrap_or(self.default_sample_rate);
        let duration = codec::duration_secs(samples.len(), sample_rate);

        let start_at = self.next_start.max(self.device.clock());
        let id = self.device.begin(Arc::new(samples), start_at);
        self.next_start = start_at + duration;

        let handle = PlaybackHandle {
            id,
            started_at: start_at,
            duration,
        };
        self.live.insert(id, handle);

        debug!(
            "Scheduled chunk {:?}: start={:.3}s dur={:.3}s live={}",
            id,
            start_at,
            duration,
            self.live.len()
        );

        Ok(handle)
    }

    /// Retire a naturally-completed buffer. Returns true when this was the
    /// last live buffer, i.e. playback has drained and the tutor finished
    /// speaking. Stale completions (already flushed) are ignored.
    pub fn on_completed(&mut self, id: SourceId) -> bool {
        if self.live.remove(&id).is_none() {
            return false;
        }
        self.live.is_empty()
    }

    /// Barge-in: stop every live buffer, forget them all, and pull the
    /// cursor back to the current clock so the next response starts
    /// immediately instead of after the discarded audio.
    pub fn flush(&mut self) {
        let stopped = self.live.len();
        for id in self.live.keys() {
            self.device.cancel(*id);
        }
        self.live.clear();
        self.next_start = self.device.clock();

        if stopped > 0 {
            info!("Flushed {} pending playback buffers", stopped);
        }
    }

    pub fn is_idle(&self) -> bool {
        self.live.is_empty()
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    /// The earliest time the next scheduled buffer may start.
    pub fn next_start(&self) -> f64 {
        self.next_start
    }
}
