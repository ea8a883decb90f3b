//! Audio byte-level codecs
//!
//! Two small, independently testable conversions live here:
//! - PCM16 little-endian bytes <-> normalized f32 samples (`pcm`)
//! - raw bytes <-> transport-safe text for the wire (`text`)

pub mod pcm;
pub mod text;

pub use pcm::{decode_pcm16_to_f32, duration_secs, encode_f32_to_pcm16};
pub use text::{bytes_to_transport_text, transport_text_to_bytes};

/// A PCM16 byte buffer paired with a MIME-style tag declaring encoding and
/// sample rate, e.g. `audio/pcm;rate=16000`.
///
/// Created by the codec layer, handed to the transport for one send, or
/// received from the transport and consumed by the playback scheduler.
#[derive(Debug, Clone)]
pub struct EncodedChunk {
    pub bytes: Vec<u8>,
    pub mime: String,
}

impl EncodedChunk {
    /// Tag a PCM16 byte buffer with its sample rate.
    pub fn pcm(bytes: Vec<u8>, sample_rate: u32) -> Self {
        Self {
            bytes,
            mime: format!("audio/pcm;rate={}", sample_rate),
        }
    }

    /// Parse the sample rate out of the MIME tag, if present.
    pub fn sample_rate(&self) -> Option<u32> {
        self.mime.rsplit("rate=").next()?.trim().parse().ok()
    }
}
