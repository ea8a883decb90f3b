use byteorder::{ByteOrder, LittleEndian};

use crate::error::VoiceError;

/// Convert normalized f32 samples to 16-bit signed little-endian PCM bytes.
///
/// Each sample is scaled by 32768 and cast to i16. The cast saturates, so
/// input outside [-1, 1] clamps to i16::MIN/i16::MAX rather than wrapping.
/// Output length is exactly `2 * samples.len()`.
pub fn encode_f32_to_pcm16(samples: &[f32]) -> Vec<u8> {
    let mut bytes = vec![0u8; samples.len() * 2];
    for (i, &sample) in samples.iter().enumerate() {
        let value = (sample * 32768.0) as i16;
        LittleEndian::write_i16(&mut bytes[i * 2..i * 2 + 2], value);
    }
    bytes
}

/// Convert 16-bit signed little-endian PCM bytes back to f32 samples in
/// [-1, 1). Fails on odd-length input; a truncated chunk is dropped by the
/// caller rather than played half-decoded.
pub fn decode_pcm16_to_f32(bytes: &[u8]) -> Result<Vec<f32>, VoiceError> {
    if bytes.len() % 2 != 0 {
        return Err(VoiceError::MalformedAudio(format!(
            "odd PCM16 byte length: {}",
            bytes.len()
        )));
    }

    Ok(bytes
        .chunks_exact(2)
        .map(|pair| LittleEndian::read_i16(pair) as f32 / 32768.0)
        .collect())
}

/// Playback duration of a mono sample buffer at the given rate.
pub fn duration_secs(sample_count: usize, sample_rate: u32) -> f64 {
    sample_count as f64 / sample_rate as f64
}
