use base64::Engine;

use crate::error::VoiceError;

/// Encode raw bytes as transport-safe text for the streaming endpoint.
///
/// The wire protocol carries audio payloads inside JSON strings, so the
/// bytes go through standard base64. The mapping is lossless for every
/// byte value; `transport_text_to_bytes` inverts it exactly.
pub fn bytes_to_transport_text(bytes: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

/// Decode transport text back to raw bytes.
///
/// Fails only on text that did not come out of `bytes_to_transport_text`
/// (or an equivalent encoder on the server side).
pub fn transport_text_to_bytes(text: &str) -> Result<Vec<u8>, VoiceError> {
    Ok(base64::engine::general_purpose::STANDARD.decode(text)?)
}
