// Wire message shapes for the live tutor endpoint.
//
// The endpoint speaks JSON over WebSocket with camelCase field names: one
// setup message at connect time, realtime-input messages carrying base64
// PCM outbound, and serverContent envelopes inbound.

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::{ConnectConfig, ServerEvent};
use crate::codec::{transport_text_to_bytes, EncodedChunk};

/// Connect-time configuration envelope
#[derive(Debug, Serialize)]
pub struct SetupEnvelope {
    pub setup: Setup,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Setup {
    pub model: String,
    pub generation_config: GenerationConfig,
    pub system_instruction: Content,
    pub output_audio_transcription: EmptyConfig,
    pub input_audio_transcription: EmptyConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub response_modalities: Vec<String>,
    pub speech_config: SpeechConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeechConfig {
    pub voice_config: VoiceConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceConfig {
    pub prebuilt_voice_config: PrebuiltVoiceConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrebuiltVoiceConfig {
    pub voice_name: String,
}

#[derive(Debug, Serialize)]
pub struct Content {
    pub parts: Vec<TextPart>,
}

#[derive(Debug, Serialize)]
pub struct TextPart {
    pub text: String,
}

/// Serializes as `{}`: the endpoint takes presence as "turn this on".
#[derive(Debug, Serialize)]
pub struct EmptyConfig {}

impl SetupEnvelope {
    pub fn from_config(config: &ConnectConfig) -> Self {
        Self {
            setup: Setup {
                model: config.model.clone(),
                generation_config: GenerationConfig {
                    response_modalities: vec!["AUDIO".to_string()],
                    speech_config: SpeechConfig {
                        voice_config: VoiceConfig {
                            prebuilt_voice_config: PrebuiltVoiceConfig {
                                voice_name: config.voice.clone(),
                            },
                        },
                    },
                },
                system_instruction: Content {
                    parts: vec![TextPart {
                        text: config.system_instruction.clone(),
                    }],
                },
                output_audio_transcription: EmptyConfig {},
                input_audio_transcription: EmptyConfig {},
            },
        }
    }
}

/// Outbound audio envelope
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RealtimeInputEnvelope {
    pub realtime_input: RealtimeInput,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RealtimeInput {
    pub media_chunks: Vec<MediaBlob>,
}

/// Media payload: transport text plus its MIME tag
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaBlob {
    pub mime_type: String,
    pub data: String, // transport-text-encoded PCM bytes
}

/// Inbound message envelope
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerEnvelope {
    pub setup_complete: Option<serde_json::Value>,
    pub server_content: Option<ServerContent>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerContent {
    pub model_turn: Option<ModelTurn>,
    pub output_transcription: Option<TranscriptionDelta>,
    pub input_transcription: Option<TranscriptionDelta>,
    pub interrupted: Option<bool>,
    pub turn_complete: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct ModelTurn {
    #[serde(default)]
    pub parts: Vec<ServerPart>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerPart {
    pub inline_data: Option<MediaBlob>,
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TranscriptionDelta {
    #[serde(default)]
    pub text: String,
}

impl ServerEnvelope {
    /// Flatten one envelope into session events, preserving the order the
    /// fields are meaningful in: transcripts, then audio, then barge-in.
    pub fn into_events(self) -> Vec<ServerEvent> {
        let mut events = Vec::new();

        let content = match self.server_content {
            Some(c) => c,
            None => return events, // setupComplete or a keepalive
        };

        if let Some(delta) = content.output_transcription {
            if !delta.text.is_empty() {
                events.push(ServerEvent::OutputTranscriptDelta(delta.text));
            }
        }

        if let Some(delta) = content.input_transcription {
            if !delta.text.is_empty() {
                events.push(ServerEvent::InputTranscriptDelta(delta.text));
            }
        }

        if let Some(turn) = content.model_turn {
            for part in turn.parts {
                if let Some(blob) = part.inline_data {
                    match transport_text_to_bytes(&blob.data) {
                        Ok(bytes) => events.push(ServerEvent::AudioChunk(EncodedChunk {
                            bytes,
                            mime: blob.mime_type,
                        })),
                        Err(e) => {
                            // Should not happen for well-formed server data;
                            // skip the chunk rather than kill the session.
                            warn!("Undecodable audio payload from server: {}", e);
                        }
                    }
                }
            }
        }

        if content.interrupted.unwrap_or(false) {
            events.push(ServerEvent::Interrupted);
        }

        events
    }
}
