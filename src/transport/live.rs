use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use super::messages::{RealtimeInput, RealtimeInputEnvelope, MediaBlob, ServerEnvelope, SetupEnvelope};
use super::{ConnectConfig, ServerEvent, TutorTransport};
use crate::codec::{bytes_to_transport_text, EncodedChunk};
use crate::error::VoiceError;

/// WebSocket transport to the live tutor endpoint.
///
/// `connect` establishes the socket, sends the setup message, and splits
/// the connection across a writer task (outbound audio) and a reader task
/// (inbound events). The reader is the only producer of `Closed`, so it
/// fires exactly once no matter how the connection ends.
pub struct LiveTransport {
    outbound_tx: mpsc::Sender<Message>,
    closed: Arc<AtomicBool>,
}

impl LiveTransport {
    /// Open a session against the endpoint described by `config`.
    ///
    /// Returns the transport plus the ordered event stream. Establishment
    /// failure is fatal to the session; no retry happens here.
    pub async fn connect(
        config: &ConnectConfig,
    ) -> Result<(Self, mpsc::Receiver<ServerEvent>), VoiceError> {
        let url = format!("{}?key={}", config.endpoint, config.api_key);
        info!("Connecting to tutor endpoint at {}", config.endpoint);

        let (ws, _response) = connect_async(url.as_str())
            .await
            .map_err(|e| VoiceError::Transport(format!("connect failed: {}", e)))?;

        let (mut sink, mut stream) = ws.split();

        // Session configuration goes out before any audio.
        let setup = SetupEnvelope::from_config(config);
        let setup_json = serde_json::to_string(&setup)
            .map_err(|e| VoiceError::Transport(format!("setup serialization failed: {}", e)))?;
        sink.send(Message::Text(setup_json))
            .await
            .map_err(|e| VoiceError::Transport(format!("setup send failed: {}", e)))?;

        info!("Tutor session configured: model={}, voice={}", config.model, config.voice);

        let (event_tx, event_rx) = mpsc::channel::<ServerEvent>(64);
        let (outbound_tx, mut outbound_rx) = mpsc::channel::<Message>(64);

        // Writer: forwards queued frames until the channel or socket ends.
        tokio::spawn(async move {
            while let Some(message) = outbound_rx.recv().await {
                let is_close = matches!(message, Message::Close(_));
                if let Err(e) = sink.send(message).await {
                    warn!("Outbound send failed: {}", e);
                    break;
                }
                if is_close {
                    break;
                }
            }
            debug!("Transport writer finished");
        });

        // Reader: turns wire messages into ServerEvents, in order.
        tokio::spawn(async move {
            while let Some(incoming) = stream.next().await {
                match incoming {
                    Ok(Message::Text(text)) => {
                        forward_envelope(text.as_bytes(), &event_tx).await;
                    }
                    Ok(Message::Binary(bytes)) => {
                        forward_envelope(&bytes, &event_tx).await;
                    }
                    Ok(Message::Close(_)) => {
                        debug!("Server closed the connection");
                        break;
                    }
                    Ok(_) => {} // ping/pong handled by tungstenite
                    Err(e) => {
                        let _ = event_tx
                            .send(ServerEvent::Error(format!("connection failed: {}", e)))
                            .await;
                        break;
                    }
                }
            }

            // Sole producer of Closed; the loop above runs once.
            let _ = event_tx.send(ServerEvent::Closed).await;
            debug!("Transport reader finished");
        });

        Ok((
            Self {
                outbound_tx,
                closed: Arc::new(AtomicBool::new(false)),
            },
            event_rx,
        ))
    }
}

async fn forward_envelope(raw: &[u8], event_tx: &mpsc::Sender<ServerEvent>) {
    match serde_json::from_slice::<ServerEnvelope>(raw) {
        Ok(envelope) => {
            if envelope.setup_complete.is_some() {
                debug!("Tutor endpoint acknowledged setup");
            }
            for event in envelope.into_events() {
                if event_tx.send(event).await.is_err() {
                    return; // session gone, reader will wind down
                }
            }
        }
        Err(e) => {
            warn!("Unparseable server message, skipping: {}", e);
        }
    }
}

#[async_trait]
impl TutorTransport for LiveTransport {
    async fn send(&self, chunk: EncodedChunk) -> Result<(), VoiceError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(VoiceError::Transport("connection closed".to_string()));
        }

        let envelope = RealtimeInputEnvelope {
            realtime_input: RealtimeInput {
                media_chunks: vec![MediaBlob {
                    mime_type: chunk.mime,
                    data: bytes_to_transport_text(&chunk.bytes),
                }],
            },
        };

        let json = serde_json::to_string(&envelope)
            .map_err(|e| VoiceError::Transport(format!("frame serialization failed: {}", e)))?;

        match self.outbound_tx.try_send(Message::Text(json)) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                // Best-effort contract: the frame is gone, the session is fine.
                debug!("Outbound queue saturated, dropped an audio frame");
                Ok(())
            }
            Err(TrySendError::Closed(_)) => {
                Err(VoiceError::Transport("writer task gone".to_string()))
            }
        }
    }

    async fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }

        // The writer forwards the close frame and exits; the reader sees
        // the handshake complete and emits Closed.
        if self.outbound_tx.send(Message::Close(None)).await.is_err() {
            debug!("Writer already gone at close time");
        }
    }
}
