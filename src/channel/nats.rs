use anyhow::{Context, Result};
use async_nats::Client;
use base64::Engine;
use futures::StreamExt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};

use super::messages::{
    AudioInputMessage, ControlMessage, ImageInputMessage, ServerMessage, SetupMessage,
};
use super::{ChannelConfig, ChannelEvent, ChannelSink, LiveChannel, ServerContent};

/// NATS-backed duplex channel to the conversational service.
///
/// Outbound payloads go to `live.{setup,audio,image,control}.<session>`,
/// inbound server events arrive on `live.server.<session>`.
pub struct NatsChannel {
    client: Client,
}

impl NatsChannel {
    /// Connect to NATS server
    pub async fn connect(url: &str) -> Result<Self> {
        info!("Connecting to NATS at {}", url);

        let client = async_nats::connect(url)
            .await
            .context("Failed to connect to NATS")?;

        info!("Connected to NATS successfully");

        Ok(Self { client })
    }
}

#[async_trait::async_trait]
impl LiveChannel for NatsChannel {
    async fn open(
        &self,
        session_id: &str,
        config: &ChannelConfig,
    ) -> Result<(Arc<dyn ChannelSink>, mpsc::Receiver<ChannelEvent>)> {
        let server_subject = format!("live.server.{}", session_id);

        // Subscribe before announcing the session so no early event is lost.
        let mut subscriber = self
            .client
            .subscribe(server_subject.clone())
            .await
            .context("Failed to subscribe to server events")?;

        let setup = SetupMessage {
            session_id: session_id.to_string(),
            model: config.model.clone(),
            response_modality: "audio".to_string(),
            system_instruction: config.system_instruction.clone(),
            voice: config.voice.clone(),
            input_transcription: config.input_transcription,
            output_transcription: config.output_transcription,
        };
        let payload = serde_json::to_vec(&setup)?;
        self.client
            .publish(format!("live.setup.{}", session_id), payload.into())
            .await
            .context("Failed to publish setup message")?;

        info!("Live channel open on {}", server_subject);

        let (event_tx, event_rx) = mpsc::channel(64);
        let expected_id = session_id.to_string();

        // Translate server messages into events, strictly in arrival order.
        tokio::spawn(async move {
            let mut ended_by_server = false;

            while let Some(msg) = subscriber.next().await {
                let server_msg: ServerMessage = match serde_json::from_slice(&msg.payload) {
                    Ok(parsed) => parsed,
                    Err(e) => {
                        warn!("Failed to parse server message: {}", e);
                        continue;
                    }
                };

                // Filter by session_id
                if server_msg.session_id != expected_id {
                    continue;
                }

                if let Some(error) = server_msg.error {
                    let _ = event_tx.send(ChannelEvent::Error(error)).await;
                    ended_by_server = true;
                    break;
                }

                if server_msg.closed {
                    let _ = event_tx.send(ChannelEvent::Closed).await;
                    ended_by_server = true;
                    break;
                }

                let audio = match server_msg.audio {
                    Some(encoded) => {
                        match base64::engine::general_purpose::STANDARD.decode(&encoded) {
                            Ok(bytes) => Some(bytes),
                            Err(e) => {
                                // Undecodable audio drops that chunk only;
                                // the rest of the event still applies.
                                warn!("Dropping undecodable audio payload: {}", e);
                                None
                            }
                        }
                    }
                    None => None,
                };

                let content = ServerContent {
                    user_text: server_msg.user_text,
                    ai_text: server_msg.ai_text,
                    turn_complete: server_msg.turn_complete,
                    audio,
                    interrupted: server_msg.interrupted,
                };

                if event_tx.send(ChannelEvent::Content(content)).await.is_err() {
                    // Receiver dropped; the session is gone.
                    return;
                }
            }

            if !ended_by_server {
                // Subscription ended underneath us.
                let _ = event_tx.send(ChannelEvent::Closed).await;
            }
        });

        let sink: Arc<dyn ChannelSink> = Arc::new(NatsSink {
            client: self.client.clone(),
            session_id: session_id.to_string(),
            sequence: AtomicU32::new(0),
        });

        Ok((sink, event_rx))
    }
}

struct NatsSink {
    client: Client,
    session_id: String,
    sequence: AtomicU32,
}

#[async_trait::async_trait]
impl ChannelSink for NatsSink {
    async fn send_audio_frame(&self, pcm: &[u8], sample_rate: u32) -> Result<()> {
        let message = AudioInputMessage {
            session_id: self.session_id.clone(),
            sequence: self.sequence.fetch_add(1, Ordering::SeqCst),
            pcm: base64::engine::general_purpose::STANDARD.encode(pcm),
            sample_rate,
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        let payload = serde_json::to_vec(&message)?;

        self.client
            .publish(format!("live.audio.{}", self.session_id), payload.into())
            .await
            .context("Failed to publish audio frame")?;

        Ok(())
    }

    async fn send_image(&self, bytes: &[u8], mime_type: &str) -> Result<()> {
        let message = ImageInputMessage {
            session_id: self.session_id.clone(),
            data: base64::engine::general_purpose::STANDARD.encode(bytes),
            mime_type: mime_type.to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        let payload = serde_json::to_vec(&message)?;

        self.client
            .publish(format!("live.image.{}", self.session_id), payload.into())
            .await
            .context("Failed to publish image")?;

        info!("Published context image ({} bytes, {})", bytes.len(), mime_type);

        Ok(())
    }

    async fn close(&self) -> Result<()> {
        let message = ControlMessage {
            session_id: self.session_id.clone(),
            action: "close".to_string(),
        };

        let payload = serde_json::to_vec(&message)?;

        self.client
            .publish(format!("live.control.{}", self.session_id), payload.into())
            .await
            .context("Failed to publish close request")?;

        Ok(())
    }
}
