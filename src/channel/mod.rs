//! Remote conversational service boundary
//!
//! The session controller is the only component that touches this
//! boundary. A `LiveChannel` opens one duplex conversation: outbound
//! audio/image payloads go through the returned `ChannelSink`, inbound
//! server events arrive on the returned receiver in arrival order.

pub mod messages;
pub mod nats;

pub use nats::NatsChannel;

use anyhow::Result;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Fixed configuration the channel is opened with. Response modality is
/// always audio; both transcription directions default to on so the
/// transcript can be rebuilt locally.
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// Remote model identifier
    pub model: String,
    /// Voice identifier for synthesized speech
    pub voice: String,
    /// Caller-supplied system instruction
    pub system_instruction: String,
    pub input_transcription: bool,
    pub output_transcription: bool,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            model: "live-audio-v1".to_string(),
            voice: "puck".to_string(),
            system_instruction: String::new(),
            input_transcription: true,
            output_transcription: true,
        }
    }
}

/// Inbound server content. One event may set several fields at once
/// (e.g. a partial transcript arriving together with an interruption);
/// the session controller applies them in a single documented order.
#[derive(Debug, Clone, Default)]
pub struct ServerContent {
    /// Incremental transcription of the user's speech
    pub user_text: Option<String>,
    /// Incremental transcription of the AI's speech
    pub ai_text: Option<String>,
    /// The remote service declared the current turn complete
    pub turn_complete: bool,
    /// Decoded audio payload (PCM16 at the output rate)
    pub audio: Option<Vec<u8>>,
    /// Barge-in: the user spoke over the AI, abandon in-flight output
    pub interrupted: bool,
}

/// Events delivered by an open channel.
#[derive(Debug, Clone)]
pub enum ChannelEvent {
    Content(ServerContent),
    /// The remote side closed the conversation.
    Closed,
    /// The channel failed; the message is user-facing.
    Error(String),
}

/// Outbound half of an open channel.
#[async_trait::async_trait]
pub trait ChannelSink: Send + Sync {
    /// Send one PCM16 audio frame. Callers serialize sends to keep frame
    /// order on the wire.
    async fn send_audio_frame(&self, pcm: &[u8], sample_rate: u32) -> Result<()>;

    /// Send a binary context artifact (e.g. a scenario image).
    async fn send_image(&self, bytes: &[u8], mime_type: &str) -> Result<()>;

    /// Request channel close. Best-effort; the session is ending anyway.
    async fn close(&self) -> Result<()>;
}

/// A duplex channel to the remote conversational service.
///
/// `open` returning `Ok` is the open acknowledgment: the sink is live
/// and events will flow on the receiver.
#[async_trait::async_trait]
pub trait LiveChannel: Send + Sync {
    async fn open(
        &self,
        session_id: &str,
        config: &ChannelConfig,
    ) -> Result<(Arc<dyn ChannelSink>, mpsc::Receiver<ChannelEvent>)>;
}
