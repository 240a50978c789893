use std::path::PathBuf;

use crate::audio::CaptureConfig;
use crate::channel::ChannelConfig;

/// Optional initial context artifact, sent exactly once immediately
/// after channel open so the remote service can start the conversation
/// without waiting for user speech.
#[derive(Debug, Clone)]
pub struct ImageArtifact {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

/// Configuration for a live session
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Unique session identifier (e.g. "live-<uuid>")
    pub session_id: String,

    /// Channel open parameters (model, voice, system instruction)
    pub channel: ChannelConfig,

    /// Capture pipeline parameters (input rate, frame size, gain)
    pub capture: CaptureConfig,

    /// Playback output rate (the remote service emits 24kHz PCM)
    pub output_sample_rate: u32,

    /// Initial context artifact (e.g. scenario image)
    pub initial_image: Option<ImageArtifact>,

    /// When set, captured audio is also written to this WAV file
    pub capture_wav_path: Option<PathBuf>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            session_id: format!("live-{}", uuid::Uuid::new_v4()),
            channel: ChannelConfig::default(),
            capture: CaptureConfig::default(),
            output_sample_rate: 24000,
            initial_image: None,
            capture_wav_path: None,
        }
    }
}
